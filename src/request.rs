use reqwest::Method;
use serde::Serialize;

use crate::{Query, QueryValue, RestError, Result};

/// Opaque rate-limit bucket identifier, carried but never interpreted here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RouteKey(pub String);

impl RouteKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RouteKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for RouteKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// File uploaded as one part of a multipart body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileAttachment {
    /// Multipart field name.
    pub name: String,
    /// File bytes. Attachments without content are skipped.
    pub content: Option<Vec<u8>>,
    /// File name sent to the API. Defaults to `name` when absent.
    pub filename: Option<String>,
}

impl FileAttachment {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: Some(content.into()),
            filename: None,
        }
    }

    /// Attachment with no content, skipped when the body is built.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: None,
            filename: None,
        }
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Per-call request configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestOptions {
    pub(crate) versioned: bool,
    pub(crate) auth: bool,
    pub(crate) route: RouteKey,
    pub(crate) query: Query,
    pub(crate) data: Option<serde_json::Value>,
    pub(crate) files: Vec<FileAttachment>,
    pub(crate) reason: Option<String>,
    pub(crate) headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            versioned: true,
            auth: true,
            route: RouteKey::default(),
            query: Query::default(),
            data: None,
            files: Vec::new(),
            reason: None,
            headers: Vec::new(),
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the first attempt appends `/v{version}` to the API base.
    pub fn versioned(mut self, versioned: bool) -> Self {
        self.versioned = versioned;
        self
    }

    /// Whether the `Authorization` header is attached.
    pub fn auth(mut self, auth: bool) -> Self {
        self.auth = auth;
        self
    }

    pub fn route(mut self, route: impl Into<RouteKey>) -> Self {
        self.route = route.into();
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.insert(key, value);
        self
    }

    /// Serializes `data` as the JSON payload.
    ///
    /// Fails with [`RestError::Construction`] if `data` cannot be represented as JSON.
    pub fn data<T: Serialize + ?Sized>(self, data: &T) -> Result<Self> {
        let value = serde_json::to_value(data)
            .map_err(|err| RestError::Construction(format!("unserializable request data: {err}")))?;
        Ok(self.json(value))
    }

    /// Sets an already-built JSON payload.
    ///
    /// Falsy values (`null`, `false`, zero, `""`) clear it: no body is sent.
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.data = (!is_falsy(&value)).then_some(value);
        self
    }

    pub fn file(mut self, file: FileAttachment) -> Self {
        self.files.push(file);
        self
    }

    pub fn files(mut self, files: impl IntoIterator<Item = FileAttachment>) -> Self {
        self.files.extend(files);
        self
    }

    /// Audit log reason, sent percent-encoded.
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Extra header applied last, overriding any computed header of the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

fn is_falsy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(flag) => !flag,
        serde_json::Value::Number(number) => number.as_f64() == Some(0.0),
        serde_json::Value::String(text) => text.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => false,
    }
}

/// Immutable description of one logical API call.
///
/// A spec can be resolved and dispatched any number of times; the caller
/// driving retries passes the attempt number on each call.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestSpec {
    method: Method,
    path: String,
    options: RequestOptions,
}

impl RequestSpec {
    /// Creates a spec. The query is encoded once, here.
    pub fn new(method: Method, path: impl Into<String>, options: RequestOptions) -> Self {
        let query = options.query.encode();
        let mut path = path.into();
        if !query.is_empty() {
            path.push('?');
            path.push_str(&query);
        }
        Self {
            method,
            path,
            options,
        }
    }

    pub fn get(path: impl Into<String>, options: RequestOptions) -> Self {
        Self::new(Method::GET, path, options)
    }

    pub fn post(path: impl Into<String>, options: RequestOptions) -> Self {
        Self::new(Method::POST, path, options)
    }

    pub fn patch(path: impl Into<String>, options: RequestOptions) -> Self {
        Self::new(Method::PATCH, path, options)
    }

    pub fn put(path: impl Into<String>, options: RequestOptions) -> Self {
        Self::new(Method::PUT, path, options)
    }

    pub fn delete(path: impl Into<String>, options: RequestOptions) -> Self {
        Self::new(Method::DELETE, path, options)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path with the encoded query appended, if any.
    pub fn path_and_query(&self) -> &str {
        &self.path
    }

    pub fn route(&self) -> &RouteKey {
        &self.options.route
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }
}
