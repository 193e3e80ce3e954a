use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Method, Url,
};

use crate::{
    options::{AUDIT_LOG_REASON_HEADER, DEFAULT_API_VERSION, FALLBACK_API_URL, PAYLOAD_JSON_FIELD},
    user_agent, ClientOptions, CredentialProvider, FormData, RequestOptions, RequestSpec,
    RestError, Result, RouteKey,
};

// Characters left unescaped in the audit log reason, matching `encodeURIComponent`.
const REASON_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Body of a resolved request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    /// Compact JSON text, sent with `Content-Type: application/json`.
    Json(String),
    /// Files plus an optional `payload_json` part, sent as `multipart/form-data`.
    Multipart(FormData),
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_json(&self) -> Option<&str> {
        match self {
            Self::Json(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_form(&self) -> Option<&FormData> {
        match self {
            Self::Multipart(form) => Some(form),
            _ => None,
        }
    }

    pub(crate) fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Empty => None,
            Self::Json(text) => Some(text.into_bytes()),
            Self::Multipart(form) => Some(form.to_bytes()),
        }
    }
}

/// Fully-formed request for a single dispatch.
#[derive(Clone, Debug)]
pub struct ResolvedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
    /// Rate-limit route key carried over from the spec.
    pub route: RouteKey,
    /// Attempt number this request was resolved for.
    pub attempt: u32,
}

/// Returns the API prefix for an attempt.
///
/// The first attempt honors the configured base URL, version and the
/// `versioned` flag. Every later attempt targets the canonical API at the
/// default version, ignoring all three.
pub fn resolve_api_base(options: &ClientOptions, versioned: bool, attempt: u32) -> String {
    if attempt > 0 {
        return format!("{FALLBACK_API_URL}/v{DEFAULT_API_VERSION}");
    }
    let base = options.api.trim_end_matches('/');
    if versioned {
        format!("{base}/v{}", options.version)
    } else {
        base.to_owned()
    }
}

pub(crate) fn resolve_request(
    spec: &RequestSpec,
    options: &ClientOptions,
    credentials: Option<&dyn CredentialProvider>,
    attempt: u32,
) -> Result<ResolvedRequest> {
    let request_options = spec.options();
    let base = resolve_api_base(options, request_options.versioned, attempt);
    let raw_url = format!("{base}{}", spec.path_and_query());
    let url = Url::parse(&raw_url)
        .map_err(|err| RestError::Construction(format!("invalid request url '{raw_url}': {err}")))?;

    let mut headers = build_headers(request_options, credentials)?;
    let body = build_body(request_options, &mut headers)?;
    apply_extra_headers(request_options, &mut headers)?;

    Ok(ResolvedRequest {
        method: spec.method().clone(),
        url,
        headers,
        body,
        route: spec.route().clone(),
        attempt,
    })
}

fn build_headers(
    options: &RequestOptions,
    credentials: Option<&dyn CredentialProvider>,
) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(user_agent()));

    if options.auth {
        let credentials = credentials.ok_or_else(|| {
            RestError::Construction(
                "request requires authorization but no credentials are set".to_owned(),
            )
        })?;
        let mut value =
            header_value(header::AUTHORIZATION.as_str(), &credentials.authorization())?;
        value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, value);
    }

    if let Some(reason) = &options.reason {
        let encoded = utf8_percent_encode(reason, REASON_ENCODE_SET).to_string();
        headers.insert(
            HeaderName::from_static(AUDIT_LOG_REASON_HEADER),
            header_value(AUDIT_LOG_REASON_HEADER, &encoded)?,
        );
    }

    Ok(headers)
}

fn build_body(options: &RequestOptions, headers: &mut HeaderMap) -> Result<RequestBody> {
    if !options.files.is_empty() {
        let mut form = FormData::new();
        for file in &options.files {
            if let Some(content) = &file.content {
                let filename = file.filename.as_deref().unwrap_or(&file.name);
                form.append_file(&file.name, content.clone(), filename);
            }
        }
        if let Some(data) = &options.data {
            form.append_text(PAYLOAD_JSON_FIELD, encode_json(data)?);
        }
        headers.insert(
            header::CONTENT_TYPE,
            header_value(header::CONTENT_TYPE.as_str(), &form.content_type())?,
        );
        return Ok(RequestBody::Multipart(form));
    }

    match &options.data {
        Some(data) => {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            Ok(RequestBody::Json(encode_json(data)?))
        }
        None => Ok(RequestBody::Empty),
    }
}

fn apply_extra_headers(options: &RequestOptions, headers: &mut HeaderMap) -> Result<()> {
    for (name, value) in &options.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
            RestError::Construction(format!("invalid header name '{name}': {err}"))
        })?;
        let value = header_value(name.as_str(), value)?;
        headers.insert(name, value);
    }
    Ok(())
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|err| RestError::Construction(format!("invalid value for header '{name}': {err}")))
}

fn encode_json(data: &serde_json::Value) -> Result<String> {
    serde_json::to_string(data)
        .map_err(|err| RestError::Construction(format!("unserializable request data: {err}")))
}

#[cfg(test)]
mod tests {
    use reqwest::header;
    use serde_json::json;

    use super::{resolve_api_base, resolve_request, RequestBody};
    use crate::{
        user_agent, ClientOptions, CredentialProvider, FileAttachment, RequestOptions,
        RequestSpec, RestError, StaticAuthorization,
    };

    fn custom_options() -> ClientOptions {
        ClientOptions {
            api: "https://canary.example.test/api/".to_owned(),
            version: 10,
            timeout_ms: 1_000,
        }
    }

    fn resolve(spec: &RequestSpec, attempt: u32) -> super::ResolvedRequest {
        let auth = StaticAuthorization::bot("token");
        resolve_request(
            spec,
            &custom_options(),
            Some(&auth as &dyn CredentialProvider),
            attempt,
        )
        .expect("must resolve")
    }

    #[test]
    fn first_attempt_uses_configured_base_and_version() {
        let options = custom_options();
        assert_eq!(
            resolve_api_base(&options, true, 0),
            "https://canary.example.test/api/v10"
        );
        assert_eq!(
            resolve_api_base(&options, false, 0),
            "https://canary.example.test/api"
        );
    }

    #[test]
    fn retries_use_canonical_versioned_api() {
        let options = custom_options();
        for versioned in [true, false] {
            for attempt in [1, 2, 7] {
                assert_eq!(
                    resolve_api_base(&options, versioned, attempt),
                    "https://discord.com/api/v9"
                );
            }
        }
    }

    #[test]
    fn url_carries_path_and_query() {
        let spec = RequestSpec::get(
            "/guilds/1/members",
            RequestOptions::new().query("limit", 2).query("after", 0),
        );
        let request = resolve(&spec, 0);
        assert_eq!(
            request.url.as_str(),
            "https://canary.example.test/api/v10/guilds/1/members?limit=2&after=0"
        );
        assert_eq!(request.attempt, 0);
    }

    #[test]
    fn default_headers_and_auth() {
        let spec = RequestSpec::get("/users/@me", RequestOptions::new());
        let request = resolve(&spec, 0);
        assert_eq!(request.headers[header::USER_AGENT], user_agent());
        assert_eq!(request.headers[header::AUTHORIZATION], "Bot token");
        assert!(request.headers[header::AUTHORIZATION].is_sensitive());
        assert!(request.headers.get(header::CONTENT_TYPE).is_none());
        assert!(request.body.is_empty());
    }

    #[test]
    fn auth_can_be_disabled() {
        let spec = RequestSpec::get("/gateway", RequestOptions::new().auth(false));
        let request = resolve_request(&spec, &custom_options(), None, 0).expect("must resolve");
        assert!(request.headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn missing_credentials_is_a_construction_error() {
        let spec = RequestSpec::get("/users/@me", RequestOptions::new());
        let err = resolve_request(&spec, &custom_options(), None, 0).expect_err("must fail");
        assert!(matches!(err, RestError::Construction(_)));
    }

    #[test]
    fn reason_is_percent_encoded() {
        let spec = RequestSpec::delete("/channels/1", RequestOptions::new().reason("a/b c"));
        let request = resolve(&spec, 0);
        assert_eq!(request.headers["x-audit-log-reason"], "a%2Fb%20c");
    }

    #[test]
    fn reason_keeps_uri_component_marks_unescaped() {
        let spec = RequestSpec::delete(
            "/channels/1",
            RequestOptions::new().reason("don't (x)! *~_.-"),
        );
        let request = resolve(&spec, 0);
        assert_eq!(request.headers["x-audit-log-reason"], "don't%20(x)!%20*~_.-");
    }

    #[test]
    fn reason_escapes_non_ascii_as_utf8() {
        let spec = RequestSpec::delete("/channels/1", RequestOptions::new().reason("çé?#"));
        let request = resolve(&spec, 0);
        assert_eq!(request.headers["x-audit-log-reason"], "%C3%A7%C3%A9%3F%23");
    }

    #[test]
    fn falsy_json_sends_no_body() {
        for value in [json!(false), json!(0), json!("")] {
            let spec = RequestSpec::post("/x", RequestOptions::new().json(value));
            let request = resolve(&spec, 0);
            assert_eq!(request.body, RequestBody::Empty);
            assert!(request.headers.get(header::CONTENT_TYPE).is_none());
        }
    }

    #[test]
    fn files_with_falsy_json_omit_payload_json() {
        let spec = RequestSpec::post(
            "/x",
            RequestOptions::new()
                .json(json!(0))
                .file(FileAttachment::new("a", b"1".to_vec()).filename("a.txt")),
        );
        let request = resolve(&spec, 0);
        let form = request.body.as_form().expect("must be multipart");
        assert_eq!(form.parts().len(), 1);
        assert!(form.parts().iter().all(|part| part.name != "payload_json"));
    }

    #[test]
    fn json_body_sets_content_type() {
        let spec = RequestSpec::post(
            "/channels/1/messages",
            RequestOptions::new().json(json!({"x": 1})),
        );
        let request = resolve(&spec, 0);
        assert_eq!(request.body, RequestBody::Json("{\"x\":1}".to_owned()));
        assert_eq!(request.headers[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn json_body_keeps_key_order() {
        let spec = RequestSpec::post(
            "/x",
            RequestOptions::new().json(json!({"zeta": 1, "alpha": [true, null]})),
        );
        let request = resolve(&spec, 0);
        assert_eq!(request.body.as_json(), Some("{\"zeta\":1,\"alpha\":[true,null]}"));
    }

    #[test]
    fn files_without_data_produce_single_file_part() {
        let spec = RequestSpec::post(
            "/channels/1/messages",
            RequestOptions::new()
                .file(FileAttachment::new("a", b"\x89PNG".to_vec()).filename("a.png")),
        );
        let request = resolve(&spec, 0);
        let form = request.body.as_form().expect("must be multipart");
        assert_eq!(form.parts().len(), 1);
        assert_eq!(form.parts()[0].name, "a");
        assert_eq!(form.parts()[0].filename.as_deref(), Some("a.png"));
        assert_eq!(form.parts()[0].content, b"\x89PNG".to_vec());
        assert_eq!(request.headers[header::CONTENT_TYPE], form.content_type().as_str());
    }

    #[test]
    fn files_with_data_append_payload_json_last() {
        let spec = RequestSpec::post(
            "/channels/1/messages",
            RequestOptions::new()
                .json(json!({"x": 1}))
                .file(FileAttachment::new("a", b"png".to_vec()).filename("a.png")),
        );
        let request = resolve(&spec, 0);
        let form = request.body.as_form().expect("must be multipart");
        assert_eq!(form.parts().len(), 2);
        assert!(form.parts()[0].is_file());
        let sidecar = &form.parts()[1];
        assert_eq!(sidecar.name, "payload_json");
        assert!(!sidecar.is_file());
        let decoded: serde_json::Value =
            serde_json::from_slice(&sidecar.content).expect("sidecar must be json");
        assert_eq!(decoded, json!({"x": 1}));
    }

    #[test]
    fn files_without_content_are_skipped() {
        let spec = RequestSpec::post(
            "/x",
            RequestOptions::new()
                .file(FileAttachment::empty("skipped"))
                .file(FileAttachment::new("kept", b"1".to_vec())),
        );
        let request = resolve(&spec, 0);
        let form = request.body.as_form().expect("must be multipart");
        assert_eq!(form.parts().len(), 1);
        assert_eq!(form.parts()[0].name, "kept");
        assert_eq!(form.parts()[0].filename.as_deref(), Some("kept"));
    }

    #[test]
    fn empty_files_fall_through_to_json() {
        let spec = RequestSpec::post(
            "/x",
            RequestOptions::new().files(Vec::new()).json(json!({"x": 1})),
        );
        let request = resolve(&spec, 0);
        assert_eq!(request.body.as_json(), Some("{\"x\":1}"));
    }

    #[test]
    fn extra_headers_override_computed_headers() {
        let spec = RequestSpec::post(
            "/x",
            RequestOptions::new()
                .json(json!({}))
                .reason("r")
                .header("User-Agent", "custom-agent")
                .header("Content-Type", "text/plain")
                .header("Authorization", "Bearer other")
                .header("X-Extra", "1"),
        );
        let request = resolve(&spec, 0);
        assert_eq!(request.headers[header::USER_AGENT], "custom-agent");
        assert_eq!(request.headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(request.headers[header::AUTHORIZATION], "Bearer other");
        assert_eq!(request.headers["x-extra"], "1");
        assert_eq!(request.headers["x-audit-log-reason"], "r");
    }

    #[test]
    fn invalid_extra_header_is_a_construction_error() {
        let spec = RequestSpec::get("/x", RequestOptions::new().header("bad name", "v"));
        let auth = StaticAuthorization::bot("token");
        let err = resolve_request(
            &spec,
            &custom_options(),
            Some(&auth as &dyn CredentialProvider),
            0,
        )
        .expect_err("must fail");
        assert!(matches!(err, RestError::Construction(_)));
    }

    #[test]
    fn each_resolve_reflects_the_attempt() {
        let spec = RequestSpec::get("/users/@me", RequestOptions::new().versioned(false));
        assert_eq!(
            resolve(&spec, 0).url.as_str(),
            "https://canary.example.test/api/users/@me"
        );
        assert_eq!(
            resolve(&spec, 1).url.as_str(),
            "https://discord.com/api/v9/users/@me"
        );
    }
}
