use std::fmt;

/// Supplies the ready-to-send `Authorization` header value.
///
/// The value is used verbatim; no validation or refresh happens here.
pub trait CredentialProvider: Send + Sync {
    fn authorization(&self) -> String;
}

impl<F> CredentialProvider for F
where
    F: Fn() -> String + Send + Sync,
{
    fn authorization(&self) -> String {
        self()
    }
}

/// Fixed authorization value.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticAuthorization(String);

impl fmt::Debug for StaticAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StaticAuthorization")
            .field(&"<redacted>")
            .finish()
    }
}

impl StaticAuthorization {
    /// Full raw authorization value, e.g. `"Bot <token>"` or any custom scheme.
    pub fn raw(authorization: impl Into<String>) -> Self {
        Self(authorization.into())
    }

    /// Bot token. The `Bot ` prefix is added if missing.
    pub fn bot(token: impl AsRef<str>) -> Self {
        Self(normalize_authorization("Bot", token.as_ref()))
    }

    /// OAuth2 bearer token. The `Bearer ` prefix is added if missing.
    pub fn bearer(token: impl AsRef<str>) -> Self {
        Self(normalize_authorization("Bearer", token.as_ref()))
    }
}

impl CredentialProvider for StaticAuthorization {
    fn authorization(&self) -> String {
        self.0.clone()
    }
}

fn normalize_authorization(scheme: &str, token: &str) -> String {
    let trimmed = token.trim();
    let has_scheme = trimmed
        .get(..scheme.len())
        .is_some_and(|value| value.eq_ignore_ascii_case(scheme))
        && trimmed[scheme.len()..].starts_with(' ');
    if has_scheme {
        trimmed.to_owned()
    } else {
        format!("{scheme} {trimmed}")
    }
}
