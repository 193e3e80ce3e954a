use std::sync::OnceLock;

/// Canonical API mount point used for every retried attempt.
pub const FALLBACK_API_URL: &str = "https://discord.com/api";
/// API version used by default and by every retried attempt.
pub const DEFAULT_API_VERSION: u32 = 9;
/// Header carrying the percent-encoded audit log reason.
pub const AUDIT_LOG_REASON_HEADER: &str = "x-audit-log-reason";
/// Multipart field carrying the JSON payload next to uploaded files.
pub const PAYLOAD_JSON_FIELD: &str = "payload_json";

/// Configures the API endpoint and dispatch deadline.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Base API URL used for the first attempt, without a version segment.
    pub api: String,
    /// API version appended as `/v{version}` for versioned requests.
    pub version: u32,
    /// Per-dispatch deadline in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api: FALLBACK_API_URL.to_owned(),
            version: DEFAULT_API_VERSION,
            timeout_ms: 15_000,
        }
    }
}

impl ClientOptions {
    /// Builds options from environment variables, falling back to defaults.
    ///
    /// Reads:
    /// - `DISCORD_API_URL`: base API URL (e.g. `https://discord.com/api`)
    /// - `DISCORD_API_VERSION`: numeric API version
    /// - `DISCORD_REST_TIMEOUT_MS`: dispatch deadline in milliseconds
    ///
    /// Unset variables keep their default. A variable that is set but empty
    /// or unparsable is an error.
    pub fn from_env() -> std::result::Result<Self, String> {
        let mut options = Self::default();
        if let Some(api) = read_env("DISCORD_API_URL")? {
            options.api = api.trim_end_matches('/').to_owned();
        }
        if let Some(version) = read_env("DISCORD_API_VERSION")? {
            options.version = version
                .parse()
                .map_err(|err| format!("invalid DISCORD_API_VERSION '{version}': {err}"))?;
        }
        if let Some(timeout) = read_env("DISCORD_REST_TIMEOUT_MS")? {
            options.timeout_ms = timeout
                .parse()
                .map_err(|err| format!("invalid DISCORD_REST_TIMEOUT_MS '{timeout}': {err}"))?;
        }
        Ok(options)
    }
}

fn read_env(name: &str) -> std::result::Result<Option<String>, String> {
    match std::env::var(name) {
        Ok(value) if value.trim().is_empty() => Err(format!("{name} is set but empty")),
        Ok(value) => Ok(Some(value.trim().to_owned())),
        Err(_) => Ok(None),
    }
}

/// Process-wide `User-Agent` value identifying this client.
///
/// Example: `DiscordBot (https://github.com/neuralforgeone/discord-rest-http, 0.1.0) Rust/linux-x86_64`
pub fn user_agent() -> &'static str {
    static USER_AGENT: OnceLock<String> = OnceLock::new();
    USER_AGENT.get_or_init(|| {
        format!(
            "DiscordBot ({}, {}) Rust/{}-{}",
            env!("CARGO_PKG_REPOSITORY"),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH,
        )
    })
}
