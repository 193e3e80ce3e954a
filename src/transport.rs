use std::{future::Future, sync::OnceLock, time::Duration};

use crate::{AbortSignal, ResolvedRequest, RestError, Result};

/// Idle connections kept per host by the shared client.
pub const POOL_MAX_IDLE_PER_HOST: usize = 10;
/// How long an idle pooled connection is kept alive.
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_millis(300_000);

/// Sends resolved requests.
///
/// Implementations must settle with [`RestError::Aborted`] once `signal`
/// fires, dropping any partially received response.
pub trait Transport: Send + Sync {
    type Response: Send;

    fn send(
        &self,
        request: ResolvedRequest,
        signal: AbortSignal,
    ) -> impl Future<Output = Result<Self::Response>> + Send;
}

/// [`Transport`] over a pooled `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Handle to the process-wide client, built on first use.
    ///
    /// Every handle shares one connection pool.
    pub fn shared() -> Result<Self> {
        static SHARED: OnceLock<reqwest::Client> = OnceLock::new();
        if let Some(http) = SHARED.get() {
            return Ok(Self { http: http.clone() });
        }
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .build()
            .map_err(RestError::Transport)?;
        Ok(Self {
            http: SHARED.get_or_init(|| http).clone(),
        })
    }

    /// Wraps a caller-provided client instead of the shared one.
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for ReqwestTransport {
    type Response = reqwest::Response;

    fn send(
        &self,
        request: ResolvedRequest,
        signal: AbortSignal,
    ) -> impl Future<Output = Result<Self::Response>> + Send {
        let mut builder = self
            .http
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body.into_bytes() {
            builder = builder.body(body);
        }

        async move {
            // Dropping the in-flight send future aborts the request and
            // releases its connection.
            tokio::select! {
                biased;
                _ = signal.aborted() => Err(RestError::Aborted),
                response = builder.send() => response.map_err(RestError::Transport),
            }
        }
    }
}

