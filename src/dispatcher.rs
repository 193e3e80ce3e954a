use std::{fmt, sync::Arc, time::Duration};

use crate::{
    abort::Deadline,
    resolve::resolve_request,
    AbortSignal, ClientOptions, CredentialProvider, ReqwestTransport, RequestSpec,
    ResolvedRequest, Result, Scheduler, StaticAuthorization, TokioScheduler, Transport,
};

/// Builds requests from [`RequestSpec`]s and dispatches them with a deadline.
///
/// Retry policy lives with the caller: it passes the attempt number on every
/// call, and attempts after the first are routed to the canonical API.
#[derive(Clone)]
pub struct Dispatcher<T = ReqwestTransport, S = TokioScheduler> {
    transport: T,
    scheduler: S,
    credentials: Option<Arc<dyn CredentialProvider>>,
    options: ClientOptions,
}

impl<T, S> fmt::Debug for Dispatcher<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("options", &self.options)
            .field(
                "credentials",
                &self.credentials.as_ref().map(|_| "<redacted>"),
            )
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher over the shared process-wide HTTP client.
    pub fn new() -> Result<Self> {
        Ok(Self::with_parts(ReqwestTransport::shared()?, TokioScheduler))
    }

    /// Creates a dispatcher from environment variables.
    ///
    /// Reads `DISCORD_TOKEN` (bot token, `Bot` prefix optional) plus the
    /// variables documented on [`ClientOptions::from_env`].
    pub fn from_env() -> std::result::Result<Self, String> {
        let options = ClientOptions::from_env()?;
        let token = std::env::var("DISCORD_TOKEN")
            .map_err(|_| "missing DISCORD_TOKEN environment variable".to_owned())?;
        if token.trim().is_empty() {
            return Err("DISCORD_TOKEN is set but empty".to_owned());
        }
        let dispatcher = Self::new().map_err(|err| err.to_string())?;
        Ok(dispatcher
            .with_options(options)
            .with_credentials(StaticAuthorization::bot(token)))
    }
}

impl<T, S> Dispatcher<T, S> {
    /// Creates a dispatcher over an explicit transport and scheduler.
    pub fn with_parts(transport: T, scheduler: S) -> Self {
        Self {
            transport,
            scheduler,
            credentials: None,
            options: ClientOptions::default(),
        }
    }

    /// Applies endpoint and timeout options.
    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the provider consulted for the `Authorization` header.
    pub fn with_credentials(mut self, credentials: impl CredentialProvider + 'static) -> Self {
        self.credentials = Some(Arc::new(credentials));
        self
    }

    pub fn with_transport<U>(self, transport: U) -> Dispatcher<U, S> {
        Dispatcher {
            transport,
            scheduler: self.scheduler,
            credentials: self.credentials,
            options: self.options,
        }
    }

    pub fn with_scheduler<R>(self, scheduler: R) -> Dispatcher<T, R> {
        Dispatcher {
            transport: self.transport,
            scheduler,
            credentials: self.credentials,
            options: self.options,
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Builds the URL, headers and body for one attempt of `spec`.
    ///
    /// Pure and synchronous; called again for every retry.
    pub fn resolve(&self, spec: &RequestSpec, attempt: u32) -> Result<ResolvedRequest> {
        resolve_request(spec, &self.options, self.credentials.as_deref(), attempt)
    }
}

impl<T: Transport, S: Scheduler> Dispatcher<T, S> {
    /// Sends a resolved request, aborting it once the configured deadline elapses.
    ///
    /// The deadline timer is cancelled on every exit path, including when
    /// the returned future is dropped.
    pub async fn dispatch(&self, request: ResolvedRequest) -> Result<T::Response> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            route = request.route.as_str(),
            attempt = request.attempt,
            "dispatching request"
        );

        let signal = AbortSignal::new();
        let _deadline = Deadline::arm(
            &self.scheduler,
            Duration::from_millis(self.options.timeout_ms),
            &signal,
        );
        self.transport.send(request, signal).await
    }

    /// Resolves `spec` for `attempt` and dispatches it.
    pub async fn send(&self, spec: &RequestSpec, attempt: u32) -> Result<T::Response> {
        let request = self.resolve(spec, attempt)?;
        self.dispatch(request).await
    }
}
