//! `discord-rest-http` builds and dispatches single Discord REST API requests.
//!
//! A [`RequestSpec`] describes one logical call. [`Dispatcher::resolve`]
//! turns it into a [`ResolvedRequest`] for a given attempt number and
//! [`Dispatcher::dispatch`] sends that over a shared, pooled HTTP client with
//! an abort deadline:
//! - [`Dispatcher::resolve`]
//! - [`Dispatcher::dispatch`]
//! - [`Dispatcher::send`]
//!
//! Retry policy, rate-limit bookkeeping and response parsing belong to the
//! caller.

mod abort;
mod auth;
mod dispatcher;
mod error;
mod form;
mod options;
mod query;
mod request;
mod resolve;
mod transport;

pub use abort::{AbortSignal, Scheduler, TokioScheduler};
pub use auth::{CredentialProvider, StaticAuthorization};
pub use dispatcher::Dispatcher;
pub use error::RestError;
pub use form::{FormData, FormPart};
pub use options::{
    user_agent, ClientOptions, AUDIT_LOG_REASON_HEADER, DEFAULT_API_VERSION, FALLBACK_API_URL,
    PAYLOAD_JSON_FIELD,
};
pub use query::{Query, QueryValue};
pub use request::{FileAttachment, RequestOptions, RequestSpec, RouteKey};
pub use reqwest::Method;
pub use resolve::{resolve_api_base, RequestBody, ResolvedRequest};
pub use transport::{ReqwestTransport, Transport, POOL_IDLE_TIMEOUT, POOL_MAX_IDLE_PER_HOST};

pub type Result<T> = std::result::Result<T, RestError>;
