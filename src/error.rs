/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// The request could not be built from its options. Raised before any I/O.
    #[error("invalid request: {0}")]
    Construction(String),
    /// The dispatch deadline elapsed and the in-flight request was aborted.
    #[error("request aborted: deadline elapsed before the transport settled")]
    Aborted,
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
}

impl RestError {
    /// Returns `true` when the request was aborted by its deadline.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}
