use crate::{transport::FailureReason, RawResponse, TransportFailure};

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// Envelope came back with code `401`; carries the server message.
    #[error("authentication expired: {msg}")]
    Unauthorized { msg: String },
    /// Envelope came back with code `500`; carries the full response.
    #[error("server error: {}", .response.message().unwrap_or("<no message>"))]
    Server { response: RawResponse },
    /// The attempt exceeded its per-request timeout. Never retried.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    /// Transport answered with a non-success HTTP status.
    #[error("system under maintenance, please try again later (http {status})")]
    Maintenance { status: u16 },
    /// Raw transport failure, either unclassified or after the retry budget ran out.
    #[error("transport failure: {0}")]
    Transport(TransportFailure),
    /// A newer identical request superseded this one while it was in flight.
    #[error("request superseded by a newer identical request")]
    StaleDuplicate,
    /// Envelope code other than `200` where typed data was requested.
    #[error("unexpected envelope code {code}: {msg}")]
    UnexpectedCode { code: i64, msg: String },
    /// Response decoding error.
    #[error("decode error: {0}")]
    Decode(String),
    /// The request cannot be sent as configured, e.g. non-object query params.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl EnvelopeError {
    /// Returns `true` for classified timeouts and for raw timeout failures.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(failure) => failure.reason() == FailureReason::Timeout,
            _ => false,
        }
    }

    /// Returns `true` when the caller was superseded by a newer identical request.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleDuplicate)
    }
}
