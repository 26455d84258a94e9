use serde_json::Value as JsonValue;

use crate::{wire::CODE_OK, Envelope};

/// 2xx response kept whole, with its envelope when the body was one.
#[derive(Clone, Debug, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    pub envelope: Option<Envelope>,
}

impl RawResponse {
    /// Envelope code, if the body decoded as an envelope.
    pub fn code(&self) -> Option<i64> {
        self.envelope.as_ref().map(|envelope| envelope.code)
    }

    /// Envelope message, if present and non-empty.
    pub fn message(&self) -> Option<&str> {
        self.envelope
            .as_ref()
            .map(|envelope| envelope.msg.as_str())
            .filter(|msg| !msg.is_empty())
    }
}

/// Successful outcome of [`crate::EnvelopeClient::request`].
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// Envelope with code `200`.
    Success(Envelope),
    /// Any other code, or a body that is not an envelope.
    PassThrough(RawResponse),
}

impl Reply {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            Self::Success(envelope) => Some(envelope),
            Self::PassThrough(raw) => raw.envelope.as_ref(),
        }
    }

    /// Envelope `data` of a successful reply.
    pub fn data(&self) -> Option<&JsonValue> {
        match self {
            Self::Success(envelope) => Some(&envelope.data),
            Self::PassThrough(_) => None,
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Success(_) => Some(CODE_OK),
            Self::PassThrough(raw) => raw.code(),
        }
    }
}
