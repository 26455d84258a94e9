use serde::de::DeserializeOwned;

use crate::{Envelope, EnvelopeError, RawResponse, Reply, TransportResponse};

/// Decodes a body as an envelope; anything else is `None` and passes through.
pub(crate) fn decode_envelope(body: &str) -> Option<Envelope> {
    serde_json::from_str::<Envelope>(body).ok()
}

pub(crate) fn into_raw_response(
    response: TransportResponse,
    envelope: Option<Envelope>,
) -> RawResponse {
    RawResponse {
        status: response.status,
        body: response.body,
        envelope,
    }
}

/// Deserializes the `data` of a successful reply into `T`.
pub(crate) fn decode_reply_data<T: DeserializeOwned>(reply: Reply) -> Result<T, EnvelopeError> {
    match reply {
        Reply::Success(envelope) => serde_json::from_value(envelope.data)
            .map_err(|err| EnvelopeError::Decode(format!("invalid envelope data: {err}"))),
        Reply::PassThrough(raw) => match raw.envelope {
            Some(envelope) => Err(EnvelopeError::UnexpectedCode {
                code: envelope.code,
                msg: envelope.msg,
            }),
            None => Err(EnvelopeError::Decode(format!(
                "response is not an envelope (http {}); body: {}",
                raw.status, raw.body
            ))),
        },
    }
}
