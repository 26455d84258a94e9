use crate::{
    decode::{decode_envelope, into_raw_response},
    transport::FailureReason,
    wire::{CODE_OK, CODE_SERVER_ERROR, CODE_UNAUTHORIZED},
    RawResponse, Reply, TransportFailure, TransportResponse,
};

/// Classification of a completed 2xx exchange.
#[derive(Debug, PartialEq)]
pub(crate) enum ResponseVerdict {
    Resolve(Reply),
    Unauthorized { msg: String },
    ServerError(RawResponse),
}

pub(crate) fn classify_response(response: TransportResponse) -> ResponseVerdict {
    match decode_envelope(&response.body) {
        Some(envelope) if envelope.code == CODE_OK => {
            ResponseVerdict::Resolve(Reply::Success(envelope))
        }
        Some(envelope) if envelope.code == CODE_UNAUTHORIZED => {
            ResponseVerdict::Unauthorized { msg: envelope.msg }
        }
        Some(envelope) if envelope.code == CODE_SERVER_ERROR => {
            ResponseVerdict::ServerError(into_raw_response(response, Some(envelope)))
        }
        envelope => ResponseVerdict::Resolve(Reply::PassThrough(into_raw_response(
            response, envelope,
        ))),
    }
}

/// Classification of a failed attempt, checked in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FailureVerdict {
    /// Superseded by a newer identical request.
    Stale,
    /// No retry budget configured; surface the raw failure.
    Unclassified,
    Timeout,
    /// The server answered with this status.
    Maintenance(u16),
    /// No response at all and retries remain.
    Retry,
    /// No response at all and the retry budget is spent.
    Exhausted,
}

pub(crate) fn classify_failure(
    failure: &TransportFailure,
    superseded: bool,
    retry_limit: u32,
    retry_count: u32,
) -> FailureVerdict {
    if superseded {
        return FailureVerdict::Stale;
    }
    if retry_limit == 0 {
        return FailureVerdict::Unclassified;
    }
    if failure.reason() == FailureReason::Timeout {
        return FailureVerdict::Timeout;
    }
    if let Some(status) = failure.status_code() {
        return FailureVerdict::Maintenance(status);
    }
    if retry_count >= retry_limit {
        FailureVerdict::Exhausted
    } else {
        FailureVerdict::Retry
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{classify_failure, classify_response, FailureVerdict, ResponseVerdict};
    use crate::{Reply, TransportFailure, TransportResponse};

    fn response(body: serde_json::Value) -> TransportResponse {
        TransportResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    #[test]
    fn code_200_resolves_with_envelope() {
        match classify_response(response(json!({"code": 200, "msg": "", "data": [1]}))) {
            ResponseVerdict::Resolve(Reply::Success(envelope)) => {
                assert_eq!(envelope.data, json!([1]))
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn code_401_is_unauthorized_with_message() {
        assert_eq!(
            classify_response(response(json!({"code": 401, "msg": "expired"}))),
            ResponseVerdict::Unauthorized {
                msg: "expired".to_owned()
            }
        );
    }

    #[test]
    fn code_500_keeps_full_response() {
        match classify_response(response(json!({"code": 500, "msg": "db down"}))) {
            ResponseVerdict::ServerError(raw) => {
                assert_eq!(raw.status, 200);
                assert_eq!(raw.message(), Some("db down"));
                assert!(raw.body.contains("db down"));
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn other_codes_and_plain_bodies_pass_through() {
        match classify_response(response(json!({"code": 302, "msg": "moved"}))) {
            ResponseVerdict::Resolve(Reply::PassThrough(raw)) => assert_eq!(raw.code(), Some(302)),
            other => panic!("expected pass-through, got {other:?}"),
        }

        let plain = TransportResponse {
            status: 204,
            body: String::new(),
        };
        match classify_response(plain) {
            ResponseVerdict::Resolve(Reply::PassThrough(raw)) => {
                assert_eq!(raw.status, 204);
                assert!(raw.envelope.is_none());
            }
            other => panic!("expected pass-through, got {other:?}"),
        }
    }

    #[test]
    fn stale_wins_over_everything() {
        let failure = TransportFailure::timeout("elapsed");
        assert_eq!(
            classify_failure(&failure, true, 3, 0),
            FailureVerdict::Stale
        );
    }

    #[test]
    fn zero_budget_is_unclassified() {
        let failure = TransportFailure::timeout("elapsed");
        assert_eq!(
            classify_failure(&failure, false, 0, 0),
            FailureVerdict::Unclassified
        );
    }

    #[test]
    fn timeouts_never_retry() {
        let failure = TransportFailure::timeout("elapsed");
        assert_eq!(
            classify_failure(&failure, false, 5, 0),
            FailureVerdict::Timeout
        );
    }

    #[test]
    fn status_failures_are_maintenance() {
        let failure = TransportFailure::status(503, "unavailable");
        assert_eq!(
            classify_failure(&failure, false, 5, 0),
            FailureVerdict::Maintenance(503)
        );
    }

    #[test]
    fn network_failures_retry_until_budget_spent() {
        let failure = TransportFailure::network("connection refused");
        assert_eq!(classify_failure(&failure, false, 2, 0), FailureVerdict::Retry);
        assert_eq!(classify_failure(&failure, false, 2, 1), FailureVerdict::Retry);
        assert_eq!(
            classify_failure(&failure, false, 2, 2),
            FailureVerdict::Exhausted
        );
    }
}
