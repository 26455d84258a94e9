use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value as JsonValue;
use tokio::sync::oneshot;

/// Single outgoing attempt, after interception.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    /// Either an absolute URL or a path joined onto the transport's base URL.
    pub url: String,
    pub headers: BTreeMap<String, String>,
    /// Query parameters, expected to be a JSON object.
    pub params: Option<JsonValue>,
    /// JSON request body.
    pub data: Option<JsonValue>,
    pub timeout: Duration,
}

impl TransportRequest {
    /// Returns a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Completed 2xx exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Why a transport attempt did not produce a 2xx response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The per-attempt timeout elapsed.
    Timeout,
    /// No response at all: connection refused, reset, DNS, and similar.
    Network,
    /// The call was aborted through its [`AbortHandle`].
    Aborted,
    /// The server answered with a non-success status.
    Status,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Aborted => "aborted",
            Self::Status => "status",
        };
        f.write_str(text)
    }
}

/// Transport-level failure of a single attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportFailure {
    reason: FailureReason,
    status: Option<u16>,
    body: Option<String>,
    message: String,
}

impl TransportFailure {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::without_status(FailureReason::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::without_status(FailureReason::Network, message)
    }

    pub fn aborted() -> Self {
        Self::without_status(FailureReason::Aborted, "request aborted")
    }

    /// Non-2xx answer with its raw body.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            reason: FailureReason::Status,
            status: Some(status),
            body: Some(body.into()),
            message: format!("http status {status}"),
        }
    }

    fn without_status(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            status: None,
            body: None,
            message: message.into(),
        }
    }

    pub fn reason(&self) -> FailureReason {
        self.reason
    }

    /// HTTP status code, present only when the server answered.
    pub fn status_code(&self) -> Option<u16> {
        self.status
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.reason)
    }
}

impl std::error::Error for TransportFailure {}

/// Performs one HTTP attempt.
///
/// Implementations enforce `request.timeout` themselves and report it as
/// [`FailureReason::Timeout`]. Non-2xx answers must be returned as
/// [`TransportFailure::status`].
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportFailure>> + Send;
}

/// Cancels the in-flight call it was created for.
#[derive(Debug)]
pub struct AbortHandle(oneshot::Sender<()>);

impl AbortHandle {
    pub fn abort(self) {
        let _ = self.0.send(());
    }
}

/// Receiving side of an [`AbortHandle`].
#[derive(Debug)]
pub struct AbortSignal(oneshot::Receiver<()>);

impl AbortSignal {
    /// Completes once [`AbortHandle::abort`] is called. Dropping the handle
    /// without aborting leaves this pending forever.
    pub async fn aborted(self) {
        if self.0.await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Creates a linked abort handle and signal.
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = oneshot::channel();
    (AbortHandle(tx), AbortSignal(rx))
}

/// Runs one attempt, racing the transport against the abort signal.
///
/// An abort that is already pending wins over a ready response.
pub(crate) async fn dispatch<T: Transport>(
    transport: &T,
    request: TransportRequest,
    signal: AbortSignal,
) -> Result<TransportResponse, TransportFailure> {
    tokio::select! {
        biased;
        () = signal.aborted() => Err(TransportFailure::aborted()),
        result = transport.send(request) => result,
    }
}

/// Default [`Transport`] backed by `reqwest`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Uses a preconfigured `reqwest::Client` (proxies, TLS roots, pools).
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") || self.base_url.is_empty() {
            return url.to_owned();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportFailure>> + Send {
        async move {
            let url = self.resolve_url(&request.url);
            let mut builder = self
                .http
                .request(request.method.clone(), &url)
                .timeout(request.timeout);

            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(params) = &request.params {
                builder = builder.query(&query_pairs(params));
            }
            if let Some(data) = &request.data {
                builder = builder.json(data);
            }

            let response = builder.send().await.map_err(map_reqwest_error)?;
            let status = response.status();
            let body = response.text().await.map_err(map_reqwest_error)?;

            if !status.is_success() {
                return Err(TransportFailure::status(status.as_u16(), body));
            }

            Ok(TransportResponse {
                status: status.as_u16(),
                body,
            })
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::timeout(err.to_string())
    } else {
        TransportFailure::network(err.to_string())
    }
}

/// Flattens a JSON object into query pairs. Arrays repeat the key, `null`
/// entries are skipped. Non-object params never reach here; the client
/// rejects them before dispatch.
fn query_pairs(params: &JsonValue) -> Vec<(String, String)> {
    let Some(object) = params.as_object() else {
        return Vec::new();
    };

    let mut pairs = Vec::with_capacity(object.len());
    for (name, value) in object {
        match value {
            JsonValue::Null => {}
            JsonValue::Array(items) => {
                for item in items {
                    if let Some(text) = query_scalar(item) {
                        pairs.push((name.clone(), text));
                    }
                }
            }
            other => {
                if let Some(text) = query_scalar(other) {
                    pairs.push((name.clone(), text));
                }
            }
        }
    }
    pairs
}

fn query_scalar(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
