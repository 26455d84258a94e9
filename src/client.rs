use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::{
    classify::{classify_failure, FailureVerdict},
    decode::decode_reply_data,
    interceptor::RequestInterceptor,
    retry::{LoginRedirect, RetryController},
    transport::{abort_pair, dispatch},
    CallTicket, ClientOptions, EnvelopeError, InFlightRegistry, Interceptor, Navigator, NoToken,
    NoopNavigator, NoopNotifier, Notifier, Reply, RequestConfig, ReqwestTransport, Result,
    TokenSource, TokenStore, Transport,
};

/// Resilient client for `{code, msg, data}` envelope APIs.
///
/// Every call goes through duplicate suppression, auth injection,
/// envelope classification and bounded retry of network failures.
pub struct EnvelopeClient<T = ReqwestTransport> {
    transport: Arc<T>,
    registry: Arc<InFlightRegistry>,
    tokens: Arc<dyn TokenSource>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    login_redirect: Arc<LoginRedirect>,
    options: ClientOptions,
}

impl<T> Clone for EnvelopeClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            registry: Arc::clone(&self.registry),
            tokens: Arc::clone(&self.tokens),
            notifier: Arc::clone(&self.notifier),
            navigator: Arc::clone(&self.navigator),
            interceptors: self.interceptors.clone(),
            login_redirect: Arc::clone(&self.login_redirect),
            options: self.options.clone(),
        }
    }
}

impl<T> fmt::Debug for EnvelopeClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeClient")
            .field("options", &self.options)
            .field("in_flight", &self.registry.len())
            .field("interceptors", &self.interceptors.len())
            .field("token", &"<redacted>")
            .finish()
    }
}

impl EnvelopeClient<ReqwestTransport> {
    /// Creates a reqwest-backed client resolving relative URLs against `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_transport(ReqwestTransport::new(base_url))
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `ENVELOPE_HTTP_BASE_URL` — base URL for relative request paths
    /// - `ENVELOPE_HTTP_TOKEN` — optional bearer token
    /// - `ENVELOPE_HTTP_TIMEOUT_MS` — optional per-attempt timeout
    ///
    /// # Example
    ///
    /// ```no_run
    /// use envelope_http::EnvelopeClient;
    ///
    /// let client = EnvelopeClient::from_env().expect("missing ENVELOPE_HTTP_* env vars");
    /// ```
    pub fn from_env() -> std::result::Result<Self, String> {
        let base_url = std::env::var("ENVELOPE_HTTP_BASE_URL")
            .map_err(|_| "missing ENVELOPE_HTTP_BASE_URL environment variable".to_owned())?;
        if base_url.trim().is_empty() {
            return Err("ENVELOPE_HTTP_BASE_URL is set but empty".to_owned());
        }

        let mut options = ClientOptions::default();
        if let Ok(raw) = std::env::var("ENVELOPE_HTTP_TIMEOUT_MS") {
            options.timeout_ms = raw
                .trim()
                .parse()
                .map_err(|_| format!("ENVELOPE_HTTP_TIMEOUT_MS is not a number: {raw}"))?;
        }

        let mut client = Self::new(base_url).with_options(options);
        if let Ok(token) = std::env::var("ENVELOPE_HTTP_TOKEN") {
            if !token.trim().is_empty() {
                client = client.with_token_source(TokenStore::with_token(token));
            }
        }
        Ok(client)
    }
}

impl<T: Transport> EnvelopeClient<T> {
    /// Creates a client over any [`Transport`], with no token and no-op
    /// UI collaborators.
    pub fn with_transport(transport: T) -> Self {
        let options = ClientOptions::default();
        Self {
            transport: Arc::new(transport),
            registry: Arc::new(InFlightRegistry::new()),
            tokens: Arc::new(NoToken),
            notifier: Arc::new(NoopNotifier),
            navigator: Arc::new(NoopNavigator),
            interceptors: Vec::new(),
            login_redirect: Arc::new(login_redirect_for(&options)),
            options,
        }
    }

    /// Applies timeout, backoff and login redirect settings.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.login_redirect = Arc::new(login_redirect_for(&opts));
        self.options = opts;
        self
    }

    /// Sets where the bearer token is read from before every attempt.
    ///
    /// Accepts a [`TokenStore`], [`NoToken`] or any `Fn() -> Option<String>`.
    pub fn with_token_source(mut self, tokens: impl TokenSource + 'static) -> Self {
        self.tokens = Arc::new(tokens);
        self
    }

    /// Sets the sink for loading indicators and user notices.
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    /// Sets the navigator used for the delayed login redirect on code `401`.
    pub fn with_navigator(mut self, navigator: impl Navigator + 'static) -> Self {
        self.navigator = Arc::new(navigator);
        self
    }

    /// Appends a user interceptor; interceptors run in registration order.
    pub fn with_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Shares an in-flight registry, e.g. between clients hitting the same API.
    pub fn with_registry(mut self, registry: Arc<InFlightRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Returns the in-flight registry, shared by all clones of this client.
    pub fn registry(&self) -> &Arc<InFlightRegistry> {
        &self.registry
    }

    /// Returns the active client options.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sends a `GET` with default options.
    pub async fn get(&self, url: &str) -> Result<Reply> {
        self.request(RequestConfig::get(url)).await
    }

    /// Sends a `POST` with a JSON body and default options.
    pub async fn post(&self, url: &str, data: JsonValue) -> Result<Reply> {
        self.request(RequestConfig::post(url).data(data)).await
    }

    /// Sends `config` and decodes the `data` of a code-`200` envelope.
    pub async fn request_data<D: DeserializeOwned>(&self, config: RequestConfig) -> Result<D> {
        let reply = self.request(config).await?;
        decode_reply_data(reply)
    }

    /// Runs one logical request through the pipeline.
    ///
    /// Network failures without a response are retried up to
    /// `config.custom.retry` times with a constant backoff. Timeouts,
    /// non-success statuses and superseded calls are never retried. A retry
    /// that finds a newer identical call in flight gives way to it and
    /// returns [`EnvelopeError::StaleDuplicate`].
    ///
    /// Dropping the returned future releases the registration and hides the
    /// loading indicator of the attempt in flight.
    pub async fn request(&self, mut config: RequestConfig) -> Result<Reply> {
        config.validate()?;
        let key = config.key();
        let timeout_ms = config.timeout_ms.unwrap_or(self.options.timeout_ms);
        let interceptor = self.interceptor();
        let controller = self.controller();

        loop {
            let (handle, signal) = abort_pair();
            let ticket = if config.custom.disable_dedup {
                None
            } else if config.retry_count == 0 {
                Some(self.registry.try_register(key.clone(), handle))
            } else {
                match self.registry.resume(key.clone(), handle) {
                    Some(ticket) => Some(ticket),
                    None => return Err(EnvelopeError::StaleDuplicate),
                }
            };
            let mut attempt = Attempt {
                registry: &self.registry,
                notifier: self.notifier.as_ref(),
                ticket,
                loading: false,
            };

            let mut outgoing = config.to_transport_request(self.options.timeout_ms);
            attempt.loading = interceptor.intercept(&mut outgoing, &config.custom);

            #[cfg(feature = "tracing")]
            tracing::debug!(
                method = %outgoing.method,
                url = %outgoing.url,
                retry_count = config.retry_count,
                "dispatching request"
            );

            let result = dispatch(self.transport.as_ref(), outgoing, signal).await;
            attempt.hide_loading();
            let superseded = attempt.superseded();

            let failure = match result {
                // A response that raced past its abort still loses to the newer call.
                Ok(_) if superseded => {
                    attempt.disarm();
                    return Err(EnvelopeError::StaleDuplicate);
                }
                Ok(response) => {
                    attempt.release();
                    return controller.settle_response(&config.custom, response);
                }
                Err(failure) => failure,
            };

            let verdict = classify_failure(
                &failure,
                superseded,
                config.custom.retry,
                config.retry_count,
            );

            // A superseded call no longer owns the registry entry.
            if verdict == FailureVerdict::Stale {
                attempt.disarm();
            } else {
                attempt.release();
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(verdict = ?verdict, failure = %failure, "request failed");

            if let Some(err) = controller.settle_failure(verdict, failure, timeout_ms) {
                return Err(err);
            }

            config.retry_count += 1;
            controller.wait_before_retry(config.retry_count).await;
        }
    }

    fn interceptor(&self) -> RequestInterceptor<'_> {
        RequestInterceptor {
            tokens: self.tokens.as_ref(),
            notifier: self.notifier.as_ref(),
            default_loading_label: &self.options.loading_label,
            chain: &self.interceptors,
        }
    }

    fn controller(&self) -> RetryController<'_> {
        RetryController {
            notifier: self.notifier.as_ref(),
            navigator: &self.navigator,
            login_redirect: &self.login_redirect,
            backoff: Duration::from_millis(self.options.retry_backoff_ms),
        }
    }
}

/// Registration and loading state of one dispatched attempt.
///
/// Dropped mid-flight when the caller cancels; `Drop` then releases the
/// registration and hides the loading indicator.
struct Attempt<'a> {
    registry: &'a InFlightRegistry,
    notifier: &'a dyn Notifier,
    ticket: Option<CallTicket>,
    loading: bool,
}

impl Attempt<'_> {
    fn hide_loading(&mut self) {
        if std::mem::take(&mut self.loading) {
            self.notifier.hide_loading();
        }
    }

    fn superseded(&self) -> bool {
        self.ticket
            .as_ref()
            .is_some_and(|ticket| self.registry.consume_suppressed(ticket))
    }

    fn release(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.registry.release(&ticket);
        }
    }

    /// Gives up the ticket without releasing; the newer call owns the entry.
    fn disarm(&mut self) {
        self.ticket = None;
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        self.hide_loading();
        self.release();
    }
}

fn login_redirect_for(options: &ClientOptions) -> LoginRedirect {
    LoginRedirect::new(
        options.login_path.clone(),
        Duration::from_millis(options.login_redirect_delay_ms),
    )
}

#[cfg(test)]
mod tests {
    use super::EnvelopeClient;
    use crate::{ClientOptions, TokenStore};

    #[test]
    fn debug_redacts_token() {
        let client = EnvelopeClient::new("https://api.example.com")
            .with_token_source(TokenStore::with_token("secret-token"));
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn clones_share_registry() {
        let client = EnvelopeClient::new("https://api.example.com");
        let clone = client.clone();
        assert!(std::sync::Arc::ptr_eq(client.registry(), clone.registry()));
    }

    #[test]
    fn with_options_replaces_settings() {
        let client = EnvelopeClient::new("https://api.example.com").with_options(ClientOptions {
            timeout_ms: 5,
            ..ClientOptions::default()
        });
        assert_eq!(client.options().timeout_ms, 5);
    }
}
