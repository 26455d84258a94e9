use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::{
    classify::{classify_response, FailureVerdict, ResponseVerdict},
    EnvelopeError, Navigator, NoticeKind, Notifier, Reply, RequestOptions, Result,
    TransportFailure, TransportResponse,
};

pub(crate) const LOGIN_EXPIRED_NOTICE: &str = "Login expired, please sign in again";
pub(crate) const TIMEOUT_NOTICE: &str = "Request timed out";
pub(crate) const NETWORK_UNSTABLE_NOTICE: &str =
    "Network unstable, please check your network settings";

const LOGIN_EXPIRED_NOTICE_DURATION: Duration = Duration::from_millis(1_500);
const SERVER_ERROR_NOTICE_DURATION: Duration = Duration::from_millis(4_000);
const FAILURE_NOTICE_DURATION: Duration = Duration::from_millis(3_000);

/// Delayed navigation to the login page with a cooldown window.
///
/// The first `401` schedules navigation after `delay`; further `401`s within
/// `delay` of the last scheduled one are dropped.
#[derive(Debug)]
pub(crate) struct LoginRedirect {
    path: String,
    delay: Duration,
    last_scheduled: Mutex<Option<Instant>>,
}

impl LoginRedirect {
    pub(crate) fn new(path: impl Into<String>, delay: Duration) -> Self {
        Self {
            path: path.into(),
            delay,
            last_scheduled: Mutex::new(None),
        }
    }

    /// Returns whether a navigation was scheduled.
    pub(crate) fn schedule(&self, navigator: Arc<dyn Navigator>) -> bool {
        let now = Instant::now();
        {
            let mut last = self
                .last_scheduled
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if (*last).is_some_and(|at| now.duration_since(at) < self.delay) {
                return false;
            }
            *last = Some(now);
        }

        let path = self.path.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            sleep(delay).await;
            #[cfg(feature = "tracing")]
            tracing::info!(path = %path, "navigating to login after expired session");
            navigator.navigate_to(&path);
        });
        true
    }
}

/// Turns classified outcomes into replies, errors and user notices.
pub(crate) struct RetryController<'a> {
    pub(crate) notifier: &'a dyn Notifier,
    pub(crate) navigator: &'a Arc<dyn Navigator>,
    pub(crate) login_redirect: &'a LoginRedirect,
    pub(crate) backoff: Duration,
}

impl RetryController<'_> {
    pub(crate) fn settle_response(
        &self,
        options: &RequestOptions,
        response: TransportResponse,
    ) -> Result<Reply> {
        match classify_response(response) {
            ResponseVerdict::Resolve(reply) => Ok(reply),
            ResponseVerdict::Unauthorized { msg } => {
                self.notifier.show_notice(
                    LOGIN_EXPIRED_NOTICE,
                    NoticeKind::Info,
                    LOGIN_EXPIRED_NOTICE_DURATION,
                );
                self.login_redirect.schedule(Arc::clone(self.navigator));
                Err(EnvelopeError::Unauthorized { msg })
            }
            ResponseVerdict::ServerError(response) => {
                if !options.suppress_error_toast {
                    self.notifier.show_notice(
                        response.message().unwrap_or_default(),
                        NoticeKind::Info,
                        SERVER_ERROR_NOTICE_DURATION,
                    );
                }
                Err(EnvelopeError::Server { response })
            }
        }
    }

    /// Returns the terminal error for `verdict`, or `None` to retry.
    pub(crate) fn settle_failure(
        &self,
        verdict: FailureVerdict,
        failure: TransportFailure,
        timeout_ms: u64,
    ) -> Option<EnvelopeError> {
        match verdict {
            FailureVerdict::Stale => Some(EnvelopeError::StaleDuplicate),
            FailureVerdict::Unclassified => Some(EnvelopeError::Transport(failure)),
            FailureVerdict::Timeout => {
                self.notifier
                    .show_notice(TIMEOUT_NOTICE, NoticeKind::Error, FAILURE_NOTICE_DURATION);
                Some(EnvelopeError::Timeout { timeout_ms })
            }
            FailureVerdict::Maintenance(status) => Some(EnvelopeError::Maintenance { status }),
            FailureVerdict::Exhausted => {
                self.notifier.show_notice(
                    NETWORK_UNSTABLE_NOTICE,
                    NoticeKind::Info,
                    FAILURE_NOTICE_DURATION,
                );
                Some(EnvelopeError::Transport(failure))
            }
            FailureVerdict::Retry => None,
        }
    }

    /// Waits the constant backoff before the next attempt.
    pub(crate) async fn wait_before_retry(&self, retry_count: u32) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            retry = retry_count,
            "retrying request after {} ms",
            self.backoff.as_millis()
        );
        #[cfg(not(feature = "tracing"))]
        let _ = retry_count;

        sleep(self.backoff).await;
    }
}
