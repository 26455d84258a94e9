/// Client-wide timeout, backoff and collaborator settings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Constant delay before each retried attempt, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Navigation target after an expired login.
    pub login_path: String,
    /// Delay before navigating to `login_path`; also the cooldown window
    /// inside which further `401`s do not navigate again.
    pub login_redirect_delay_ms: u64,
    /// Loading label used when a request sets `loading` without a label.
    pub loading_label: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            retry_backoff_ms: 500,
            login_path: "/pages/common-user/login".to_owned(),
            login_redirect_delay_ms: 2_000,
            loading_label: "Loading...".to_owned(),
        }
    }
}

/// Loading indicator requested for a call.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Loading {
    #[default]
    Off,
    /// Show the indicator with the client's default label.
    Default,
    /// Show the indicator with a custom label.
    Label(String),
}

impl Loading {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Off)
    }
}

impl From<bool> for Loading {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::Default
        } else {
            Self::Off
        }
    }
}

impl From<&str> for Loading {
    fn from(label: &str) -> Self {
        Self::Label(label.to_owned())
    }
}

impl From<String> for Loading {
    fn from(label: String) -> Self {
        Self::Label(label)
    }
}

/// Per-request pipeline options.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestOptions {
    pub loading: Loading,
    /// Maximum number of retries for network failures. `0` disables
    /// classification of transport failures entirely.
    pub retry: u32,
    /// Skip duplicate-request suppression for this call.
    pub disable_dedup: bool,
    /// Hint for signing interceptors.
    pub require_signature: bool,
    /// Skip the error notice for envelope code `500`.
    pub suppress_error_toast: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            loading: Loading::Off,
            retry: 1,
            disable_dedup: false,
            require_signature: true,
            suppress_error_toast: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ClientOptions, Loading, RequestOptions};

    #[test]
    fn request_defaults() {
        let options = RequestOptions::default();
        assert_eq!(options.loading, Loading::Off);
        assert_eq!(options.retry, 1);
        assert!(!options.disable_dedup);
        assert!(options.require_signature);
        assert!(!options.suppress_error_toast);
    }

    #[test]
    fn client_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.timeout_ms, 60_000);
        assert_eq!(options.retry_backoff_ms, 500);
        assert_eq!(options.login_redirect_delay_ms, 2_000);
    }

    #[test]
    fn loading_conversions() {
        assert_eq!(Loading::from(true), Loading::Default);
        assert_eq!(Loading::from(false), Loading::Off);
        assert_eq!(Loading::from("Saving"), Loading::Label("Saving".to_owned()));
        assert!(!Loading::Off.is_enabled());
    }
}
