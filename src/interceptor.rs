use std::sync::Arc;

use crate::{
    token::bearer_authorization, Loading, Notifier, RequestOptions, TokenSource, TransportRequest,
};

pub(crate) const AUTHORIZATION: &str = "Authorization";

/// User hook run on every outgoing attempt, after auth injection.
///
/// Interceptors may rewrite headers, params or body, e.g. to sign requests
/// whose options set `require_signature`.
pub trait Interceptor: Send + Sync {
    fn on_request(&self, request: &mut TransportRequest, options: &RequestOptions);
}

/// Built-in request interception: bearer token, loading signal, user hooks.
pub(crate) struct RequestInterceptor<'a> {
    pub(crate) tokens: &'a dyn TokenSource,
    pub(crate) notifier: &'a dyn Notifier,
    pub(crate) default_loading_label: &'a str,
    pub(crate) chain: &'a [Arc<dyn Interceptor>],
}

impl RequestInterceptor<'_> {
    /// Prepares `request` for dispatch. Returns whether a loading indicator
    /// was shown and must be hidden on completion.
    pub(crate) fn intercept(
        &self,
        request: &mut TransportRequest,
        options: &RequestOptions,
    ) -> bool {
        let authorization = self
            .tokens
            .token()
            .as_deref()
            .and_then(bearer_authorization);
        if let Some(authorization) = authorization {
            request
                .headers
                .retain(|name, _| !name.eq_ignore_ascii_case(AUTHORIZATION));
            request
                .headers
                .insert(AUTHORIZATION.to_owned(), authorization);
        }

        let shown = match &options.loading {
            Loading::Off => false,
            Loading::Default => {
                self.notifier.show_loading(self.default_loading_label);
                true
            }
            Loading::Label(label) => {
                self.notifier.show_loading(label);
                true
            }
        };

        for interceptor in self.chain {
            interceptor.on_request(request, options);
        }

        shown
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{Interceptor, RequestInterceptor};
    use crate::{
        Loading, NoToken, Notifier, RequestConfig, RequestOptions, TokenStore, TransportRequest,
    };

    #[derive(Default)]
    struct Labels(Mutex<Vec<String>>);

    impl Notifier for Labels {
        fn show_loading(&self, label: &str) {
            self.0.lock().expect("labels lock").push(label.to_owned());
        }
    }

    struct Sign;

    impl Interceptor for Sign {
        fn on_request(&self, request: &mut TransportRequest, options: &RequestOptions) {
            if options.require_signature {
                request.headers.insert("X-Sign".to_owned(), "sig".to_owned());
            }
        }
    }

    #[test]
    fn injects_bearer_token_over_existing_header() {
        let tokens = TokenStore::with_token("t-1");
        let notifier = Labels::default();
        let interceptor = RequestInterceptor {
            tokens: &tokens,
            notifier: &notifier,
            default_loading_label: "Loading...",
            chain: &[],
        };
        let config = RequestConfig::get("/me").header("authorization", "Bearer old");
        let mut request = config.to_transport_request(1_000);

        let shown = interceptor.intercept(&mut request, &config.custom);

        assert!(!shown);
        assert_eq!(request.header("Authorization"), Some("Bearer t-1"));
        assert_eq!(request.headers.len(), 1);
    }

    #[test]
    fn missing_token_leaves_headers_untouched() {
        let notifier = Labels::default();
        let interceptor = RequestInterceptor {
            tokens: &NoToken,
            notifier: &notifier,
            default_loading_label: "Loading...",
            chain: &[],
        };
        let config = RequestConfig::get("/public");
        let mut request = config.to_transport_request(1_000);
        interceptor.intercept(&mut request, &config.custom);
        assert!(request.header("Authorization").is_none());
    }

    #[test]
    fn loading_uses_custom_or_default_label() {
        let notifier = Labels::default();
        let interceptor = RequestInterceptor {
            tokens: &NoToken,
            notifier: &notifier,
            default_loading_label: "Loading...",
            chain: &[],
        };

        for loading in [Loading::Default, Loading::Label("Saving".to_owned())] {
            let config = RequestConfig::post("/save").loading(loading);
            let mut request = config.to_transport_request(1_000);
            assert!(interceptor.intercept(&mut request, &config.custom));
        }

        let labels = notifier.0.lock().expect("labels lock").clone();
        assert_eq!(labels, vec!["Loading...".to_owned(), "Saving".to_owned()]);
    }

    #[test]
    fn user_interceptors_see_options() {
        let notifier = Labels::default();
        let chain: Vec<Arc<dyn Interceptor>> = vec![Arc::new(Sign)];
        let interceptor = RequestInterceptor {
            tokens: &NoToken,
            notifier: &notifier,
            default_loading_label: "Loading...",
            chain: &chain,
        };

        let signed = RequestConfig::post("/pay");
        let mut request = signed.to_transport_request(1_000);
        interceptor.intercept(&mut request, &signed.custom);
        assert_eq!(request.header("x-sign"), Some("sig"));

        let unsigned = RequestConfig::post("/pay").require_signature(false);
        let mut request = unsigned.to_transport_request(1_000);
        interceptor.intercept(&mut request, &unsigned.custom);
        assert!(request.header("x-sign").is_none());
    }
}
