use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Method;
use serde_json::{Map, Value as JsonValue};

use crate::{EnvelopeError, Loading, RequestKey, RequestOptions, Result, TransportRequest};

/// One logical request, including its pipeline options.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestConfig {
    pub method: Method,
    pub url: String,
    /// Query parameters as a JSON object. Arrays and scalars are rejected
    /// with [`EnvelopeError::InvalidRequest`] before
    /// dispatch; `null` counts as no params.
    pub params: Option<JsonValue>,
    /// JSON body.
    pub data: Option<JsonValue>,
    pub headers: BTreeMap<String, String>,
    pub custom: RequestOptions,
    /// Overrides the client-wide per-attempt timeout.
    pub timeout_ms: Option<u64>,
    /// Retries already spent on this request.
    pub retry_count: u32,
}

impl RequestConfig {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: None,
            data: None,
            headers: BTreeMap::new(),
            custom: RequestOptions::default(),
            timeout_ms: None,
            retry_count: 0,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Replaces all query parameters. `params` must be a JSON object.
    pub fn params(mut self, params: JsonValue) -> Self {
        self.params = Some(params);
        self
    }

    /// Adds a single query parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        let mut object = match self.params.take() {
            Some(JsonValue::Object(object)) => object,
            _ => Map::new(),
        };
        object.insert(name.into(), value.into());
        self.params = Some(JsonValue::Object(object));
        self
    }

    pub fn data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn loading(mut self, loading: impl Into<Loading>) -> Self {
        self.custom.loading = loading.into();
        self
    }

    pub fn retry(mut self, retry: u32) -> Self {
        self.custom.retry = retry;
        self
    }

    pub fn disable_dedup(mut self) -> Self {
        self.custom.disable_dedup = true;
        self
    }

    pub fn require_signature(mut self, required: bool) -> Self {
        self.custom.require_signature = required;
        self
    }

    pub fn suppress_error_toast(mut self) -> Self {
        self.custom.suppress_error_toast = true;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Deduplication key of this request.
    pub fn key(&self) -> RequestKey {
        RequestKey::from_config(self)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match &self.params {
            None | Some(JsonValue::Null | JsonValue::Object(_)) => Ok(()),
            Some(other) => Err(EnvelopeError::InvalidRequest(format!(
                "query params must be a JSON object, got {other}"
            ))),
        }
    }

    pub(crate) fn to_transport_request(&self, default_timeout_ms: u64) -> TransportRequest {
        TransportRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            params: self.params.clone(),
            data: self.data.clone(),
            timeout: Duration::from_millis(self.timeout_ms.unwrap_or(default_timeout_ms)),
        }
    }
}
