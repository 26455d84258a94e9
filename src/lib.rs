//! `envelope-http` is a resilient async HTTP client for APIs that wrap every
//! response in a `{code, msg, data}` envelope.
//!
//! Each call made with [`EnvelopeClient::request`] passes through:
//! - duplicate suppression: a newer identical request aborts the older one
//!   ([`InFlightRegistry`])
//! - request interception: bearer token injection, loading indicator, user
//!   [`Interceptor`]s
//! - envelope classification: `200` resolves, `401` triggers a debounced
//!   login redirect, `500` raises an error notice
//! - bounded retry of network failures with a constant backoff

mod classify;
mod client;
mod decode;
mod error;
mod interceptor;
mod key;
mod notify;
mod options;
mod registry;
mod request;
mod retry;
mod token;
mod transport;
mod types;
mod wire;

pub use client::EnvelopeClient;
pub use error::EnvelopeError;
pub use interceptor::Interceptor;
pub use key::RequestKey;
pub use notify::{Navigator, NoopNavigator, NoopNotifier, NoticeKind, Notifier};
pub use options::{ClientOptions, Loading, RequestOptions};
pub use registry::{CallTicket, InFlightRegistry};
pub use request::RequestConfig;
pub use reqwest::Method;
pub use token::{NoToken, TokenSource, TokenStore};
pub use transport::{
    abort_pair, AbortHandle, AbortSignal, FailureReason, ReqwestTransport, Transport,
    TransportFailure, TransportRequest, TransportResponse,
};
pub use types::{RawResponse, Reply};
pub use wire::{Envelope, CODE_OK, CODE_SERVER_ERROR, CODE_UNAUTHORIZED};

pub type Result<T> = std::result::Result<T, EnvelopeError>;
