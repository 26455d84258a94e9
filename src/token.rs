use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Synchronous lookup of the stored auth token.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<String>;
}

impl<F> TokenSource for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// Token source that never yields a token.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoToken;

impl TokenSource for NoToken {
    fn token(&self) -> Option<String> {
        None
    }
}

/// Shared, settable token slot. Clones share the same token.
#[derive(Clone, Default)]
pub struct TokenStore {
    token: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set(token);
        store
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.get().is_some() {
            "<redacted>"
        } else {
            "<none>"
        };
        f.debug_struct("TokenStore").field("token", &token).finish()
    }
}

impl TokenSource for TokenStore {
    fn token(&self) -> Option<String> {
        self.get()
    }
}

/// Builds an `Authorization` value, adding the `Bearer ` prefix when missing.
pub(crate) fn bearer_authorization(token: &str) -> Option<String> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return None;
    }
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        Some(trimmed.to_owned())
    } else {
        Some(format!("Bearer {trimmed}"))
    }
}
