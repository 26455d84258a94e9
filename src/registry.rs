use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{AbortHandle, RequestKey};

/// Proof of registration for one dispatched attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallTicket {
    key: RequestKey,
    call_id: u64,
    superseded_previous: bool,
}

impl CallTicket {
    pub fn key(&self) -> &RequestKey {
        &self.key
    }

    /// `true` if registering this call aborted an older identical one.
    pub fn superseded_previous(&self) -> bool {
        self.superseded_previous
    }
}

#[derive(Debug)]
struct InFlightEntry {
    call_id: u64,
    abort: Option<AbortHandle>,
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: HashMap<RequestKey, InFlightEntry>,
    suppressed: HashSet<u64>,
    next_call_id: u64,
}

/// Tracks which request keys have an outstanding call.
///
/// Last writer wins: registering a key that is already in flight aborts the
/// older call, marks it suppressed and hands the entry to the newer call.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    state: Mutex<RegistryState>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a call for `key`, superseding any older call.
    pub fn try_register(&self, key: RequestKey, abort: AbortHandle) -> CallTicket {
        let mut state = self.lock();
        state.next_call_id += 1;
        let call_id = state.next_call_id;

        let previous = state.entries.insert(
            key.clone(),
            InFlightEntry {
                call_id,
                abort: Some(abort),
            },
        );

        let superseded_previous = match previous {
            Some(previous) => {
                state.suppressed.insert(previous.call_id);
                if let Some(handle) = previous.abort {
                    handle.abort();
                }
                #[cfg(feature = "tracing")]
                tracing::debug!(key = %key, "superseding in-flight request");
                true
            }
            None => false,
        };

        CallTicket {
            key,
            call_id,
            superseded_previous,
        }
    }

    /// Registers a retry attempt for `key` only if no other call holds it.
    ///
    /// Returns `None` when a newer identical call registered while the
    /// retrying call was waiting out its backoff; that call keeps the entry.
    pub fn resume(&self, key: RequestKey, abort: AbortHandle) -> Option<CallTicket> {
        let mut state = self.lock();
        if state.entries.contains_key(&key) {
            #[cfg(feature = "tracing")]
            tracing::debug!(key = %key, "retry yields to newer in-flight request");
            return None;
        }

        state.next_call_id += 1;
        let call_id = state.next_call_id;
        state.entries.insert(
            key.clone(),
            InFlightEntry {
                call_id,
                abort: Some(abort),
            },
        );
        Some(CallTicket {
            key,
            call_id,
            superseded_previous: false,
        })
    }

    /// Removes the entry if `ticket` still owns it. Returns whether an entry
    /// was removed.
    pub fn release(&self, ticket: &CallTicket) -> bool {
        let mut state = self.lock();
        state.suppressed.remove(&ticket.call_id);
        let owns = state
            .entries
            .get(&ticket.key)
            .is_some_and(|entry| entry.call_id == ticket.call_id);
        if owns {
            state.entries.remove(&ticket.key);
        }
        owns
    }

    /// Checks and clears the suppressed mark of `ticket`.
    pub fn consume_suppressed(&self, ticket: &CallTicket) -> bool {
        self.lock().suppressed.remove(&ticket.call_id)
    }

    pub fn is_in_flight(&self, key: &RequestKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{abort_pair, InFlightRegistry, RequestConfig};

    #[test]
    fn register_and_release_round_trip() {
        let registry = InFlightRegistry::new();
        let key = RequestConfig::get("/users").key();
        let (handle, _signal) = abort_pair();

        let ticket = registry.try_register(key.clone(), handle);
        assert!(!ticket.superseded_previous());
        assert!(registry.is_in_flight(&key));

        assert!(registry.release(&ticket));
        assert!(registry.is_empty());
        assert!(!registry.release(&ticket));
    }

    #[tokio::test]
    async fn newer_call_aborts_and_supersedes_older() {
        let registry = InFlightRegistry::new();
        let key = RequestConfig::get("/users").key();
        let (first_handle, first_signal) = abort_pair();
        let (second_handle, _second_signal) = abort_pair();

        let first = registry.try_register(key.clone(), first_handle);
        let second = registry.try_register(key.clone(), second_handle);
        assert!(second.superseded_previous());
        assert_eq!(registry.len(), 1);

        tokio::time::timeout(Duration::from_millis(100), first_signal.aborted())
            .await
            .expect("older call must be aborted");

        assert!(registry.consume_suppressed(&first));
        assert!(!registry.consume_suppressed(&first));
        assert!(!registry.consume_suppressed(&second));

        // The stale ticket no longer owns the entry.
        assert!(!registry.release(&first));
        assert!(registry.is_in_flight(&key));
        assert!(registry.release(&second));
        assert!(registry.is_empty());
    }

    #[test]
    fn release_clears_suppressed_mark() {
        let registry = InFlightRegistry::new();
        let key = RequestConfig::get("/users").key();
        let (a, _sa) = abort_pair();
        let (b, _sb) = abort_pair();

        let first = registry.try_register(key.clone(), a);
        let second = registry.try_register(key, b);
        registry.release(&first);
        assert!(!registry.consume_suppressed(&first));
        assert!(registry.release(&second));
    }

    #[tokio::test]
    async fn resume_never_supersedes_an_owner() {
        let registry = InFlightRegistry::new();
        let key = RequestConfig::get("/feed").key();
        let (newer_handle, newer_signal) = abort_pair();
        let (retry_handle, _retry_signal) = abort_pair();

        let newer = registry.try_register(key.clone(), newer_handle);
        assert!(registry.resume(key.clone(), retry_handle).is_none());
        assert!(!registry.consume_suppressed(&newer));

        let not_aborted =
            tokio::time::timeout(Duration::from_millis(30), newer_signal.aborted()).await;
        assert!(not_aborted.is_err());

        assert!(registry.release(&newer));
        let (handle, _signal) = abort_pair();
        let resumed = registry
            .resume(key.clone(), handle)
            .expect("vacant key must resume");
        assert!(!resumed.superseded_previous());
        assert!(registry.is_in_flight(&key));
        assert!(registry.release(&resumed));
    }

    #[test]
    fn distinct_keys_are_independent() {
        let registry = InFlightRegistry::new();
        let (a, _sa) = abort_pair();
        let (b, _sb) = abort_pair();

        let first = registry.try_register(RequestConfig::get("/a").key(), a);
        let second = registry.try_register(RequestConfig::get("/b").key(), b);
        assert!(!second.superseded_previous());
        assert_eq!(registry.len(), 2);
        assert!(registry.release(&first));
        assert!(registry.release(&second));
    }
}
