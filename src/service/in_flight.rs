use crate::error::AppError;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

/// Set of keys with an operation currently running.
///
/// A key is held for as long as its [`InFlightPermit`] is alive, so the guard
/// is released on every exit path including cancellation.
#[derive(Debug)]
pub struct InFlight<K: Eq + Hash> {
    keys: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash> Clone for InFlight<K> {
    fn clone(&self) -> Self {
        Self { keys: Arc::clone(&self.keys) }
    }
}

impl<K: Eq + Hash> Default for InFlight<K> {
    fn default() -> Self {
        Self {
            keys: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl<K: Eq + Hash + Clone> InFlight<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when an operation for `key` is already running.
    pub fn try_acquire(&self, key: K) -> Option<InFlightPermit<K>> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert(key.clone()) {
            return None;
        }
        Some(InFlightPermit {
            key: Some(key),
            keys: Arc::clone(&self.keys),
        })
    }

    pub fn acquire(&self, key: K) -> Result<InFlightPermit<K>, AppError> {
        self.try_acquire(key).ok_or(AppError::InProgress)
    }

    pub fn is_held(&self, key: &K) -> bool {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner).contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct InFlightPermit<K: Eq + Hash> {
    key: Option<K>,
    keys: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash> Drop for InFlightPermit<K> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.keys.lock().unwrap_or_else(PoisonError::into_inner).remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_for_same_key_is_refused() {
        let guard = InFlight::new();
        let permit = guard.try_acquire(3).unwrap();
        assert!(guard.try_acquire(3).is_none());
        assert!(matches!(guard.acquire(3), Err(AppError::InProgress)));
        assert!(guard.is_held(&3));

        drop(permit);
        assert!(!guard.is_held(&3));
        assert!(guard.try_acquire(3).is_some());
    }

    #[test]
    fn keys_are_independent() {
        let guard = InFlight::new();
        let _a = guard.try_acquire(1).unwrap();
        let _b = guard.try_acquire(2).unwrap();
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn clones_share_state() {
        let guard = InFlight::new();
        let other = guard.clone();
        let _permit = guard.try_acquire("save").unwrap();
        assert!(other.try_acquire("save").is_none());
    }

    #[tokio::test]
    async fn permit_is_released_when_future_is_dropped() {
        let guard = InFlight::new();
        let held = guard.clone();
        let task = tokio::spawn(async move {
            let _permit = held.try_acquire(5).unwrap();
            std::future::pending::<()>().await;
        });
        tokio::task::yield_now().await;
        while !guard.is_held(&5) {
            tokio::task::yield_now().await;
        }

        task.abort();
        let _ = task.await;
        assert!(guard.is_empty());
    }
}
