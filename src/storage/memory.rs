use crate::error::AppError;
use crate::storage::KeyValueStore;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Process-local store. Used by tests and when no session file is wanted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_on: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes to `key` always fail.
    pub fn failing_on(key: &str) -> Self {
        let store = Self::default();
        store.fail_writes_to(key);
        store
    }

    /// From now on, writes to `key` fail. Existing entries are kept.
    pub fn fail_writes_to(&self, key: &str) {
        *self.fail_on.lock().unwrap_or_else(PoisonError::into_inner) = Some(key.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let rejected = self.fail_on.lock().unwrap_or_else(PoisonError::into_inner).as_deref() == Some(key);
        if rejected {
            return Err(AppError::storage(
                format!("write to '{}' rejected", key),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "quota exceeded"),
            ));
        }
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.entries().remove(key);
        Ok(())
    }
}
