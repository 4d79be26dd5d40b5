pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::session::Session;
use crate::models::user::User;
use std::sync::Arc;
use tracing::{debug, warn};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_DATA_KEY: &str = "user_data";

/// String key/value storage that survives restarts.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn remove(&self, key: &str) -> Result<(), AppError>;
}

/// What was found in storage at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredSession {
    Empty,
    Complete(Session),
    /// Some keys were present but they do not form a usable session.
    Corrupt,
}

/// Typed access to the three persisted session keys.
#[derive(Clone)]
pub struct PersistedSession {
    store: Arc<dyn KeyValueStore>,
}

impl PersistedSession {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> StoredSession {
        let access_token = self.read(ACCESS_TOKEN_KEY);
        let refresh_token = self.read(REFRESH_TOKEN_KEY);
        let user_data = self.read(USER_DATA_KEY);

        let (access_token, user_data) = match (access_token, user_data) {
            (Ok(Some(token)), Ok(Some(data))) if !token.trim().is_empty() => (token, data),
            (Ok(None), Ok(None)) if matches!(refresh_token, Ok(None)) => return StoredSession::Empty,
            _ => return StoredSession::Corrupt,
        };

        let user = match serde_json::from_str::<User>(&user_data) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "persisted user record is not valid JSON");
                return StoredSession::Corrupt;
            }
        };

        StoredSession::Complete(Session {
            access_token,
            refresh_token: refresh_token.ok().flatten(),
            user,
        })
    }

    /// Writes every key of `session`. When any write fails the store is cleared
    /// so a half-written session can never be loaded.
    pub fn save(&self, session: &Session) -> Result<(), AppError> {
        let result = self.write_all(session);
        if let Err(e) = &result {
            warn!(error = ?e, "failed to persist session, clearing stored session");
            if let Err(clear_err) = self.clear() {
                warn!(error = ?clear_err, "failed to clear partially written session");
            }
        }
        result
    }

    // The user record goes first and comes back last, so an interrupted write
    // never pairs one user's record with another user's tokens.
    fn write_all(&self, session: &Session) -> Result<(), AppError> {
        let user_data = serde_json::to_string(&session.user)?;
        self.store.remove(USER_DATA_KEY)?;
        self.store.set(ACCESS_TOKEN_KEY, &session.access_token)?;
        match &session.refresh_token {
            Some(refresh) => self.store.set(REFRESH_TOKEN_KEY, refresh)?,
            None => self.store.remove(REFRESH_TOKEN_KEY)?,
        }
        self.store.set(USER_DATA_KEY, &user_data)?;
        debug!(user_id = session.user.id, "session persisted");
        Ok(())
    }

    /// Removes all session keys, attempting every key even if one fails.
    pub fn clear(&self) -> Result<(), AppError> {
        let results = [
            self.store.remove(ACCESS_TOKEN_KEY),
            self.store.remove(REFRESH_TOKEN_KEY),
            self.store.remove(USER_DATA_KEY),
        ];
        results.into_iter().collect::<Result<Vec<_>, _>>().map(|_| ())
    }

    /// Re-read on every call; never cached.
    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY).ok().flatten().filter(|token| !token.trim().is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY).ok().flatten().filter(|token| !token.trim().is_empty())
    }

    pub fn set_access_token(&self, access_token: &str) -> Result<(), AppError> {
        self.store.set(ACCESS_TOKEN_KEY, access_token)
    }

    pub fn set_refresh_token(&self, refresh_token: &str) -> Result<(), AppError> {
        self.store.set(REFRESH_TOKEN_KEY, refresh_token)
    }

    fn read(&self, key: &str) -> Result<Option<String>, AppError> {
        self.store.get(key).inspect_err(|e| warn!(key = %key, error = ?e, "failed to read session storage"))
    }
}
