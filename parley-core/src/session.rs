use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::Message;

/// Key the session snapshot is stored under.
pub const SNAPSHOT_KEY: &str = "parley.session";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

/// A string key-value store that outlives the process, for session snapshots.
///
/// Implementations do their own locking; every method takes `&self`.
pub trait SessionStore: Send + Sync {
    /// Returns the bytes stored under `key`, or None if absent.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn save(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store, for tests and hosts that don't persist.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data.get(key).cloned())
    }

    fn save(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.remove(key);
        Ok(())
    }
}

/// What survives a reload: enough to redraw the thread without refetching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub thread_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub next_page_cursor: Option<String>,
}

impl SessionSnapshot {
    pub fn load(store: &dyn SessionStore) -> Result<Option<Self>, StoreError> {
        match store.load(SNAPSHOT_KEY)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn save(&self, store: &dyn SessionStore) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(self)?;
        store.save(SNAPSHOT_KEY, &bytes)
    }

    pub fn clear(store: &dyn SessionStore) -> Result<(), StoreError> {
        store.remove(SNAPSHOT_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_save_load_remove() {
        let store = MemorySessionStore::new();
        assert_eq!(store.load("k").unwrap(), None);

        store.save("k", b"v").unwrap();
        assert_eq!(store.load("k").unwrap(), Some(b"v".to_vec()));

        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.load("k").unwrap(), None);
    }

    #[test]
    fn snapshot_through_store() {
        let store = MemorySessionStore::new();
        assert_eq!(SessionSnapshot::load(&store).unwrap(), None);

        let snapshot = SessionSnapshot {
            thread_id: Some("t1".to_string()),
            messages: vec![Message::user("user_1", "Hi"), Message::assistant("ai_1", "Hello")],
            next_page_cursor: Some("c2".to_string()),
        };
        snapshot.save(&store).unwrap();
        assert_eq!(SessionSnapshot::load(&store).unwrap(), Some(snapshot));

        SessionSnapshot::clear(&store).unwrap();
        assert_eq!(SessionSnapshot::load(&store).unwrap(), None);
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let store = MemorySessionStore::new();
        store.save(SNAPSHOT_KEY, b"{not json").unwrap();
        assert!(matches!(
            SessionSnapshot::load(&store),
            Err(StoreError::Encoding(_))
        ));
    }
}
