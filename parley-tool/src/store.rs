use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parley_core::{SessionStore, StoreError};

/// Keeps each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::Unavailable(format!("invalid key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match std::fs::read(self.path_for(key)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub fn default_session_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parley")
}

/// Log file used while the terminal UI owns the screen.
pub fn default_log_path() -> PathBuf {
    default_session_dir().join("parley.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{Message, SessionSnapshot};
    use tempfile::TempDir;

    fn temp_store() -> (FileSessionStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::open(dir.path().join("sessions")).unwrap();
        (store, dir)
    }

    #[test]
    fn save_load_remove() {
        let (store, _dir) = temp_store();
        assert_eq!(store.load("parley.session").unwrap(), None);

        store.save("parley.session", b"{}").unwrap();
        assert_eq!(store.load("parley.session").unwrap(), Some(b"{}".to_vec()));

        store.remove("parley.session").unwrap();
        store.remove("parley.session").unwrap();
        assert_eq!(store.load("parley.session").unwrap(), None);
    }

    #[test]
    fn rejects_path_like_keys() {
        let (store, _dir) = temp_store();
        assert!(store.save("../escape", b"x").is_err());
        assert!(store.load("").is_err());
    }

    #[test]
    fn snapshot_persists_across_opens() {
        let dir = TempDir::new().unwrap();

        {
            let store = FileSessionStore::open(dir.path()).unwrap();
            SessionSnapshot {
                thread_id: Some("t1".to_string()),
                messages: vec![Message::user("user_1", "Hi")],
                next_page_cursor: None,
            }
            .save(&store)
            .unwrap();
        }

        let store = FileSessionStore::open(dir.path()).unwrap();
        let snapshot = SessionSnapshot::load(&store).unwrap().unwrap();
        assert_eq!(snapshot.thread_id.as_deref(), Some("t1"));
        assert_eq!(snapshot.messages.len(), 1);
    }
}
