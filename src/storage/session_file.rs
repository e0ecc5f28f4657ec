use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::calendar::Session;

#[derive(Debug, Error)]
pub enum SessionStorageError {
    #[error("Failed to access session file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse session file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// What survives a restart: who is signed in and the cookie proving it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub session: Session,
    pub token: Option<String>,
}

pub struct SessionStorage {
    path: PathBuf,
}

impl SessionStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, stored: &StoredSession) -> Result<(), SessionStorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(stored)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// `Ok(None)` when nothing has been stored yet.
    pub fn load(&self) -> Result<Option<StoredSession>, SessionStorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let stored: StoredSession = serde_json::from_str(&content)?;
        Ok(Some(stored))
    }

    pub fn clear(&self) -> Result<(), SessionStorageError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_stored_session() -> StoredSession {
        StoredSession {
            session: Session::signed_in("u1", "Alice"),
            token: Some("s1".to_string()),
        }
    }

    #[test]
    fn save_session_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("session.json");
        let storage = SessionStorage::new(path.clone());

        storage.save(&create_stored_session()).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn load_session_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SessionStorage::new(temp_dir.path().join("session.json"));
        let original = create_stored_session();

        storage.save(&original).unwrap();
        let loaded = storage.load().unwrap();

        assert_eq!(loaded, Some(original));
    }

    #[test]
    fn load_missing_session_returns_none() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SessionStorage::new(temp_dir.path().join("missing.json"));

        assert_eq!(storage.load().unwrap(), None);
    }

    #[test]
    fn load_corrupt_session_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        let storage = SessionStorage::new(path);

        assert!(matches!(storage.load(), Err(SessionStorageError::ParseError(_))));
    }

    #[test]
    fn clear_removes_file_and_tolerates_absence() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        let storage = SessionStorage::new(path.clone());
        storage.save(&create_stored_session()).unwrap();

        storage.clear().unwrap();
        storage.clear().unwrap();

        assert!(!path.exists());
    }
}
