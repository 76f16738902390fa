//! Persisted session storage.
//!
//! Stores the access token, refresh token and serialized user record together
//! in `<base>/session.json`. Every write replaces the whole record through a
//! temp file + rename, so a reader never observes a token without its user or
//! the reverse. Tokens are never logged or displayed in full.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::config::paths;
use crate::models::{TokenPair, User};

/// The three named entries of a persisted session. Each may be absent.
///
/// `user` holds the serialized user record rather than a parsed one so a
/// damaged record can be detected at startup instead of failing the load.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl StoredSession {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.user.is_none()
    }

    /// Non-empty access token, if any.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Non-empty refresh token, if any.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Parses the stored user record.
    ///
    /// # Errors
    /// Returns an error if the record is present but is not a valid user.
    pub fn parse_user(&self) -> Result<Option<User>> {
        self.user
            .as_deref()
            .map(|raw| serde_json::from_str(raw).context("Stored user record is corrupted"))
            .transpose()
    }
}

/// File-backed session store shared by the session manager and the gateway.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SessionStore {
    /// Store at the default location (`$BLOGSPACE_HOME/session.json`).
    pub fn open_default() -> Self {
        Self::at(paths::session_path())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned lock carries no broken state.
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads the persisted session.
    /// Returns an empty session if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<StoredSession> {
        let _guard = self.guard();
        self.read_unlocked()
    }

    /// Persists a freshly authenticated session: both tokens and the user are
    /// written in one replace.
    ///
    /// # Errors
    /// Returns an error if the record cannot be serialized or written.
    pub fn save_session(&self, tokens: &TokenPair, user: &User) -> Result<()> {
        let record = StoredSession {
            access_token: Some(tokens.access.clone()),
            refresh_token: Some(tokens.refresh.clone()),
            user: Some(serde_json::to_string(user).context("Failed to serialize user")?),
        };
        let _guard = self.guard();
        self.write_unlocked(&record)
    }

    /// Replaces the access token after a refresh, and the refresh token too
    /// when the backend rotated it.
    ///
    /// Returns `false` without writing when the session was cleared in the
    /// meantime, so a late refresh cannot resurrect a logged-out session.
    ///
    /// # Errors
    /// Returns an error if the record cannot be read or written.
    pub fn update_tokens(&self, access: &str, rotated_refresh: Option<&str>) -> Result<bool> {
        let _guard = self.guard();
        let mut record = self.read_unlocked()?;
        if record.is_empty() {
            return Ok(false);
        }
        record.access_token = Some(access.to_string());
        if let Some(refresh) = rotated_refresh {
            record.refresh_token = Some(refresh.to_string());
        }
        self.write_unlocked(&record)?;
        Ok(true)
    }

    /// Replaces the stored user record, keeping the tokens.
    ///
    /// # Errors
    /// Returns an error if the record cannot be read or written.
    pub fn save_user(&self, user: &User) -> Result<()> {
        let raw = serde_json::to_string(user).context("Failed to serialize user")?;
        let _guard = self.guard();
        let mut record = self.read_unlocked()?;
        record.user = Some(raw);
        self.write_unlocked(&record)
    }

    /// Current access token, treating an unreadable record as absent.
    pub fn access_token(&self) -> Option<String> {
        self.load()
            .ok()
            .and_then(|s| s.access_token().map(ToString::to_string))
    }

    /// Current refresh token, treating an unreadable record as absent.
    pub fn refresh_token(&self) -> Option<String> {
        self.load()
            .ok()
            .and_then(|s| s.refresh_token().map(ToString::to_string))
    }

    /// Removes all three entries. Returns whether a session file existed.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<bool> {
        let _guard = self.guard();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove session at {}", self.path.display())),
        }
    }

    fn read_unlocked(&self) -> Result<StoredSession> {
        if !self.path.exists() {
            return Ok(StoredSession::default());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session from {}", self.path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session from {}", self.path.display()))
    }

    fn write_unlocked(&self, record: &StoredSession) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;

        let contents =
            serde_json::to_string_pretty(record).context("Failed to serialize session")?;

        // NamedTempFile is created 0600 on unix; the rename keeps that mode.
        let mut file = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        file.write_all(contents.as_bytes())
            .context("Failed to write session temp file")?;
        file.persist(&self.path)
            .with_context(|| format!("Failed to write session to {}", self.path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn user() -> User {
        User {
            id: 1,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            bio: String::new(),
        }
    }

    fn tokens() -> TokenPair {
        TokenPair {
            access: "access-1".to_string(),
            refresh: "refresh-1".to_string(),
        }
    }

    #[test]
    fn test_missing_file_is_empty_session() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session.json"));
        assert!(store.load().unwrap().is_empty());
        assert_eq!(store.access_token(), None);
    }

    #[test]
    fn test_save_session_writes_all_entries() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("nested").join("session.json"));

        store.save_session(&tokens(), &user()).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.access_token(), Some("access-1"));
        assert_eq!(loaded.refresh_token(), Some("refresh-1"));
        assert_eq!(loaded.parse_user().unwrap(), Some(user()));
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session.json"));
        store.save_session(&tokens(), &user()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_update_tokens_keeps_user() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session.json"));
        store.save_session(&tokens(), &user()).unwrap();

        assert!(store.update_tokens("access-2", None).unwrap());
        let loaded = store.load().unwrap();
        assert_eq!(loaded.access_token(), Some("access-2"));
        assert_eq!(loaded.refresh_token(), Some("refresh-1"));
        assert_eq!(loaded.parse_user().unwrap(), Some(user()));

        assert!(store.update_tokens("access-3", Some("refresh-2")).unwrap());
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-2"));
    }

    #[test]
    fn test_update_tokens_after_clear_does_not_resurrect() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session.json"));
        store.save_session(&tokens(), &user()).unwrap();
        store.clear().unwrap();

        assert!(!store.update_tokens("late", None).unwrap());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_clear_reports_previous_state() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path().join("session.json"));
        assert!(!store.clear().unwrap());

        store.save_session(&tokens(), &user()).unwrap();
        assert!(store.clear().unwrap());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupted_user_record_is_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(
            &path,
            r#"{"access_token":"a","refresh_token":"r","user":"{not json"}"#,
        )
        .unwrap();

        let loaded = SessionStore::at(path).load().unwrap();
        assert!(loaded.parse_user().is_err());
    }

    #[test]
    fn test_corrupted_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "garbage").unwrap();

        let store = SessionStore::at(path);
        assert!(store.load().is_err());
        assert_eq!(store.access_token(), None);
    }

    #[test]
    fn test_empty_tokens_count_as_absent() {
        let session = StoredSession {
            access_token: Some(String::new()),
            refresh_token: Some(String::new()),
            user: None,
        };
        assert_eq!(session.access_token(), None);
        assert_eq!(session.refresh_token(), None);
    }
}
