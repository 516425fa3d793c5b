//! Session persistence.
//!
//! A session is a bearer token plus the optional user record returned at
//! login, kept in a small key-value store. The file backend writes
//! `<base>/session.json` with restricted permissions (0600).
//! Tokens are never logged or displayed in full.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use clientdesk_types::UserSummary;

use crate::config::paths;

const TOKEN_KEY: &str = "token";
const USER_KEY: &str = "user";

/// Persistent key-value storage behind a [`SessionStore`].
pub trait SessionBackend: Send + Sync {
    fn read(&self, key: &str) -> Option<String>;

    /// # Errors
    /// Returns an error if the value could not be persisted.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// # Errors
    /// Returns an error if the removal could not be persisted.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process storage; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, String>>,
}

impl SessionBackend for MemoryBackend {
    fn read(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// JSON object on disk, rewritten in full on every change.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backend at the default session path under `CLIENTDESK_HOME`.
    pub fn default_location() -> Self {
        Self::new(paths::session_path())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session from {}", self.path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session from {}", self.path.display()))
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(entries).context("Failed to serialize session")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents)
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        Ok(())
    }
}

impl SessionBackend for FileBackend {
    fn read(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(mut entries) => entries.remove(key),
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "ignoring unreadable session file");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        // A corrupt file is replaced rather than blocking a fresh login.
        let mut entries = self.load().unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut entries = self.load().unwrap_or_default();
        entries.remove(key);
        self.save(&entries)
    }
}

/// An authenticated session as read back from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: Option<UserSummary>,
}

impl Session {
    /// First few characters of the token followed by an ellipsis.
    pub fn redacted_token(&self) -> String {
        redact(&self.token)
    }
}

/// Shortens a secret for display.
pub fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(6).collect();
    if prefix.len() < secret.len() {
        format!("{prefix}…")
    } else {
        "…".to_string()
    }
}

/// Handle over the session backend. Clones share the same storage.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self { backend }
    }

    /// Store backed by `session.json` under `CLIENTDESK_HOME`.
    pub fn on_disk() -> Self {
        Self::new(Arc::new(FileBackend::default_location()))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::default()))
    }

    /// Persists the token, and the user record when present.
    ///
    /// A session saved without a user drops any user left from before.
    ///
    /// # Errors
    /// Returns an error if the backend fails to persist either value.
    pub fn save_session(&self, token: &str, user: Option<&UserSummary>) -> Result<()> {
        self.backend.write(TOKEN_KEY, token)?;
        match user {
            Some(user) => {
                let serialized =
                    serde_json::to_string(user).context("Failed to serialize user record")?;
                self.backend.write(USER_KEY, &serialized)?;
            }
            None => self.backend.remove(USER_KEY)?,
        }
        tracing::debug!(with_user = user.is_some(), "session saved");
        Ok(())
    }

    /// The stored token; blank tokens count as absent.
    pub fn get_token(&self) -> Option<String> {
        self.backend
            .read(TOKEN_KEY)
            .filter(|token| !token.trim().is_empty())
    }

    pub fn get_user(&self) -> Option<UserSummary> {
        let raw = self.backend.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable stored user record");
                None
            }
        }
    }

    /// The full session, or `None` when not authenticated.
    pub fn load(&self) -> Option<Session> {
        let token = self.get_token()?;
        Some(Session {
            token,
            user: self.get_user(),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.get_token().is_some()
    }

    /// Removes token and user.
    ///
    /// # Errors
    /// Returns an error if the backend fails to persist the removal.
    pub fn clear_session(&self) -> Result<()> {
        self.backend.remove(TOKEN_KEY)?;
        self.backend.remove(USER_KEY)?;
        tracing::debug!("session cleared");
        Ok(())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    fn user() -> UserSummary {
        serde_json::from_value(json!({"id": "u1", "name": "Ana", "email": "ana@x.io"})).unwrap()
    }

    #[test]
    fn test_fresh_store_is_unauthenticated() {
        let store = SessionStore::in_memory();
        assert_eq!(store.get_token(), None);
        assert_eq!(store.load(), None);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_save_then_get_token() {
        let store = SessionStore::in_memory();
        store.save_session("t1", None).unwrap();
        assert_eq!(store.get_token().as_deref(), Some("t1"));
        assert_eq!(store.get_user(), None);
    }

    #[test]
    fn test_save_with_user_round_trips_user() {
        let store = SessionStore::in_memory();
        store.save_session("t1", Some(&user())).unwrap();

        let session = store.load().unwrap();
        assert_eq!(session.token, "t1");
        assert_eq!(session.user, Some(user()));
    }

    #[test]
    fn test_save_without_user_drops_previous_user() {
        let store = SessionStore::in_memory();
        store.save_session("t1", Some(&user())).unwrap();
        store.save_session("t2", None).unwrap();
        assert_eq!(store.get_user(), None);
        assert_eq!(store.get_token().as_deref(), Some("t2"));
    }

    #[test]
    fn test_clear_session_removes_everything() {
        let store = SessionStore::in_memory();
        store.save_session("t1", Some(&user())).unwrap();
        store.clear_session().unwrap();
        assert_eq!(store.get_token(), None);
        assert_eq!(store.get_user(), None);
    }

    #[test]
    fn test_blank_token_is_not_a_session() {
        let store = SessionStore::in_memory();
        store.save_session("  ", None).unwrap();
        assert_eq!(store.get_token(), None);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_clones_share_storage() {
        let store = SessionStore::in_memory();
        let other = store.clone();
        store.save_session("t1", None).unwrap();
        assert_eq!(other.get_token().as_deref(), Some("t1"));
    }

    #[test]
    fn test_file_backend_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let first = SessionStore::new(Arc::new(FileBackend::new(&path)));
        first.save_session("t1", Some(&user())).unwrap();

        let second = SessionStore::new(Arc::new(FileBackend::new(&path)));
        assert_eq!(second.get_token().as_deref(), Some("t1"));
        assert_eq!(second.get_user(), Some(user()));

        second.clear_session().unwrap();
        assert!(first.get_token().is_none());
        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("t1"));
    }

    #[test]
    fn test_file_backend_recovers_from_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let store = SessionStore::new(Arc::new(FileBackend::new(&path)));
        assert_eq!(store.get_token(), None);
        store.save_session("t1", None).unwrap();
        assert_eq!(store.get_token().as_deref(), Some("t1"));
    }

    #[test]
    fn test_clear_without_file_is_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = SessionStore::new(Arc::new(FileBackend::new(&path)));
        store.clear_session().unwrap();
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = SessionStore::new(Arc::new(FileBackend::new(&path)));
        store.save_session("t1", None).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_redact_keeps_short_prefix() {
        assert_eq!(redact("abcdefghijkl"), "abcdef…");
        assert_eq!(redact("abc"), "…");
    }
}
