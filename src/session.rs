//! Session token storage
//!
//! Holds at most one bearer token. When a path is configured the token is
//! mirrored to a small JSON file so a restarted client starts authenticated.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::ApiResult;

/// Opaque bearer credential issued by the backend on login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

impl From<String> for SessionToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// On-disk layout: the token lives under a fixed `token` key.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    token: SessionToken,
}

/// Process-wide holder of the current session token.
#[derive(Debug, Default)]
pub struct SessionStore {
    token: RwLock<Option<SessionToken>>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// A store that forgets the token when the process exits.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the persisted token from `path`, or start signed out if the file
    /// is missing or unreadable.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let token = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<PersistedSession>(&content) {
                Ok(session) => {
                    log::info!("Restored session from {}", path.display());
                    Some(session.token)
                }
                Err(e) => {
                    log::warn!("Failed to parse session file, starting signed out: {}", e);
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No session file at {}", path.display());
                None
            }
            Err(e) => {
                log::warn!("Failed to read session file, starting signed out: {}", e);
                None
            }
        };

        Self {
            token: RwLock::new(token),
            path: Some(path),
        }
    }

    /// Store a new token, replacing any previous one.
    pub fn set(&self, token: SessionToken) -> ApiResult<()> {
        if let Some(path) = &self.path {
            persist(path, &token)?;
        }
        *self.write() = Some(token);
        log::info!("Session token stored");
        Ok(())
    }

    pub fn get(&self) -> Option<SessionToken> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Forget the token. The in-memory copy is always dropped, even if
    /// removing the file fails.
    pub fn clear(&self) -> ApiResult<()> {
        let had_token = self.write().take().is_some();
        if had_token {
            log::info!("Session token cleared");
        }
        if let Some(path) = &self.path {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<SessionToken>> {
        self.token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn persist(path: &Path, token: &SessionToken) -> ApiResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(&PersistedSession {
        token: token.clone(),
    })?;
    std::fs::write(path, content)?;
    log::debug!("Saved session to {}", path.display());
    Ok(())
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
