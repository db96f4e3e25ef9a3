use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::ClientError;

/// Account record returned by the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    /// Numeric for active accounts, a string for pending ones.
    #[serde(default)]
    pub status: Option<serde_json::Value>,
}

/// Identifiers needed to finish a login from an unrecognised device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingVerification {
    pub user_id: i64,
    pub fingerprint: String,
}

/// Everything the client remembers between invocations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub token: Option<String>,
    pub user: Option<User>,
    pub session_id: Option<i64>,
    pub pending_verification: Option<PendingVerification>,
    pub reset_token: Option<String>,
}

impl SessionState {
    /// Records a completed login and drops any pending verification.
    pub fn authenticate(&mut self, token: String, user: User, session_id: Option<i64>) {
        self.token = Some(token);
        self.user = Some(user);
        self.session_id = session_id;
        self.pending_verification = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|token| !token.is_empty())
    }

    /// Bearer token, or an authentication error when logged out.
    pub fn require_token(&self) -> Result<&str, ClientError> {
        self.token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ClientError::Authentication("Not logged in. Run `login` first.".into()))
    }

    pub fn require_pending(&self) -> Result<&PendingVerification, ClientError> {
        self.pending_verification.as_ref().ok_or_else(|| {
            ClientError::SessionError("No device verification is pending. Log in first.".into())
        })
    }
}

/// JSON file holding the [`SessionState`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored state; a missing file is an empty session.
    pub fn load(&self) -> Result<SessionState, ClientError> {
        if !self.path.exists() {
            debug!("[Session] no session file at {}", self.path.display());
            return Ok(SessionState::default());
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            ClientError::SessionError(format!("Failed to read {}: {e}", self.path.display()))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            ClientError::SessionError(format!("Corrupt session file {}: {e}", self.path.display()))
        })
    }

    pub fn persist(&self, state: &SessionState) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(state)
            .map_err(|e| ClientError::SessionError(e.to_string()))?;
        fs::write(&self.path, contents)?;
        debug!("[Session] saved to {}", self.path.display());
        Ok(())
    }

    /// Forgets everything, as on logout.
    pub fn clear(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
