//! Signed-in session persistence and the auth-change channel

use std::path::PathBuf;

use chrono::Utc;
use focusmode_domain::{AuthUser, FocusError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::errors::InfraError;

/// Refresh this long before the provider's expiry.
const EXPIRY_SKEW_MS: i64 = 60_000;

/// Tokens and identity for the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    /// Backend that issued the tokens; a session from another backend is
    /// ignored on restore.
    pub backend: String,
    pub user: AuthUser,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl StoredSession {
    pub fn new(backend: &str, user: AuthUser) -> Self {
        Self {
            backend: backend.to_string(),
            user,
            access_token: None,
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn with_tokens(
        mut self,
        access_token: String,
        refresh_token: Option<String>,
        expires_in_seconds: Option<i64>,
    ) -> Self {
        self.access_token = Some(access_token);
        self.refresh_token = refresh_token;
        self.expires_at = expires_in_seconds.map(|seconds| {
            Utc::now().timestamp_millis().saturating_add(seconds.saturating_mul(1000))
        });
        self
    }

    /// Whether the access token is missing or about to expire.
    pub fn needs_refresh(&self) -> bool {
        match (&self.access_token, self.expires_at) {
            (None, _) => true,
            (Some(_), Some(expires_at)) => {
                Utc::now().timestamp_millis().saturating_add(EXPIRY_SKEW_MS) >= expires_at
            }
            (Some(_), None) => false,
        }
    }
}

/// Optional on-disk copy of the current session
#[derive(Debug, Clone, Default)]
pub struct SessionFile {
    path: Option<PathBuf>,
}

impl SessionFile {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Read the persisted session for `backend`. A missing, unreadable or
    /// foreign file yields `None`.
    pub async fn load(&self, backend: &str) -> Option<StoredSession> {
        let path = self.path.as_ref()?;
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to read session file");
                return None;
            }
        };
        match serde_json::from_str::<StoredSession>(&contents) {
            Ok(session) if session.backend == backend => Some(session),
            Ok(session) => {
                debug!(stored = %session.backend, backend, "Ignoring session from another backend");
                None
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Discarding malformed session file");
                None
            }
        }
    }

    pub async fn store(&self, session: &StoredSession) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        let contents = serde_json::to_string_pretty(session)
            .map_err(|err| FocusError::from(InfraError::from(err)))?;
        tokio::fs::write(path, contents).await.map_err(io_error)
    }

    pub async fn clear(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(err)),
        }
    }
}

fn io_error(err: std::io::Error) -> FocusError {
    InfraError::from(err).into()
}

/// Process-wide auth-change channel
///
/// New subscribers observe the current value first.
#[derive(Debug)]
pub struct AuthChannel {
    sender: watch::Sender<Option<AuthUser>>,
}

impl Default for AuthChannel {
    fn default() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }
}

impl AuthChannel {
    pub fn publish(&self, user: Option<AuthUser>) {
        self.sender.send_replace(user);
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> Option<AuthUser> {
        self.sender.borrow().clone()
    }
}
