//! Process-local backend
//!
//! Documents live in a map keyed by user id and go through the identifier
//! schema, so they see the same translation a Firestore document does.
//! Useful for offline runs and as a test double for the orchestrator.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use focusmode_core::{AuthProvider, Backend, StateStore};
use focusmode_domain::{
    from_document, to_document, AuthUser, DocumentSchema, FocusError, RemoteUserState, Result,
    SignInMethod, SignInOutcome, UserState,
};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use super::session::{AuthChannel, SessionFile, StoredSession};

const NAME: &str = "memory";

#[derive(Debug, Default)]
struct Faults {
    initialize: Option<FocusError>,
    load: Option<FocusError>,
    save: Option<FocusError>,
}

/// In-memory implementation of the backend ports
#[derive(Debug, Default)]
pub struct MemoryBackend {
    documents: Mutex<HashMap<String, Map<String, Value>>>,
    faults: Mutex<Faults>,
    session_file: SessionFile,
    auth: AuthChannel,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_file(mut self, path: Option<PathBuf>) -> Self {
        self.session_file = SessionFile::new(path);
        self
    }

    /// Seed a stored document.
    pub fn insert_document(&self, user_id: &str, state: &UserState) -> Result<()> {
        let document = to_document(state, DocumentSchema::Identifier)?;
        self.documents.lock().insert(user_id.to_string(), document);
        Ok(())
    }

    /// Raw stored document, if any.
    pub fn document(&self, user_id: &str) -> Option<Map<String, Value>> {
        self.documents.lock().get(user_id).cloned()
    }

    /// Make every `initialize` fail with `error` until cleared with `None`.
    pub fn fail_initialize(&self, error: Option<FocusError>) {
        self.faults.lock().initialize = error;
    }

    /// Fail the next `load_state` call only.
    pub fn fail_next_load(&self, error: FocusError) {
        self.faults.lock().load = Some(error);
    }

    /// Fail the next `save_state` call only.
    pub fn fail_next_save(&self, error: FocusError) {
        self.faults.lock().save = Some(error);
    }

    async fn establish(&self, user: AuthUser) -> Result<AuthUser> {
        self.session_file.store(&StoredSession::new(NAME, user.clone())).await?;
        self.auth.publish(Some(user.clone()));
        Ok(user)
    }
}

#[async_trait]
impl StateStore for MemoryBackend {
    async fn load_state(&self, user_id: &str) -> Result<Option<RemoteUserState>> {
        if user_id.is_empty() {
            return Err(FocusError::missing_user_id());
        }
        if let Some(err) = self.faults.lock().load.take() {
            return Err(err);
        }
        let document = self.documents.lock().get(user_id).cloned();
        document
            .map(|fields| from_document(Value::Object(fields), DocumentSchema::Identifier))
            .transpose()
    }

    async fn save_state(&self, user_id: &str, state: &UserState) -> Result<()> {
        if user_id.is_empty() {
            return Err(FocusError::missing_user_id());
        }
        if let Some(err) = self.faults.lock().save.take() {
            return Err(err);
        }
        let document = to_document(state, DocumentSchema::Identifier)?;
        self.documents.lock().insert(user_id.to_string(), document);
        debug!(user_id, "Document stored");
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn sign_in(&self, method: SignInMethod) -> Result<SignInOutcome> {
        let user = match method {
            SignInMethod::Anonymous => AuthUser::with_id(Uuid::new_v4().to_string()),
            SignInMethod::EmailPassword { email, password } => {
                if email.trim().is_empty() || password.is_empty() {
                    return Err(FocusError::Auth("email and password are required".into()));
                }
                AuthUser {
                    provider: Some("password".into()),
                    email: Some(email.clone()),
                    ..AuthUser::with_id(email)
                }
            }
            SignInMethod::OAuth { provider } | SignInMethod::IdToken { provider, .. } => {
                AuthUser {
                    provider: Some(provider.as_str().to_string()),
                    ..AuthUser::with_id(format!("{provider}-{}", Uuid::new_v4()))
                }
            }
        };
        let user = self.establish(user).await?;
        info!(user_id = %user.id, "Signed in");
        Ok(SignInOutcome::SignedIn { user })
    }

    async fn sign_out(&self) -> Result<()> {
        self.session_file.clear().await?;
        self.auth.publish(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.auth.subscribe()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn initialize(&self) -> Result<()> {
        if let Some(err) = self.faults.lock().initialize.clone() {
            return Err(err);
        }
        if let Some(session) = self.session_file.load(NAME).await {
            info!(user_id = %session.user.id, "Session restored");
            self.auth.publish(Some(session.user));
        }
        Ok(())
    }
}
