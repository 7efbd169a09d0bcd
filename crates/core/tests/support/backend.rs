//! Scriptable backend mock

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use focusmode_core::{AuthProvider, Backend, StateStore};
use focusmode_domain::{
    AuthUser, FocusError, RemoteUserState, Result as DomainResult, SignInMethod, SignInOutcome,
    UserState,
};
use parking_lot::Mutex;
use tokio::sync::watch;

/// In-memory backend with failure injection and a call log.
///
/// Documents are stored as `RemoteUserState` so tests can seed partial
/// records. Every call is appended to `calls()` as `op` or `op:user_id`.
pub struct ScriptedBackend {
    documents: Mutex<HashMap<String, RemoteUserState>>,
    calls: Mutex<Vec<String>>,
    initialize_error: Mutex<Option<FocusError>>,
    load_errors: Mutex<VecDeque<FocusError>>,
    save_errors: Mutex<VecDeque<FocusError>>,
    load_delay: Mutex<Option<Duration>>,
    redirect_url: Mutex<Option<String>>,
    restored_user: Mutex<Option<AuthUser>>,
    auth: watch::Sender<Option<AuthUser>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        let (auth, _) = watch::channel(None);
        Self {
            documents: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            initialize_error: Mutex::new(None),
            load_errors: Mutex::new(VecDeque::new()),
            save_errors: Mutex::new(VecDeque::new()),
            load_delay: Mutex::new(None),
            redirect_url: Mutex::new(None),
            restored_user: Mutex::new(None),
            auth,
        }
    }

    pub fn with_document(self, user_id: &str, document: RemoteUserState) -> Self {
        self.documents.lock().insert(user_id.to_string(), document);
        self
    }

    /// Publish this user during `initialize`, like a restored session.
    pub fn with_restored_user(self, user: AuthUser) -> Self {
        *self.restored_user.lock() = Some(user);
        self
    }

    /// Hold every load for `delay` before answering.
    pub fn with_load_delay(self, delay: Duration) -> Self {
        *self.load_delay.lock() = Some(delay);
        self
    }

    pub fn with_redirect(self, url: &str) -> Self {
        *self.redirect_url.lock() = Some(url.to_string());
        self
    }

    pub fn fail_initialize(&self, error: Option<FocusError>) {
        *self.initialize_error.lock() = error;
    }

    pub fn fail_next_load(&self, error: FocusError) {
        self.load_errors.lock().push_back(error);
    }

    pub fn fail_next_save(&self, error: FocusError) {
        self.save_errors.lock().push_back(error);
    }

    /// Emit an auth change as the provider SDK would.
    pub fn publish(&self, user: Option<AuthUser>) {
        self.auth.send_replace(user);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|entry| entry.as_str() == call).count()
    }

    pub fn document(&self, user_id: &str) -> Option<RemoteUserState> {
        self.documents.lock().get(user_id).cloned()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl StateStore for ScriptedBackend {
    async fn load_state(&self, user_id: &str) -> DomainResult<Option<RemoteUserState>> {
        if user_id.is_empty() {
            return Err(FocusError::missing_user_id());
        }
        self.record(format!("load:{user_id}"));
        let delay = *self.load_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.load_errors.lock().pop_front() {
            return Err(error);
        }
        Ok(self.documents.lock().get(user_id).cloned())
    }

    async fn save_state(&self, user_id: &str, state: &UserState) -> DomainResult<()> {
        if user_id.is_empty() {
            return Err(FocusError::missing_user_id());
        }
        self.record(format!("save:{user_id}"));
        if let Some(error) = self.save_errors.lock().pop_front() {
            return Err(error);
        }
        self.documents.lock().insert(user_id.to_string(), RemoteUserState::from(state.clone()));
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for ScriptedBackend {
    async fn sign_in(&self, method: SignInMethod) -> DomainResult<SignInOutcome> {
        self.record("sign_in".to_string());
        if let Some(url) = self.redirect_url.lock().clone() {
            return Ok(SignInOutcome::Redirect { url });
        }
        let user = match method {
            SignInMethod::EmailPassword { email, .. } => AuthUser {
                email: Some(email.clone()),
                ..AuthUser::with_id(email)
            },
            SignInMethod::Anonymous => AuthUser::with_id("anonymous"),
            SignInMethod::OAuth { provider } | SignInMethod::IdToken { provider, .. } => {
                AuthUser { provider: Some(provider.to_string()), ..AuthUser::with_id("oauth-user") }
            }
        };
        self.auth.send_replace(Some(user.clone()));
        Ok(SignInOutcome::SignedIn { user })
    }

    async fn complete_redirect(&self, callback_url: &str) -> DomainResult<AuthUser> {
        self.record("complete_redirect".to_string());
        if !callback_url.contains("code=") {
            return Err(FocusError::Auth("callback carried no code".into()));
        }
        let user = AuthUser::with_id("redirect-user");
        self.auth.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> DomainResult<()> {
        self.record("sign_out".to_string());
        self.auth.send_replace(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.auth.subscribe()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn initialize(&self) -> DomainResult<()> {
        self.record("initialize".to_string());
        if let Some(error) = self.initialize_error.lock().clone() {
            return Err(error);
        }
        if let Some(user) = self.restored_user.lock().clone() {
            self.auth.send_replace(Some(user));
        }
        Ok(())
    }
}
