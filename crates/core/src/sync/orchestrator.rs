//! Sync Orchestrator
//!
//! Owns the session, the backend and the ready-queue. Everything that
//! touches remote state goes through here so that buffering, hydration and
//! error classification are decided in one place.

use std::sync::Arc;
use std::time::Duration;

use focusmode_domain::{
    AuthUser, ErrorSeverity, FocusError, SignInMethod, SignInOutcome, SyncSettings, View,
};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::ports::{Backend, UiPort};
use super::ready_queue::{ReadyQueue, ReadyState, Submission};
use super::{SkipReason, SyncAvailability, SyncOp, SyncOutcome};
use crate::state::{AppState, Session, SharedSession};

const SAVE_RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Coordinates bootstrap, auth changes and saves for one session
pub struct SyncOrchestrator {
    backend: Arc<dyn Backend>,
    ui: Arc<dyn UiPort>,
    session: SharedSession,
    queue: ReadyQueue<SyncOp>,
    settings: SyncSettings,
    shutdown: CancellationToken,
    /// Held for the whole load/apply/migrate of a signed-in user, so the
    /// listener and an explicit sign-in never hydrate the same user twice.
    hydration: AsyncMutex<()>,
}

impl SyncOrchestrator {
    /// Create an orchestrator with a fresh default session
    pub fn new(backend: Arc<dyn Backend>, ui: Arc<dyn UiPort>) -> Self {
        Self {
            backend,
            ui,
            session: Session::default().shared(),
            queue: ReadyQueue::new(),
            settings: SyncSettings::default(),
            shutdown: CancellationToken::new(),
            hydration: AsyncMutex::new(()),
        }
    }

    pub fn with_settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use an existing session, e.g. one shared with UI handlers already.
    pub fn with_session(mut self, session: SharedSession) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.session)
    }

    /// Copy of the current in-memory state
    pub async fn state(&self) -> AppState {
        self.session.read().await.state.clone()
    }

    pub fn ready_state(&self) -> ReadyState {
        self.queue.state()
    }

    pub fn status(&self) -> SyncAvailability {
        match self.queue.state() {
            ReadyState::Ready => SyncAvailability::Available,
            ReadyState::Failed(reason) => SyncAvailability::Unavailable(reason),
            ReadyState::Uninitialized | ReadyState::Initializing | ReadyState::Draining => {
                SyncAvailability::Pending
            }
        }
    }

    /// Initialize the backend, then drain everything submitted so far.
    ///
    /// Allowed once, or again after a failure. Queued operations survive a
    /// failed attempt.
    pub async fn bootstrap(&self) -> SyncOutcome {
        if let Err(err) = self.queue.begin() {
            debug!(error = %err, "Bootstrap skipped");
            return SyncOutcome::Skipped(SkipReason::AlreadyBootstrapped);
        }

        let backend = self.backend.name();
        info!(backend, "Initializing sync backend");

        if let Err(err) = self.backend.initialize().await {
            let reason = err.to_string();
            error!(
                backend,
                error = %err,
                pending = self.queue.pending_len(),
                "Sync backend failed to initialize"
            );
            self.queue.fail(reason.clone());
            self.ui.sync_unavailable(&reason);
            return SyncOutcome::failed(err);
        }

        if let Err(err) = self.queue.finish() {
            return SyncOutcome::failed(err);
        }

        let mut drained = 0usize;
        while let Some(op) = self.queue.next_pending() {
            let label = op.label();
            let outcome = self.execute(op).await;
            debug!(op = label, ?outcome, "Drained deferred operation");
            drained += 1;
        }

        info!(backend, drained, "Sync backend ready");
        SyncOutcome::Completed
    }

    /// Persist the current state for the signed-in user.
    pub async fn save(&self) -> SyncOutcome {
        self.dispatch(SyncOp::Save).await
    }

    pub async fn sign_in(&self, method: SignInMethod) -> SyncOutcome {
        self.dispatch(SyncOp::SignIn(method)).await
    }

    /// Finish a redirect sign-in. Buffered like every other operation until
    /// the backend is ready.
    pub async fn complete_redirect(&self, callback_url: impl Into<String>) -> SyncOutcome {
        self.dispatch(SyncOp::CompleteRedirect(callback_url.into())).await
    }

    pub async fn sign_out(&self) -> SyncOutcome {
        self.dispatch(SyncOp::SignOut).await
    }

    /// React to an identity change published by the backend.
    pub async fn handle_auth_change(&self, user: Option<AuthUser>) -> SyncOutcome {
        self.dispatch(SyncOp::AuthChanged(user)).await
    }

    /// Route to `view`, remember it and save.
    ///
    /// Views that need a user fall back to the welcome view when signed out.
    pub async fn set_view(&self, view: View) -> SyncOutcome {
        {
            let mut session = self.session.write().await;
            if view.requires_auth() && !session.is_signed_in() {
                drop(session);
                self.ui.show_view(View::Welcome);
                return SyncOutcome::Skipped(SkipReason::SignedOut);
            }
            session.state.current_view = view.as_str().to_string();
        }
        self.ui.show_view(view);
        self.save().await
    }

    async fn dispatch(&self, op: SyncOp) -> SyncOutcome {
        match self.queue.submit(op) {
            Submission::Run(op) => self.execute(op).await,
            Submission::Queued(position) => {
                debug!(position, "Backend not ready; operation deferred");
                SyncOutcome::Deferred
            }
        }
    }

    async fn execute(&self, op: SyncOp) -> SyncOutcome {
        match op {
            SyncOp::Save => self.run_save().await,
            SyncOp::SignIn(method) => self.run_sign_in(method).await,
            SyncOp::CompleteRedirect(url) => self.run_complete_redirect(&url).await,
            SyncOp::SignOut => self.run_sign_out().await,
            SyncOp::AuthChanged(Some(user)) => self.on_signed_in(user).await,
            SyncOp::AuthChanged(None) => self.on_signed_out().await,
        }
    }

    async fn run_save(&self) -> SyncOutcome {
        let (user_id, snapshot) = {
            let session = self.session.read().await;
            let Some(user_id) = session.user_id() else {
                return SyncOutcome::Skipped(SkipReason::SignedOut);
            };
            if !session.hydrated {
                debug!(user_id, "Save refused before remote state was loaded");
                return SyncOutcome::Skipped(SkipReason::NotHydrated);
            }
            (user_id.to_string(), session.state.snapshot())
        };

        let attempts = self.settings.save_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.backend.save_state(&user_id, &snapshot).await {
                Ok(()) => {
                    debug!(user_id = %user_id, attempt, "State saved");
                    return SyncOutcome::Completed;
                }
                Err(err) if err.severity() == ErrorSeverity::Recoverable && attempt < attempts => {
                    warn!(user_id = %user_id, attempt, error = %err, "Save failed; retrying");
                    tokio::time::sleep(SAVE_RETRY_BASE_DELAY * attempt).await;
                    attempt += 1;
                }
                Err(err) => {
                    match err.severity() {
                        ErrorSeverity::Recoverable => {
                            warn!(user_id = %user_id, attempt, error = %err, "Save failed")
                        }
                        ErrorSeverity::Fatal => {
                            error!(user_id = %user_id, attempt, error = %err, "Save failed")
                        }
                    }
                    return SyncOutcome::failed(err);
                }
            }
        }
    }

    async fn run_sign_in(&self, method: SignInMethod) -> SyncOutcome {
        match self.backend.sign_in(method).await {
            Ok(SignInOutcome::SignedIn { user }) => {
                info!(user_id = %user.id, "Signed in");
                // The listener sees the same user on the channel; the
                // duplicate is skipped once hydrated.
                match self.on_signed_in(user).await {
                    SyncOutcome::Skipped(SkipReason::AlreadyHydrated) => SyncOutcome::Completed,
                    outcome => outcome,
                }
            }
            Ok(SignInOutcome::Redirect { url }) => {
                info!("Sign-in continues via redirect");
                SyncOutcome::Redirect { url }
            }
            Err(err) => {
                warn!(error = %err, "Sign-in failed");
                SyncOutcome::failed(err)
            }
        }
    }

    async fn run_complete_redirect(&self, callback_url: &str) -> SyncOutcome {
        match self.backend.complete_redirect(callback_url).await {
            Ok(user) => {
                info!(user_id = %user.id, "Redirect sign-in completed");
                match self.on_signed_in(user).await {
                    SyncOutcome::Skipped(SkipReason::AlreadyHydrated) => SyncOutcome::Completed,
                    outcome => outcome,
                }
            }
            Err(err) => {
                warn!(error = %err, "Redirect sign-in failed");
                SyncOutcome::failed(err)
            }
        }
    }

    async fn run_sign_out(&self) -> SyncOutcome {
        let outcome = self.run_save().await;
        if let SyncOutcome::Failed { error, .. } = &outcome {
            warn!(error = %error, "Final save before sign-out failed");
        }

        if let Err(err) = self.backend.sign_out().await {
            warn!(error = %err, "Sign-out failed");
            return SyncOutcome::failed(err);
        }
        self.on_signed_out().await
    }

    /// Load, apply, migrate, route.
    async fn on_signed_in(&self, user: AuthUser) -> SyncOutcome {
        if user.id.is_empty() {
            error!("Auth change carried a user without an id");
            return SyncOutcome::failed(FocusError::missing_user_id());
        }

        let _hydrating = self.hydration.lock().await;
        let user_id = user.id.clone();
        {
            let mut session = self.session.write().await;
            if session.user_id() == Some(user_id.as_str()) && session.hydrated {
                debug!(user_id = %user_id, "Auth change for an already loaded user");
                return SyncOutcome::Skipped(SkipReason::AlreadyHydrated);
            }
            session.sign_in(user);
        }

        let outcome = self.hydrate(&user_id).await;
        match &outcome {
            SyncOutcome::Skipped(SkipReason::UserChanged) => {}
            SyncOutcome::Failed { error: FocusError::InvalidInput(_), .. } => {}
            _ => self.ui.show_view(View::Dashboard),
        }
        outcome
    }

    /// Retry the load for a signed-in user whose earlier load failed.
    /// Does not route: the user stays on whatever view they chose.
    async fn reload(&self) -> SyncOutcome {
        let _hydrating = self.hydration.lock().await;
        let user_id = {
            let session = self.session.read().await;
            match session.user_id() {
                None => return SyncOutcome::Skipped(SkipReason::SignedOut),
                Some(_) if session.hydrated => {
                    return SyncOutcome::Skipped(SkipReason::AlreadyHydrated)
                }
                Some(user_id) => user_id.to_string(),
            }
        };
        debug!(user_id = %user_id, "Retrying remote state load");
        self.hydrate(&user_id).await
    }

    /// Load, apply and migrate for `user_id`, the current session user.
    async fn hydrate(&self, user_id: &str) -> SyncOutcome {
        let (remote, load_failed) = match self.backend.load_state(user_id).await {
            Ok(remote) => (remote, false),
            Err(err) if err.severity() == ErrorSeverity::Fatal => {
                error!(user_id, error = %err, "Loading remote state was rejected");
                return SyncOutcome::failed(err);
            }
            Err(err) => {
                warn!(user_id, error = %err, "Loading remote state failed; keeping local state");
                (None, true)
            }
        };

        {
            let mut session = self.session.write().await;
            if session.user_id() != Some(user_id) {
                debug!(user_id, "User changed during load; dropping result");
                return SyncOutcome::Skipped(SkipReason::UserChanged);
            }
            if remote.is_none() && !load_failed {
                debug!(user_id, "No remote state; keeping local defaults");
            }
            session.state.apply(remote.as_ref());
            session.hydrated = !load_failed;
            self.ui.refresh(&session.state);
        }

        if load_failed {
            info!(user_id, "Skipping first-login migration after failed load");
            SyncOutcome::Completed
        } else if self.settings.migrate_on_sign_in {
            self.run_save().await
        } else {
            SyncOutcome::Completed
        }
    }

    async fn on_signed_out(&self) -> SyncOutcome {
        {
            let mut session = self.session.write().await;
            if let Some(user_id) = session.user_id() {
                info!(user_id, "Signed out");
            }
            session.sign_out();
        }
        self.ui.show_view(View::Welcome);
        SyncOutcome::Completed
    }

    /// Forward auth-change events from the backend until shutdown.
    ///
    /// The current value is delivered first, so a session restored during
    /// bootstrap is handled exactly once.
    pub fn spawn_auth_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        let mut changes = self.backend.subscribe();
        let token = self.shutdown.child_token();

        tokio::spawn(async move {
            let initial = changes.borrow_and_update().clone();
            orchestrator.handle_auth_change(initial).await;

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            debug!("Auth-change channel closed");
                            break;
                        }
                        let user = changes.borrow_and_update().clone();
                        let outcome = orchestrator.handle_auth_change(user).await;
                        debug!(?outcome, "Auth change handled");
                    }
                }
            }
        })
    }

    /// Save on a fixed interval until shutdown.
    ///
    /// A signed-in session whose load failed is reloaded instead of saved.
    pub fn spawn_autosave(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        let token = self.shutdown.child_token();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => orchestrator.autosave_tick().await,
                }
            }
        })
    }

    async fn autosave_tick(&self) {
        let pending_hydration = {
            let session = self.session.read().await;
            session.is_signed_in() && !session.hydrated
        };

        let outcome = if pending_hydration && self.queue.state().is_ready() {
            self.reload().await
        } else {
            self.save().await
        };
        match outcome {
            SyncOutcome::Failed { error, severity } => {
                warn!(error = %error, ?severity, "Autosave failed")
            }
            outcome => debug!(?outcome, "Autosave tick"),
        }
    }

    /// Stop background tasks and make a final save.
    pub async fn shutdown(&self) -> SyncOutcome {
        self.shutdown.cancel();
        if !self.queue.state().is_ready() {
            let pending = self.queue.pending_len();
            if pending > 0 {
                warn!(pending, "Shutting down with operations still queued");
            }
            return SyncOutcome::failed(FocusError::Unavailable(
                "backend was never ready".to_string(),
            ));
        }
        self.save().await
    }
}
