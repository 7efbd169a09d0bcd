//! State synchronization between the session and the selected backend

pub mod orchestrator;
pub mod ports;
pub mod ready_queue;

use focusmode_domain::{AuthUser, ErrorSeverity, FocusError, SignInMethod};
use serde::{Deserialize, Serialize};

pub use orchestrator::SyncOrchestrator;

/// An operation routed through the ready-queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOp {
    Save,
    SignIn(SignInMethod),
    /// Finish a redirect sign-in from the callback url.
    CompleteRedirect(String),
    SignOut,
    AuthChanged(Option<AuthUser>),
}

impl SyncOp {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::SignIn(_) => "sign_in",
            Self::CompleteRedirect(_) => "complete_redirect",
            Self::SignOut => "sign_out",
            Self::AuthChanged(_) => "auth_changed",
        }
    }
}

/// Why an operation did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No signed-in user to save for.
    SignedOut,
    /// The signed-in user's remote state has not been loaded yet.
    NotHydrated,
    /// Auth change for a user whose state is already loaded.
    AlreadyHydrated,
    /// The user changed while a load was in flight; the result was dropped.
    UserChanged,
    AlreadyBootstrapped,
}

/// Typed result of every orchestrator operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed,
    /// Buffered until the backend is ready.
    Deferred,
    Skipped(SkipReason),
    /// Sign-in continues in the browser; the user arrives on the
    /// auth-change channel.
    Redirect { url: String },
    Failed { error: FocusError, severity: ErrorSeverity },
}

impl SyncOutcome {
    pub fn failed(error: FocusError) -> Self {
        let severity = error.severity();
        Self::Failed { error, severity }
    }

    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Whether remote sync is usable, as reported to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum SyncAvailability {
    Available,
    /// Backend still bootstrapping; operations are buffered.
    Pending,
    Unavailable(String),
}
