//! Port interfaces for state synchronization
//!
//! A backend shim is a `StateStore` plus an `AuthProvider` plus an
//! asynchronous bootstrap. Exactly one implementation is selected at startup;
//! the orchestrator only ever sees `dyn Backend`.

use async_trait::async_trait;
use focusmode_domain::{RemoteUserState, Result, UserState, View};

use crate::state::AppState;
use crate::user::ports::AuthProvider;

/// Trait for reading and writing the per-user document
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the document keyed by `user_id`.
    ///
    /// Returns `Ok(None)` when no document exists. Fails with
    /// `FocusError::InvalidInput` for an empty id before any I/O.
    async fn load_state(&self, user_id: &str) -> Result<Option<RemoteUserState>>;

    /// Create or replace the document keyed by `user_id`.
    ///
    /// Fails with `FocusError::InvalidInput` for an empty id before any I/O.
    async fn save_state(&self, user_id: &str, state: &UserState) -> Result<()>;
}

/// A complete backend shim
#[async_trait]
pub trait Backend: StateStore + AuthProvider {
    /// Short name for logs (`firebase`, `supabase`, `memory`).
    fn name(&self) -> &'static str;

    /// Asynchronous bootstrap: client construction and session restore.
    ///
    /// Must publish any restored user on the auth-change channel before
    /// returning.
    async fn initialize(&self) -> Result<()>;
}

/// Trait for the external view router and refresh hooks
pub trait UiPort: Send + Sync {
    /// Make `view` the visible screen.
    fn show_view(&self, view: View);

    /// Shared state changed underneath the UI (remote apply).
    fn refresh(&self, _state: &AppState) {}

    /// Backend bootstrap failed; sync is unavailable until a retry succeeds.
    fn sync_unavailable(&self, _reason: &str) {}
}
