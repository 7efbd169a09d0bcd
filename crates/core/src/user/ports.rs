//! Port interfaces for account authentication
//!
//! These traits define the boundaries between core business logic
//! and the hosted auth providers.

use async_trait::async_trait;
use focusmode_domain::{AuthUser, FocusError, Result, SignInMethod, SignInOutcome};
use tokio::sync::watch;

/// Trait for signing users in and out and observing the current identity
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Start or complete a sign-in.
    ///
    /// Popup-style flows resolve with `SignInOutcome::SignedIn`; redirect
    /// flows resolve immediately with the url to send the browser to.
    async fn sign_in(&self, method: SignInMethod) -> Result<SignInOutcome>;

    /// Finish a redirect-style sign-in from the URL the provider sent the
    /// browser back to. The user is also published on the auth-change
    /// channel.
    async fn complete_redirect(&self, _callback_url: &str) -> Result<AuthUser> {
        Err(FocusError::InvalidInput("this backend has no redirect sign-in".into()))
    }

    /// End the current session. Remote state is left untouched.
    async fn sign_out(&self) -> Result<()>;

    /// Subscribe to auth-state changes.
    ///
    /// The receiver starts at the current value, so a session restored
    /// during bootstrap is observed once by every subscriber.
    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>>;

    /// Currently signed-in user, if any.
    fn current_user(&self) -> Option<AuthUser> {
        self.subscribe().borrow().clone()
    }
}
