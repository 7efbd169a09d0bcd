//! Authenticated user identity and sign-in types
//!
//! The identity is opaque: backends hand back an id and whatever profile
//! fields the provider exposed.

use serde::{Deserialize, Serialize};

use crate::impl_tag_conversions;

/// User identity delivered by a backend's auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    /// Provider the session was established with (`google.com`, `password`, ...).
    pub provider: Option<String>,
}

impl AuthUser {
    /// Identity with only an id, as returned by anonymous sign-in.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self { id: id.into(), email: None, display_name: None, avatar_url: None, provider: None }
    }
}

/// OAuth identity providers offered on the sign-in screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Github,
}

impl_tag_conversions!(OAuthProvider {
    Google => "google",
    Github => "github",
});

impl OAuthProvider {
    /// Provider id as Firebase Identity Toolkit names it.
    pub const fn firebase_provider_id(self) -> &'static str {
        match self {
            Self::Google => "google.com",
            Self::Github => "github.com",
        }
    }
}

/// How the user asked to sign in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SignInMethod {
    /// Browser-based OAuth. Backends that cannot complete it in-process
    /// answer with a redirect url.
    OAuth { provider: OAuthProvider },
    /// Exchange an id token already obtained from the provider.
    IdToken { provider: OAuthProvider, id_token: String },
    EmailPassword { email: String, password: String },
    Anonymous,
}

/// Result of a sign-in call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignInOutcome {
    /// Popup-style flow: the user is available now and has also been
    /// published on the auth-change channel.
    SignedIn { user: AuthUser },
    /// Redirect-style flow: no user yet. It materializes on the auth-change
    /// channel once the redirect completes.
    Redirect { url: String },
}
