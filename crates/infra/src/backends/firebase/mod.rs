//! Firebase backend: Identity Toolkit auth plus a Firestore document per user
//!
//! Documents live at `{collection}/{uid}` and use identifier-style field
//! names. Saves are merge upserts: `PATCH` with one
//! `updateMask.fieldPaths` entry per top-level field.

mod value;

use std::path::PathBuf;

use async_trait::async_trait;
use focusmode_core::{AuthProvider, Backend, StateStore};
use focusmode_domain::{
    from_document, to_document, AuthUser, DocumentSchema, FirebaseConfig, FocusError,
    OAuthProvider, RemoteUserState, Result, SignInMethod, SignInOutcome, UserState,
};
use parking_lot::{Mutex, RwLock};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::session::{AuthChannel, SessionFile, StoredSession};
use crate::errors::{status_error, InfraError};
use crate::http::{error_detail, HttpClient};

pub use value::{decode, decode_fields, encode, encode_fields};

const NAME: &str = "firebase";
const DEFAULT_AUTH_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_TOKEN_BASE_URL: &str = "https://securetoken.googleapis.com/v1";
const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_REDIRECT_URL: &str = "http://localhost";

/// Identity Toolkit sign-in / sign-up response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityResponse {
    local_id: String,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    provider_id: Option<String>,
}

/// Secure-token refresh response (snake_case on the wire)
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAuthUriResponse {
    auth_uri: String,
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: Map<String, Value>,
}

fn parse_seconds(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|seconds| seconds.parse().ok())
}

/// Firebase implementation of the backend ports
pub struct FirebaseBackend {
    http: HttpClient,
    config: FirebaseConfig,
    session_file: SessionFile,
    session: RwLock<Option<StoredSession>>,
    pending_redirect: Mutex<Option<String>>,
    auth: AuthChannel,
}

impl FirebaseBackend {
    pub fn new(http: HttpClient, config: FirebaseConfig) -> Self {
        Self {
            http,
            config,
            session_file: SessionFile::disabled(),
            session: RwLock::new(None),
            pending_redirect: Mutex::new(None),
            auth: AuthChannel::default(),
        }
    }

    pub fn with_session_file(mut self, path: Option<PathBuf>) -> Self {
        self.session_file = SessionFile::new(path);
        self
    }

    fn auth_url(&self, endpoint: &str) -> String {
        let base = self.config.auth_base_url.as_deref().unwrap_or(DEFAULT_AUTH_BASE_URL);
        format!("{}/{}?key={}", base.trim_end_matches('/'), endpoint, self.config.api_key)
    }

    fn token_url(&self) -> String {
        let base = self.config.token_base_url.as_deref().unwrap_or(DEFAULT_TOKEN_BASE_URL);
        format!("{}/token?key={}", base.trim_end_matches('/'), self.config.api_key)
    }

    fn document_url(&self, user_id: &str) -> String {
        let base =
            self.config.firestore_base_url.as_deref().unwrap_or(DEFAULT_FIRESTORE_BASE_URL);
        format!(
            "{}/projects/{}/databases/(default)/documents/{}/{}",
            base.trim_end_matches('/'),
            self.config.project_id,
            self.config.collection,
            urlencoding::encode(user_id)
        )
    }

    fn redirect_url(&self) -> &str {
        self.config.redirect_url.as_deref().unwrap_or(DEFAULT_REDIRECT_URL)
    }

    async fn identity_call(&self, endpoint: &str, body: Value) -> Result<IdentityResponse> {
        let request = self.http.request(Method::POST, self.auth_url(endpoint)).json(&body);
        self.http.send_json(request).await
    }

    /// Record a fresh sign-in: keep the tokens, persist, publish.
    async fn establish(
        &self,
        response: IdentityResponse,
        fallback_provider: Option<&str>,
    ) -> AuthUser {
        let user = AuthUser {
            id: response.local_id,
            email: response.email,
            display_name: response.display_name,
            avatar_url: response.photo_url,
            provider: response.provider_id.or_else(|| fallback_provider.map(str::to_string)),
        };
        let session = StoredSession::new(NAME, user.clone()).with_tokens(
            response.id_token,
            response.refresh_token,
            parse_seconds(response.expires_in.as_deref()),
        );
        if let Err(err) = self.session_file.store(&session).await {
            warn!(error = %err, "Failed to persist session");
        }
        *self.session.write() = Some(session);
        self.auth.publish(Some(user.clone()));
        user
    }

    async fn refresh(&self, mut session: StoredSession) -> Result<StoredSession> {
        let refresh_token = session
            .refresh_token
            .clone()
            .ok_or_else(|| FocusError::Auth("session has no refresh token".into()))?;
        let response: RefreshResponse = self
            .http
            .send_json(self.http.request(Method::POST, self.token_url()).form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ]))
            .await?;

        session = session.with_tokens(
            response.id_token,
            response.refresh_token.or(Some(refresh_token)),
            parse_seconds(response.expires_in.as_deref()),
        );
        if let Err(err) = self.session_file.store(&session).await {
            warn!(error = %err, "Failed to persist refreshed session");
        }
        *self.session.write() = Some(session.clone());
        Ok(session)
    }

    /// A valid id token for the signed-in user, refreshed when close to expiry.
    async fn id_token(&self) -> Result<String> {
        let session = self
            .session
            .read()
            .clone()
            .ok_or_else(|| FocusError::Auth("not signed in".into()))?;
        let session = if session.needs_refresh() { self.refresh(session).await? } else { session };
        session.access_token.ok_or_else(|| FocusError::Auth("session has no id token".into()))
    }
}

fn idp_post_body(provider: OAuthProvider, token: &str) -> String {
    let parameter = match provider {
        OAuthProvider::Google => "id_token",
        OAuthProvider::Github => "access_token",
    };
    format!(
        "{}={}&providerId={}",
        parameter,
        urlencoding::encode(token),
        provider.firebase_provider_id()
    )
}

#[async_trait]
impl StateStore for FirebaseBackend {
    #[instrument(skip(self))]
    async fn load_state(&self, user_id: &str) -> Result<Option<RemoteUserState>> {
        if user_id.is_empty() {
            return Err(FocusError::missing_user_id());
        }
        let token = self.id_token().await?;
        let response = self
            .http
            .send(self.http.request(Method::GET, self.document_url(user_id)).bearer_auth(token))
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("No document for user");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &error_detail(&body)));
        }

        let document: FirestoreDocument = response
            .json()
            .await
            .map_err(|err| FocusError::from(InfraError::from(err)))?;
        let fields = decode_fields(&document.fields);
        from_document(Value::Object(fields), DocumentSchema::Identifier).map(Some)
    }

    #[instrument(skip(self, state))]
    async fn save_state(&self, user_id: &str, state: &UserState) -> Result<()> {
        if user_id.is_empty() {
            return Err(FocusError::missing_user_id());
        }
        let document = to_document(state, DocumentSchema::Identifier)?;
        let mask: Vec<(&str, &str)> =
            document.keys().map(|key| ("updateMask.fieldPaths", key.as_str())).collect();
        let body = json!({ "fields": encode_fields(&document) });

        let token = self.id_token().await?;
        self.http
            .send_checked(
                self.http
                    .request(Method::PATCH, self.document_url(user_id))
                    .query(&mask)
                    .bearer_auth(token)
                    .json(&body),
            )
            .await?;
        debug!(fields = document.len(), "Document saved");
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for FirebaseBackend {
    #[instrument(skip(self, method))]
    async fn sign_in(&self, method: SignInMethod) -> Result<SignInOutcome> {
        let (response, provider) = match method {
            SignInMethod::EmailPassword { email, password } => {
                let body =
                    json!({ "email": email, "password": password, "returnSecureToken": true });
                (self.identity_call("accounts:signInWithPassword", body).await?, Some("password"))
            }
            SignInMethod::Anonymous => {
                let body = json!({ "returnSecureToken": true });
                (self.identity_call("accounts:signUp", body).await?, Some("anonymous"))
            }
            SignInMethod::IdToken { provider, id_token } => {
                let body = json!({
                    "postBody": idp_post_body(provider, &id_token),
                    "requestUri": self.redirect_url(),
                    "returnIdpCredential": true,
                    "returnSecureToken": true,
                });
                (self.identity_call("accounts:signInWithIdp", body).await?, None)
            }
            SignInMethod::OAuth { provider } => {
                let body = json!({
                    "providerId": provider.firebase_provider_id(),
                    "continueUri": self.redirect_url(),
                });
                let response: CreateAuthUriResponse = self
                    .http
                    .send_json(
                        self.http
                            .request(Method::POST, self.auth_url("accounts:createAuthUri"))
                            .json(&body),
                    )
                    .await?;
                *self.pending_redirect.lock() = Some(response.session_id);
                info!(%provider, "Browser sign-in started");
                return Ok(SignInOutcome::Redirect { url: response.auth_uri });
            }
        };

        let user = self.establish(response, provider).await;
        info!(user_id = %user.id, "Signed in");
        Ok(SignInOutcome::SignedIn { user })
    }

    /// Finish a browser OAuth sign-in started with [`SignInMethod::OAuth`].
    ///
    /// `callback_url` is the full URL the provider redirected back to.
    #[instrument(skip(self, callback_url))]
    async fn complete_redirect(&self, callback_url: &str) -> Result<AuthUser> {
        let session_id = self.pending_redirect.lock().take().ok_or_else(|| {
            FocusError::InvalidInput("no browser sign-in is in progress".into())
        })?;
        let response = self
            .identity_call(
                "accounts:signInWithIdp",
                json!({
                    "requestUri": callback_url,
                    "sessionId": session_id,
                    "returnSecureToken": true,
                    "returnIdpCredential": true,
                }),
            )
            .await?;
        let user = self.establish(response, None).await;
        info!(user_id = %user.id, "Browser sign-in completed");
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        *self.session.write() = None;
        self.pending_redirect.lock().take();
        if let Err(err) = self.session_file.clear().await {
            warn!(error = %err, "Failed to remove session file");
        }
        self.auth.publish(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.auth.subscribe()
    }
}

#[async_trait]
impl Backend for FirebaseBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    /// Restore a persisted session, refreshing its token. A refresh the
    /// token service rejects signs the user out; an unreachable token
    /// service fails the bootstrap.
    async fn initialize(&self) -> Result<()> {
        if self.config.project_id.trim().is_empty() || self.config.api_key.trim().is_empty() {
            return Err(FocusError::Config(
                "firebase project_id and api_key are required".into(),
            ));
        }

        let Some(stored) = self.session_file.load(NAME).await else {
            debug!("No persisted session");
            return Ok(());
        };

        let restored = if stored.needs_refresh() { self.refresh(stored).await } else { Ok(stored) };
        match restored {
            Ok(session) => {
                info!(user_id = %session.user.id, "Session restored");
                let user = session.user.clone();
                *self.session.write() = Some(session);
                self.auth.publish(Some(user));
                Ok(())
            }
            Err(FocusError::Auth(reason)) | Err(FocusError::Backend(reason)) => {
                warn!(%reason, "Persisted session rejected; signing out");
                self.sign_out().await
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idp_post_body_uses_provider_token_kind() {
        assert_eq!(
            idp_post_body(OAuthProvider::Google, "a.b+c"),
            "id_token=a.b%2Bc&providerId=google.com"
        );
        assert_eq!(
            idp_post_body(OAuthProvider::Github, "gho_123"),
            "access_token=gho_123&providerId=github.com"
        );
    }

    #[test]
    fn document_url_encodes_user_id() {
        let backend = FirebaseBackend::new(
            HttpClient::new().unwrap(),
            FirebaseConfig {
                project_id: "focus-demo".into(),
                api_key: "key".into(),
                collection: "users".into(),
                auth_base_url: None,
                token_base_url: None,
                firestore_base_url: None,
                redirect_url: None,
            },
        );
        assert_eq!(
            backend.document_url("a/b"),
            "https://firestore.googleapis.com/v1/projects/focus-demo/databases/(default)/documents/users/a%2Fb"
        );
    }
}
