//! Supabase backend: GoTrue auth plus one PostgREST row per user
//!
//! Rows use the underscore schema keyed by a `user_id` column. Saves upsert
//! on that column with `resolution=merge-duplicates`.

use std::path::PathBuf;

use async_trait::async_trait;
use focusmode_core::{AuthProvider, Backend, StateStore};
use focusmode_domain::{
    from_document, to_document, AuthUser, DocumentSchema, FocusError, RemoteUserState, Result,
    SignInMethod, SignInOutcome, SupabaseConfig, UserState,
};
use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::session::{AuthChannel, SessionFile, StoredSession};
use crate::errors::InfraError;
use crate::http::HttpClient;

const NAME: &str = "supabase";
const USER_ID_COLUMN: &str = "user_id";
const UPSERT_PREFERENCE: &str = "resolution=merge-duplicates,return=minimal";

/// GoTrue user object
#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
    #[serde(default)]
    app_metadata: Value,
}

impl From<GoTrueUser> for AuthUser {
    fn from(user: GoTrueUser) -> Self {
        let text =
            |value: &Value, key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        AuthUser {
            display_name: text(&user.user_metadata, "full_name")
                .or_else(|| text(&user.user_metadata, "name")),
            avatar_url: text(&user.user_metadata, "avatar_url"),
            provider: text(&user.app_metadata, "provider"),
            email: user.email,
            id: user.id,
        }
    }
}

/// GoTrue token grant response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: GoTrueUser,
}

/// Supabase implementation of the backend ports
pub struct SupabaseBackend {
    http: HttpClient,
    config: SupabaseConfig,
    session_file: SessionFile,
    session: RwLock<Option<StoredSession>>,
    auth: AuthChannel,
}

impl SupabaseBackend {
    pub fn new(http: HttpClient, config: SupabaseConfig) -> Self {
        Self {
            http,
            config,
            session_file: SessionFile::disabled(),
            session: RwLock::new(None),
            auth: AuthChannel::default(),
        }
    }

    pub fn with_session_file(mut self, path: Option<PathBuf>) -> Self {
        self.session_file = SessionFile::new(path);
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.url.trim_end_matches('/'), path)
    }

    /// Request with `apikey` and a bearer token (the user's, or the anon key).
    fn request(&self, method: Method, path: &str, bearer: &str) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(path))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }

    /// The authorize URL for a browser OAuth sign-in.
    pub fn authorize_url(&self, provider: &str) -> String {
        let mut url = format!(
            "{}?provider={}",
            self.endpoint("auth/v1/authorize"),
            urlencoding::encode(provider)
        );
        if let Some(redirect) = &self.config.redirect_url {
            url.push_str("&redirect_to=");
            url.push_str(&urlencoding::encode(redirect));
        }
        url
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<TokenResponse> {
        let path = format!("auth/v1/token?grant_type={grant_type}");
        self.http
            .send_json(self.request(Method::POST, &path, &self.config.anon_key).json(&body))
            .await
    }

    async fn establish(
        &self,
        user: AuthUser,
        access_token: String,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
    ) -> AuthUser {
        let session = StoredSession::new(NAME, user.clone()).with_tokens(
            access_token,
            refresh_token,
            expires_in,
        );
        if let Err(err) = self.session_file.store(&session).await {
            warn!(error = %err, "Failed to persist session");
        }
        *self.session.write() = Some(session);
        self.auth.publish(Some(user.clone()));
        user
    }

    async fn establish_grant(&self, response: TokenResponse) -> AuthUser {
        self.establish(
            response.user.into(),
            response.access_token,
            response.refresh_token,
            response.expires_in,
        )
        .await
    }

    async fn refresh(&self, session: StoredSession) -> Result<StoredSession> {
        let refresh_token = session
            .refresh_token
            .clone()
            .ok_or_else(|| FocusError::Auth("session has no refresh token".into()))?;
        let response =
            self.token_grant("refresh_token", json!({ "refresh_token": refresh_token })).await?;

        let refreshed = StoredSession::new(NAME, response.user.into()).with_tokens(
            response.access_token,
            response.refresh_token.or(Some(refresh_token)),
            response.expires_in,
        );
        if let Err(err) = self.session_file.store(&refreshed).await {
            warn!(error = %err, "Failed to persist refreshed session");
        }
        *self.session.write() = Some(refreshed.clone());
        Ok(refreshed)
    }

    /// Bearer for PostgREST: the user's access token, refreshed when close
    /// to expiry.
    async fn access_token(&self) -> Result<String> {
        let session = self
            .session
            .read()
            .clone()
            .ok_or_else(|| FocusError::Auth("not signed in".into()))?;
        let session = if session.needs_refresh() { self.refresh(session).await? } else { session };
        session.access_token.ok_or_else(|| FocusError::Auth("session has no access token".into()))
    }
}

#[async_trait]
impl StateStore for SupabaseBackend {
    #[instrument(skip(self))]
    async fn load_state(&self, user_id: &str) -> Result<Option<RemoteUserState>> {
        if user_id.is_empty() {
            return Err(FocusError::missing_user_id());
        }
        let token = self.access_token().await?;
        let path = format!("rest/v1/{}", self.config.table);
        let rows: Vec<Value> = self
            .http
            .send_json(
                self.request(Method::GET, &path, &token)
                    .query(&[(USER_ID_COLUMN, format!("eq.{user_id}")), ("select", "*".into())]),
            )
            .await?;

        let Some(row) = rows.into_iter().next() else {
            debug!("No row for user");
            return Ok(None);
        };
        from_document(row, DocumentSchema::Underscore).map(Some)
    }

    #[instrument(skip(self, state))]
    async fn save_state(&self, user_id: &str, state: &UserState) -> Result<()> {
        if user_id.is_empty() {
            return Err(FocusError::missing_user_id());
        }
        let mut row = to_document(state, DocumentSchema::Underscore)?;
        row.insert(USER_ID_COLUMN.to_string(), Value::String(user_id.to_string()));

        let token = self.access_token().await?;
        let path = format!("rest/v1/{}?on_conflict={}", self.config.table, USER_ID_COLUMN);
        self.http
            .send_checked(
                self.request(Method::POST, &path, &token)
                    .header("Prefer", UPSERT_PREFERENCE)
                    .json(&Value::Object(row)),
            )
            .await?;
        debug!("Row upserted");
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for SupabaseBackend {
    #[instrument(skip(self, method))]
    async fn sign_in(&self, method: SignInMethod) -> Result<SignInOutcome> {
        let response = match method {
            SignInMethod::OAuth { provider } => {
                info!(%provider, "Browser sign-in started");
                return Ok(SignInOutcome::Redirect { url: self.authorize_url(provider.as_str()) });
            }
            SignInMethod::EmailPassword { email, password } => {
                self.token_grant("password", json!({ "email": email, "password": password }))
                    .await?
            }
            SignInMethod::IdToken { provider, id_token } => {
                self.token_grant(
                    "id_token",
                    json!({ "provider": provider.as_str(), "id_token": id_token }),
                )
                .await?
            }
            SignInMethod::Anonymous => {
                self.http
                    .send_json(
                        self.request(Method::POST, "auth/v1/signup", &self.config.anon_key)
                            .json(&json!({ "data": {} })),
                    )
                    .await?
            }
        };

        let user = self.establish_grant(response).await;
        info!(user_id = %user.id, "Signed in");
        Ok(SignInOutcome::SignedIn { user })
    }

    /// Finish a browser OAuth sign-in.
    ///
    /// `callback_url` is the URL GoTrue redirected back to; the tokens are in
    /// its fragment.
    #[instrument(skip(self, callback_url))]
    async fn complete_redirect(&self, callback_url: &str) -> Result<AuthUser> {
        let url =
            Url::parse(callback_url).map_err(|err| FocusError::from(InfraError::from(err)))?;
        let fragment = url.fragment().unwrap_or_default();
        let params: Vec<(String, String)> = url::form_urlencoded::parse(fragment.as_bytes())
            .chain(url.query_pairs())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        let param = |name: &str| {
            params.iter().find(|(key, _)| key == name).map(|(_, value)| value.clone())
        };

        if let Some(description) = param("error_description").or_else(|| param("error")) {
            return Err(FocusError::Auth(description));
        }
        let access_token = param("access_token").ok_or_else(|| {
            FocusError::InvalidInput("callback URL carries no access_token".into())
        })?;
        let expires_in = param("expires_in").and_then(|seconds| seconds.parse().ok());

        let user: GoTrueUser = self
            .http
            .send_json(self.request(Method::GET, "auth/v1/user", &access_token))
            .await?;
        let user =
            self.establish(user.into(), access_token, param("refresh_token"), expires_in).await;
        info!(user_id = %user.id, "Browser sign-in completed");
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        let token = self.session.write().take().and_then(|session| session.access_token);
        if let Some(token) = token {
            let request = self.request(Method::POST, "auth/v1/logout", &token);
            if let Err(err) = self.http.send_checked(request).await {
                warn!(error = %err, "Server-side logout failed");
            }
        }
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
impl Backend for SupabaseBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn initialize(&self) -> Result<()> {
        if self.config.url.trim().is_empty() || self.config.anon_key.trim().is_empty() {
            return Err(FocusError::Config("supabase url and anon_key are required".into()));
        }
        Url::parse(&self.config.url).map_err(|err| FocusError::from(InfraError::from(err)))?;

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
                *self.session.write() = None;
                if let Err(err) = self.session_file.clear().await {
                    warn!(error = %err, "Failed to remove session file");
                }
                self.auth.publish(None);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
