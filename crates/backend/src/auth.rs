//! Auth client for the hosted backend
//!
//! Has two de facto states, signed-out and signed-in, with the session
//! persisted in the local store so a restart keeps the user signed in.
//! Transitions are driven by sign-up/sign-in/sign-out calls and by the
//! backend's own session refresh when the access token expires.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use common::store::{LocalStore, keys};

use crate::client::BackendClient;
use crate::error::{BackendError, BackendResult};
use crate::validation::{validate_email, validate_password};

/// Refresh this many seconds before the access token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 30;

/// Authenticated user identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Transient session: bearer tokens plus the user they belong to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp after which the access token is no longer valid
    pub expires_at: i64,
    pub user: AuthUser,
}

impl Session {
    /// Whether the access token is expired or about to expire
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now().timestamp() + EXPIRY_MARGIN_SECS
    }
}

/// Auth state transition delivered to listeners
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
}

type AuthListener = Box<dyn Fn(&AuthEvent) + Send + Sync>;

/// Token grant response from the auth API
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        let expires_at = token
            .expires_at
            .unwrap_or_else(|| Utc::now().timestamp() + token.expires_in.unwrap_or(3600));
        Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user,
        }
    }
}

/// Auth client
#[derive(Clone)]
pub struct AuthClient {
    client: BackendClient,
    store: LocalStore,
    session: Arc<Mutex<Option<Session>>>,
    listeners: Arc<Mutex<Vec<AuthListener>>>,
}

impl AuthClient {
    /// Create a new auth client persisting sessions in the given store
    pub fn new(client: BackendClient, store: LocalStore) -> Self {
        Self {
            client,
            store,
            session: Arc::new(Mutex::new(None)),
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a new user
    ///
    /// Returns the session when the backend signs the user in directly,
    /// or `None` when email confirmation is still pending.
    pub async fn sign_up(&self, email: &str, password: &str) -> BackendResult<Option<Session>> {
        validate_email(email).map_err(BackendError::Invalid)?;
        validate_password(password).map_err(BackendError::Invalid)?;

        info!("Signing up user: {}", email);

        let response: Value = self
            .client
            .auth_post(
                "/signup",
                &[],
                None,
                &json!({ "email": email, "password": password }),
            )
            .await?;

        if response.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(response)?;
            let session = self.adopt_session(token.into()).await?;
            Ok(Some(session))
        } else {
            // Confirmation email pending; the users row is created on
            // the first signed-in operation instead.
            Ok(None)
        }
    }

    /// Sign in with email and password
    pub async fn sign_in(&self, email: &str, password: &str) -> BackendResult<Session> {
        if email.is_empty() || password.is_empty() {
            return Err(BackendError::Invalid(
                "Email and password are required".to_string(),
            ));
        }

        info!("Signing in user: {}", email);

        let token: TokenResponse = self
            .client
            .auth_post(
                "/token",
                &[("grant_type", "password")],
                None,
                &json!({ "email": email, "password": password }),
            )
            .await?;

        self.adopt_session(token.into()).await
    }

    /// Sign out and clear the persisted session
    pub async fn sign_out(&self) -> BackendResult<()> {
        let session = { self.session.lock().await.clone() }
            .or_else(|| self.store.load::<Session>(keys::SESSION));

        if let Some(session) = session {
            info!("Signing out user: {}", session.user.id);
            self.client
                .auth_post_empty("/logout", Some(&session.access_token))
                .await?;
        }

        *self.session.lock().await = None;
        self.store.remove(keys::SESSION)?;
        self.notify(&AuthEvent::SignedOut).await;
        Ok(())
    }

    /// Exchange the refresh token for a new session
    pub async fn refresh(&self) -> BackendResult<Session> {
        let refresh_token = { self.session.lock().await.clone() }
            .or_else(|| self.store.load::<Session>(keys::SESSION))
            .map(|s| s.refresh_token)
            .ok_or(BackendError::NotSignedIn)?;

        info!("Refreshing session");

        let token: TokenResponse = self
            .client
            .auth_post(
                "/token",
                &[("grant_type", "refresh_token")],
                None,
                &json!({ "refresh_token": refresh_token }),
            )
            .await?;

        let session: Session = token.into();
        *self.session.lock().await = Some(session.clone());
        self.store.save_private(keys::SESSION, &session)?;
        Ok(session)
    }

    /// Current session, restored from the store and refreshed if stale
    ///
    /// Returns `None` when signed out or when a stale session cannot be
    /// refreshed; a refresh failure is reported, not propagated.
    pub async fn current_session(&self) -> BackendResult<Option<Session>> {
        let session = {
            let mut guard = self.session.lock().await;
            if guard.is_none() {
                *guard = self.store.load::<Session>(keys::SESSION);
            }
            guard.clone()
        };

        match session {
            None => Ok(None),
            Some(session) if !session.is_expired() => Ok(Some(session)),
            Some(_) => match self.refresh().await {
                Ok(refreshed) => Ok(Some(refreshed)),
                Err(e) => {
                    warn!("session refresh failed: {}", e);
                    Ok(None)
                }
            },
        }
    }

    /// Current user, if signed in
    pub async fn current_user(&self) -> BackendResult<Option<AuthUser>> {
        Ok(self.current_session().await?.map(|s| s.user))
    }

    /// Bearer token for data operations, if signed in
    pub async fn access_token(&self) -> BackendResult<Option<String>> {
        Ok(self.current_session().await?.map(|s| s.access_token))
    }

    /// Fetch the user record from the auth API
    pub async fn fetch_user(&self) -> BackendResult<AuthUser> {
        let session = self
            .current_session()
            .await?
            .ok_or(BackendError::NotSignedIn)?;
        self.client.auth_get("/user", Some(&session.access_token)).await
    }

    /// Whether a session is persisted locally
    ///
    /// Presence alone decides the default online/offline mode; the
    /// token is not validated here.
    pub fn has_persisted_session(&self) -> bool {
        self.store.load::<Session>(keys::SESSION).is_some()
    }

    /// Register an auth state listener
    ///
    /// The listener is invoked immediately with the current state when
    /// a session is already held.
    pub async fn on_auth_state_change<F>(&self, listener: F)
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let current = self.session.lock().await.clone();
        if let Some(session) = current {
            listener(&AuthEvent::SignedIn(session));
        }
        self.listeners.lock().await.push(Box::new(listener));
    }

    /// Make sure the signed-in user has a row in the `users` table
    ///
    /// Data rows reference `users.id`, and the auth API does not create
    /// that row itself.
    pub async fn ensure_user_row(&self) -> BackendResult<()> {
        let session = self
            .current_session()
            .await?
            .ok_or(BackendError::NotSignedIn)?;
        self.ensure_user_row_for(&session).await
    }

    async fn ensure_user_row_for(&self, session: &Session) -> BackendResult<()> {
        let token = Some(session.access_token.as_str());
        let existing: Vec<Value> = self
            .client
            .select_rows(
                token,
                "users",
                &[
                    ("id".to_string(), format!("eq.{}", session.user.id)),
                    ("select".to_string(), "id".to_string()),
                ],
            )
            .await?;

        if existing.is_empty() {
            info!("Creating users row for {}", session.user.id);
            let _created: Value = self
                .client
                .insert_row(
                    token,
                    "users",
                    &json!({ "id": session.user.id, "email": session.user.email }),
                )
                .await?;
        }

        Ok(())
    }

    /// Persist a fresh session and notify listeners
    async fn adopt_session(&self, session: Session) -> BackendResult<Session> {
        *self.session.lock().await = Some(session.clone());
        self.store.save_private(keys::SESSION, &session)?;

        if let Err(e) = self.ensure_user_row_for(&session).await {
            warn!("could not ensure users row: {}", e);
        }

        self.notify(&AuthEvent::SignedIn(session.clone())).await;
        Ok(session)
    }

    /// Deliver an event to all listeners, isolating listener panics
    async fn notify(&self, event: &AuthEvent) {
        let listeners = self.listeners.lock().await;
        for listener in listeners.iter() {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| listener(event)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::BackendConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USER_ID: &str = "1f8e8d9a-2b4c-4a6e-9d3f-5c7b8a9e0f1a";

    fn auth(server: &MockServer, dir: &TempDir) -> AuthClient {
        let client = BackendClient::new(BackendConfig {
            project_url: server.uri(),
            anon_key: "anon-key".to_string(),
            client_info: "personal-life-assistant".to_string(),
        });
        AuthClient::new(client, LocalStore::new(dir.path().join("store")))
    }

    fn token_body(access: &str) -> serde_json::Value {
        json!({
            "access_token": access,
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-1",
            "user": { "id": USER_ID, "email": "mei@example.com" }
        })
    }

    async fn mock_users_row_exists(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": USER_ID }])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_sign_in_persists_session() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        mock_users_row_exists(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_partial_json(json!({ "email": "mei@example.com" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1")))
            .mount(&server)
            .await;

        let auth = auth(&server, &dir);
        let session = auth.sign_in("mei@example.com", "secret-pw").await.unwrap();

        assert_eq!(session.access_token, "tok-1");
        assert_eq!(session.user.email.as_deref(), Some("mei@example.com"));
        assert!(auth.has_persisted_session());
        assert!(!session.is_expired());
    }

    #[tokio::test]
    async fn test_sign_in_missing_users_row_is_created() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        let insert = Mock::given(method("POST"))
            .and(path("/rest/v1/users"))
            .and(body_partial_json(json!({ "id": USER_ID })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": USER_ID }])))
            .expect(1)
            .mount_as_scoped(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1")))
            .mount(&server)
            .await;

        let auth = auth(&server, &dir);
        auth.sign_in("mei@example.com", "secret-pw").await.unwrap();
        drop(insert);
    }

    #[tokio::test]
    async fn test_sign_in_rejects_bad_credentials() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let auth = auth(&server, &dir);
        let err = auth.sign_in("mei@example.com", "wrong-pw").await.unwrap_err();
        match err {
            BackendError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid login credentials");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!auth.has_persisted_session());
    }

    #[tokio::test]
    async fn test_sign_in_validates_before_any_request() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        let auth = auth(&server, &dir);
        let err = auth.sign_in("", "secret-pw").await.unwrap_err();
        assert!(matches!(err, BackendError::Invalid(_)));
        // No mock mounted: a request would have failed differently.
    }

    #[tokio::test]
    async fn test_sign_up_confirmation_pending_returns_none() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": USER_ID,
                "email": "mei@example.com",
                "confirmation_sent_at": "2026-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let auth = auth(&server, &dir);
        let session = auth.sign_up("mei@example.com", "secret-pw").await.unwrap();
        assert!(session.is_none());
        assert!(!auth.has_persisted_session());
    }

    #[tokio::test]
    async fn test_sign_up_rejects_short_password() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        let auth = auth(&server, &dir);
        let err = auth.sign_up("mei@example.com", "12345").await.unwrap_err();
        assert!(matches!(err, BackendError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_stale_session_is_refreshed() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .and(body_partial_json(json!({ "refresh_token": "refresh-0" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-2")))
            .mount(&server)
            .await;

        let auth = auth(&server, &dir);
        let stale = Session {
            access_token: "tok-0".to_string(),
            refresh_token: "refresh-0".to_string(),
            expires_at: Utc::now().timestamp() - 10,
            user: AuthUser {
                id: USER_ID.parse().unwrap(),
                email: Some("mei@example.com".to_string()),
            },
        };
        auth.store.save_private(keys::SESSION, &stale).unwrap();

        let session = auth.current_session().await.unwrap().unwrap();
        assert_eq!(session.access_token, "tok-2");
    }

    #[tokio::test]
    async fn test_failed_refresh_yields_signed_out() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error_description": "Invalid Refresh Token"
            })))
            .mount(&server)
            .await;

        let auth = auth(&server, &dir);
        let stale = Session {
            access_token: "tok-0".to_string(),
            refresh_token: "refresh-0".to_string(),
            expires_at: 0,
            user: AuthUser {
                id: USER_ID.parse().unwrap(),
                email: None,
            },
        };
        auth.store.save_private(keys::SESSION, &stale).unwrap();

        assert!(auth.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_and_notifies() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        mock_users_row_exists(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let auth = auth(&server, &dir);
        let events = Arc::new(AtomicUsize::new(0));
        let seen = events.clone();
        auth.on_auth_state_change(move |event| {
            if matches!(event, AuthEvent::SignedOut) {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;

        auth.sign_in("mei@example.com", "secret-pw").await.unwrap();
        auth.sign_out().await.unwrap();

        assert!(!auth.has_persisted_session());
        assert!(auth.current_session().await.unwrap().is_none());
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_listener_panic_does_not_break_sign_in() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        mock_users_row_exists(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1")))
            .mount(&server)
            .await;

        let auth = auth(&server, &dir);
        auth.on_auth_state_change(|_| panic!("broken listener")).await;

        assert!(auth.sign_in("mei@example.com", "secret-pw").await.is_ok());
    }
}
