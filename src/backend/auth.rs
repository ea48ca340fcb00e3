use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::watch;

use crate::telemetry::UserIdentity;
use crate::types::Outcome;

use super::BackendClient;

/// Authenticated user as returned by the auth surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

impl UserIdentity for AuthUser {
    fn id(&self) -> &str {
        &self.id
    }

    fn username(&self) -> Option<&str> {
        self.user_metadata.get("username").and_then(Value::as_str)
    }

    fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl Session {
    /// Whether the session expired at `now` (unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Session),
    User(AuthUser),
}

impl BackendClient {
    /// Signs in with email and password and stores the session.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Outcome<Session> {
        let request = self
            .request(Method::POST, "auth/v1/token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let session: Session = self.call(request, "connexion").await?;
        self.store_session(Some(session.clone()));
        Ok(session)
    }

    /// Creates an account. Returns the session when the backend signs the
    /// user in immediately, `None` while the email awaits confirmation.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Map<String, Value>,
    ) -> Outcome<Option<Session>> {
        let request = self
            .request(Method::POST, "auth/v1/signup")
            .json(&json!({ "email": email, "password": password, "data": metadata }));
        match self.call(request, "inscription").await? {
            SignUpResponse::Session(session) => {
                self.store_session(Some(session.clone()));
                Ok(Some(session))
            },
            SignUpResponse::User(user) => {
                tracing::info!(user_id = %user.id, "sign-up pending email confirmation");
                Ok(None)
            },
        }
    }

    /// Revokes the session. The local session is cleared even when the
    /// backend call fails.
    pub async fn sign_out(&self) -> Outcome<()> {
        if self.get_session().is_none() {
            return Ok(());
        }
        let request = self.request(Method::POST, "auth/v1/logout");
        let revoked = self.call::<Value>(request, "déconnexion").await;
        self.store_session(None);
        revoked.map(drop)
    }

    /// Current session, if signed in.
    pub fn get_session(&self) -> Option<Session> {
        self.session_sender().borrow().clone()
    }

    /// Receiver notified on every sign-in and sign-out.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session_sender().subscribe()
    }

    fn store_session(&self, session: Option<Session>) {
        let user = session.as_ref().map(|session| &session.user);
        self.rail().telemetry().set_user(user);
        match user {
            Some(user) => tracing::info!(user_id = %user.id, "session started"),
            None => tracing::info!("session cleared"),
        }
        self.session_sender().send_replace(session);
    }
}
