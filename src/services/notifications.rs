//! Notifications, badges and spoken languages of the signed-in user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

use crate::async_ext::with_cancel;
use crate::backend::BackendClient;
use crate::types::{Failure, Outcome, RemoteError};

use super::RecordId;

/// Message used when an operation needs a session and there is none.
pub const NOT_SIGNED_IN_MESSAGE: &str = "Utilisateur non connecté";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: RecordId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// A badge together with when it was awarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBadge {
    pub badge: Badge,
    #[serde(default)]
    pub awarded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NotificationService {
    client: BackendClient,
}

impl NotificationService {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    /// Notifications of the signed-in user, newest first.
    pub async fn list(&self, token: &CancellationToken) -> Outcome<Vec<Notification>> {
        let Some(session) = self.client.get_session() else {
            return Err(Failure::new(RemoteError::Other {
                code: Some("NOT_SIGNED_IN".to_owned()),
                message: NOT_SIGNED_IN_MESSAGE.to_owned(),
            }));
        };

        let query = self
            .client
            .from("notifications")
            .select("*")
            .eq("user_id", &session.user.id)
            .order("created_at", false)
            .context("récupération des notifications");
        with_cancel(token, query.fetch()).await
    }

    pub async fn mark_read(&self, token: &CancellationToken, id: &RecordId) -> Outcome<()> {
        let query = self
            .client
            .from("notifications")
            .eq("id", id)
            .context("marquage de notification comme lue");
        let _: Value = with_cancel(token, query.update(&json!({ "is_read": true }))).await?;
        Ok(())
    }

    pub async fn badges(
        &self,
        token: &CancellationToken,
        user_id: &str,
    ) -> Outcome<Vec<UserBadge>> {
        let query = self
            .client
            .from("user_badges")
            .select("*, badge:badges(*)")
            .eq("user_id", user_id)
            .context("récupération des badges");
        with_cancel(token, query.fetch()).await
    }

    pub async fn add_language(
        &self,
        token: &CancellationToken,
        language: &str,
        level: &str,
        is_primary: bool,
    ) -> Outcome<()> {
        let params =
            json!({ "p_language": language, "p_level": level, "p_is_primary": is_primary });
        let _: Value = with_cancel(
            token,
            self.client.rpc_with_context("add_language_to_profile", &params, "ajout d'une langue"),
        )
        .await?;
        Ok(())
    }

    pub async fn remove_language(&self, token: &CancellationToken, language: &str) -> Outcome<()> {
        let params = json!({ "p_language": language });
        let _: Value = with_cancel(
            token,
            self.client.rpc_with_context(
                "remove_language_from_profile",
                &params,
                "suppression d'une langue",
            ),
        )
        .await?;
        Ok(())
    }
}
