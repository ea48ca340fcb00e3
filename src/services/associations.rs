use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::async_ext::with_cancel;
use crate::backend::BackendClient;
use crate::types::Outcome;

use super::missions::Mission;
use super::RecordId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub verified: Option<bool>,
    /// Only loaded by [`AssociationService::get`].
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct AssociationService {
    client: BackendClient,
}

impl AssociationService {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, token: &CancellationToken) -> Outcome<Vec<Association>> {
        let query =
            self.client.from("associations").select("*").context("récupération des associations");
        with_cancel(token, query.fetch()).await
    }

    /// One association with its contacts.
    pub async fn get(&self, token: &CancellationToken, id: &RecordId) -> Outcome<Association> {
        let query = self
            .client
            .from("associations")
            .select("*, contacts:association_contacts(*)")
            .eq("id", id)
            .single()
            .context(format!("récupération de l'association {id}"));
        with_cancel(token, query.fetch()).await
    }

    /// Missions posted by an association, soonest first.
    pub async fn missions(
        &self,
        token: &CancellationToken,
        association_id: &RecordId,
    ) -> Outcome<Vec<Mission>> {
        let query = self
            .client
            .from("missions")
            .select("*")
            .eq("association_id", association_id)
            .order("date", true)
            .context(format!("récupération des missions de l'association {association_id}"));
        with_cancel(token, query.fetch()).await
    }
}
