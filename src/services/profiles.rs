use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::async_ext::with_cancel;
use crate::backend::BackendClient;
use crate::types::Outcome;

use super::associations::Association;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolunteerProfile {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Profile attached to a signed-in user.
#[derive(Debug, Clone, PartialEq)]
pub enum Account {
    Volunteer(VolunteerProfile),
    Association(Association),
    /// Signed in but no profile row yet.
    Unregistered,
}

#[derive(Debug, Clone)]
pub struct ProfileService {
    client: BackendClient,
}

impl ProfileService {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    /// Looks for a volunteer profile, then an association, with `user_id`.
    ///
    /// A failed lookup is reported by the wrapper and treated as "not this
    /// kind of account", so only cancellation surfaces as an error.
    pub async fn fetch_account(
        &self,
        token: &CancellationToken,
        user_id: &str,
    ) -> Outcome<Account> {
        let volunteer = self
            .client
            .from("profiles")
            .select("*")
            .eq("id", user_id)
            .single()
            .context("récupération du profil bénévole");
        match with_cancel(token, volunteer.fetch::<VolunteerProfile>()).await {
            Ok(profile) => return Ok(Account::Volunteer(profile)),
            Err(failure) if failure.is_cancelled() => return Err(failure),
            Err(_) => {},
        }

        let association = self
            .client
            .from("associations")
            .select("*")
            .eq("id", user_id)
            .single()
            .context("récupération du profil association");
        match with_cancel(token, association.fetch::<Association>()).await {
            Ok(association) => Ok(Account::Association(association)),
            Err(failure) if failure.is_cancelled() => Err(failure),
            Err(_) => {
                tracing::info!(user_id, "no profile found for user");
                Ok(Account::Unregistered)
            },
        }
    }
}
