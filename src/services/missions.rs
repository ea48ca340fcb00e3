//! Missions: listing, nearby search, details and registration.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

use crate::async_ext::with_cancel;
use crate::backend::BackendClient;
use crate::types::Outcome;

use super::geo::Coordinates;
use super::{rpc_flag, RecordId};

/// Search radius used when the caller gives none, in kilometres.
pub const DEFAULT_DISTANCE_KM: f64 = 15.0;

const LIST_COLUMNS: &str = "*, association:associations(id, name, logo_url)";
const DETAIL_COLUMNS: &str =
    "*, association:associations(id, name, logo_url, description, verified)";

/// Association fields embedded in a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationSummary {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<String>,
    /// Duration in minutes.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub association_id: Option<RecordId>,
    #[serde(default)]
    pub association: Option<AssociationSummary>,
    /// Columns not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Mission {
    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.latitude?, self.longitude?))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissionFilters {
    /// A set position with a positive distance switches to the nearby search.
    pub location: Option<Coordinates>,
    pub distance_km: Option<f64>,
    pub category: Option<String>,
    /// Earliest mission date.
    pub date: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub duration_max: Option<u32>,
    pub language: Option<String>,
}

impl MissionFilters {
    fn nearby_params(&self, location: Coordinates) -> Value {
        let start = self.date.unwrap_or_else(|| Utc::now().date_naive());
        json!({
            "p_latitude": location.latitude,
            "p_longitude": location.longitude,
            "p_distance": self.distance_km.unwrap_or(DEFAULT_DISTANCE_KM),
            "p_category": self.category,
            "p_date_start": start,
            "p_date_end": self.date_end,
            "p_duration_max": self.duration_max,
            "p_language": self.language,
        })
    }
}

#[derive(Deserialize)]
struct NearbyRow {
    id: RecordId,
}

#[derive(Debug, Clone)]
pub struct MissionService {
    client: BackendClient,
}

impl MissionService {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    /// Published missions matching `filters`.
    ///
    /// With a set location and a positive distance the nearby search is used
    /// instead.
    pub async fn list(
        &self,
        token: &CancellationToken,
        filters: &MissionFilters,
    ) -> Outcome<Vec<Mission>> {
        if let (Some(location), Some(distance)) = (filters.location, filters.distance_km) {
            if location.is_set() && distance > 0.0 {
                return self.search_nearby(token, location, filters).await;
            }
        }

        let mut query = self
            .client
            .from("missions")
            .select(LIST_COLUMNS)
            .eq("status", "published")
            .context("récupération des missions");
        if let Some(category) = &filters.category {
            query = query.eq("category", category);
        }
        if let Some(date) = filters.date {
            query = query.gte("date", date);
        }

        with_cancel(token, query.fetch()).await
    }

    /// Missions within the search radius of `location`, with their association.
    pub async fn search_nearby(
        &self,
        token: &CancellationToken,
        location: Coordinates,
        filters: &MissionFilters,
    ) -> Outcome<Vec<Mission>> {
        let params = filters.nearby_params(location);
        let rows: Vec<NearbyRow> = with_cancel(
            token,
            self.client.rpc_with_context(
                "search_nearby_missions",
                &params,
                "recherche de missions à proximité",
            ),
        )
        .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let query = self
            .client
            .from("missions")
            .select(LIST_COLUMNS)
            .in_("id", rows.iter().map(|row| &row.id))
            .context("récupération des détails d'associations pour les missions à proximité");
        with_cancel(token, query.fetch()).await
    }

    pub async fn get(&self, token: &CancellationToken, id: &RecordId) -> Outcome<Mission> {
        let query = self
            .client
            .from("missions")
            .select(DETAIL_COLUMNS)
            .eq("id", id)
            .single()
            .context(format!("récupération de la mission {id}"));
        with_cancel(token, query.fetch()).await
    }

    /// Registers the signed-in volunteer. Returns the procedure's success flag.
    pub async fn register(
        &self,
        token: &CancellationToken,
        mission_id: &RecordId,
    ) -> Outcome<bool> {
        let answer: Value = with_cancel(
            token,
            self.client.rpc_with_context(
                "register_for_mission",
                &json!({ "p_mission_id": mission_id }),
                &format!("inscription à la mission {mission_id}"),
            ),
        )
        .await?;
        Ok(rpc_flag(&answer))
    }

    pub async fn cancel_registration(
        &self,
        token: &CancellationToken,
        mission_id: &RecordId,
        reason: Option<&str>,
    ) -> Outcome<bool> {
        let answer: Value = with_cancel(
            token,
            self.client.rpc_with_context(
                "cancel_mission_registration",
                &json!({ "p_mission_id": mission_id, "p_reason": reason }),
                &format!("annulation de l'inscription à la mission {mission_id}"),
            ),
        )
        .await?;
        Ok(rpc_flag(&answer))
    }
}
