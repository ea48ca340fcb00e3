//! Typed operations on the application's tables and procedures.
//!
//! Each service is a thin wrapper over [`BackendClient`]: it names the query,
//! labels it for logs and telemetry, and checks the caller's
//! [`CancellationToken`] before handing back a result.
//!
//! [`BackendClient`]: crate::backend::BackendClient
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

use core::fmt;

use serde::{Deserialize, Serialize};

pub mod associations;
pub mod categories;
pub mod geo;
pub mod missions;
pub mod notifications;
pub mod profiles;

pub use associations::{Association, AssociationService, Contact};
pub use categories::{Categories, Category, CategoryService, DEFAULT_CATEGORIES};
pub use geo::{calculate_distance, Coordinates, Geocoder};
pub use missions::{AssociationSummary, Mission, MissionFilters, MissionService};
pub use notifications::{Badge, Notification, NotificationService, UserBadge};
pub use profiles::{Account, ProfileService, VolunteerProfile};

/// Primary key of a backend row, numeric or textual (UUID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// Reads a procedure's answer as a success flag.
///
/// Procedures answer a boolean, a `{ success }` object, or a row; any other
/// row counts as success.
pub(crate) fn rpc_flag(value: &serde_json::Value) -> bool {
    if let Some(flag) = value.as_bool() {
        return flag;
    }
    match value.get("success").and_then(serde_json::Value::as_bool) {
        Some(flag) => flag,
        None => !value.is_null(),
    }
}
