//! Mission categories with a built-in fallback list.
//!
//! Categories drive filters and card styling, so the screen must always have
//! some. Any failure while loading them degrades to [`DEFAULT_CATEGORIES`]
//! together with a note explaining why.

use core::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::async_ext::{with_cancel, with_timeout, DEFAULT_TIMEOUT};
use crate::backend::BackendClient;
use crate::types::{Failure, Level, Outcome, RemoteError, ReportContext};

use super::RecordId;

/// Upper bound for the whole category query.
pub const CATEGORY_TIMEOUT: Duration = DEFAULT_TIMEOUT;

/// Name of the catch-all category.
pub const OTHER_CATEGORY: &str = "Autre";

/// `(id, name, icon, color)` of the categories used when loading fails.
pub const DEFAULT_CATEGORIES: [(i64, &str, &str, &str); 7] = [
    (1, "Aide aux courses", "🛒", "bg-vs-blue-primary text-white"),
    (2, "Transport", "🚗", "bg-vs-green-secondary text-white"),
    (3, "Compagnie", "👋", "bg-vs-orange-accent text-white"),
    (4, "Bricolage", "🔨", "bg-purple-500 text-white"),
    (5, "Jardinage", "🌱", "bg-green-600 text-white"),
    (6, "Informatique", "💻", "bg-blue-600 text-white"),
    (7, OTHER_CATEGORY, "📋", "bg-gray-600 text-white"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    /// Style classes used by the presentation layer.
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

fn active_by_default() -> bool {
    true
}

/// Loaded categories, or the defaults and the reason they were used.
#[derive(Debug, Clone, PartialEq)]
pub struct Categories {
    pub items: Vec<Category>,
    /// Set when the defaults replaced a failed load.
    pub note: Option<String>,
}

impl Categories {
    pub fn defaults(note: Option<String>) -> Self {
        let items = DEFAULT_CATEGORIES
            .iter()
            .map(|&(id, name, icon, color)| Category {
                id: RecordId::Int(id),
                name: name.to_owned(),
                icon: Some(icon.to_owned()),
                color: Some(color.to_owned()),
                active: true,
            })
            .collect();
        Self { items, note }
    }

    #[inline]
    pub fn is_fallback(&self) -> bool {
        self.note.is_some()
    }

    /// Category with `id`, else [`OTHER_CATEGORY`], else the first one.
    pub fn by_id(&self, id: &RecordId) -> Option<&Category> {
        self.items.iter().find(|c| &c.id == id).or_else(|| self.fallback())
    }

    /// Case-insensitive lookup with the same fallback as [`by_id`](Self::by_id).
    pub fn by_name(&self, name: &str) -> Option<&Category> {
        let name = name.to_lowercase();
        self.items.iter().find(|c| c.name.to_lowercase() == name).or_else(|| self.fallback())
    }

    fn fallback(&self) -> Option<&Category> {
        self.items.iter().find(|c| c.name == OTHER_CATEGORY).or_else(|| self.items.first())
    }
}

#[derive(Debug, Clone)]
pub struct CategoryService {
    client: BackendClient,
    timeout: Duration,
}

impl CategoryService {
    pub fn new(client: BackendClient) -> Self {
        Self { client, timeout: CATEGORY_TIMEOUT }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Active categories ordered by name.
    ///
    /// Only cancellation is returned as an error; every other failure falls
    /// back to the defaults.
    pub async fn load(&self, token: &CancellationToken) -> Outcome<Categories> {
        with_cancel(token, async { Ok::<_, Failure>(self.load_or_default().await) }).await
    }

    async fn load_or_default(&self) -> Categories {
        let status = self.client.check_connection("categories").await;
        if !status.connected {
            let reason = status.error.as_deref().unwrap_or("Erreur inconnue");
            return Categories::defaults(Some(format!(
                "Problème de connexion au serveur. Utilisation des catégories par défaut. ({reason})"
            )));
        }

        let query = self
            .client
            .from("categories")
            .select("*")
            .eq("active", true)
            .order("name", true)
            .context("récupération des catégories");

        match with_timeout(self.timeout, query.fetch::<Vec<Category>>()).await {
            Ok(items) if items.is_empty() => Categories::defaults(None),
            Ok(items) => Categories { items, note: None },
            Err(failure) => {
                // A request-level timeout was already reported by the query.
                let outer_deadline = match failure.error() {
                    RemoteError::Timeout(after) => *after == self.timeout,
                    _ => false,
                };
                if outer_deadline {
                    self.report_timeout(&failure);
                }
                tracing::warn!(error = %failure, "categories unavailable; using defaults");
                Categories::defaults(Some(format!(
                    "Impossible de charger les catégories: {}",
                    failure.message()
                )))
            },
        }
    }

    /// The query itself reports its own failures; only the outer deadline
    /// needs reporting here.
    fn report_timeout(&self, failure: &Failure) {
        let context = "récupération des catégories avec timeout";
        let failure = failure.clone().with_context(context);
        let report = ReportContext::new().tag("errorContext", context).level(Level::Error);
        self.client.rail().report(&failure, &report);
    }
}
