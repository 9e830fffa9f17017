use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Task;

/// A priced unit of project scope.
///
/// Features are what the customer actually buys: each carries a price in
/// cents and a kind that determines how it counts toward the project's
/// financial figures. Progress on a feature is derived from its tasks,
/// never stored directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub kind: FeatureKind,
    /// Price in cents. Never negative.
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whether a feature is part of the main agreement or an add-on.
///
/// The two kinds partition a project's features. Only `Main` features
/// participate in overall progress and collectible earnings; `Additional`
/// features are billed separately and excluded from both figures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Main,
    Additional,
}

impl FeatureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Additional => "additional",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "main" => Some(Self::Main),
            "additional" => Some(Self::Additional),
            _ => None,
        }
    }
}

/// Input for creating a new feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeatureInput {
    pub title: String,
    /// Kind of scope. Defaults to `Main` if not specified.
    pub kind: Option<FeatureKind>,
    /// Price in cents. Defaults to 0 (free).
    #[serde(default)]
    pub price: i64,
}

/// Input for updating an existing feature. All fields are optional for partial updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateFeatureInput {
    pub title: Option<String>,
    pub kind: Option<FeatureKind>,
    pub price: Option<i64>,
}

/// A feature together with its tasks, used for progress computation and
/// detailed responses.
///
/// The `feature` fields are flattened into the JSON response, with an
/// additional `tasks` array. This is the already-fetched shape consumed by
/// [`crate::finance`], so the aggregation functions never touch the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureWithTasks {
    #[serde(flatten)]
    pub feature: Feature,
    pub tasks: Vec<Task>,
}
