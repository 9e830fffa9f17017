use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of work under a feature, tracked by percentage completion.
///
/// A feature's progress is the arithmetic mean of its tasks' `progress`
/// values. Tasks carry no price of their own; money lives on the feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub feature_id: Uuid,
    pub title: String,
    /// Percentage completion, 0–100.
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub title: String,
    /// Initial completion percentage. Defaults to 0.
    pub progress: Option<u8>,
}

/// Input for updating a task. All fields are optional for partial updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub progress: Option<u8>,
}
