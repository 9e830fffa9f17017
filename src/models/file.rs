use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A document attached to a project (contract, brief, invoice scan).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFile {
    pub id: Uuid,
    pub project_id: Uuid,
    pub filename: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for attaching a file to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddFileInput {
    pub filename: String,
    pub title: Option<String>,
}
