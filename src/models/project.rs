use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Customer;

/// A unit of work commissioned by a customer.
///
/// Projects are the top-level organizational unit. Scope lives in the
/// project's features, money in its payments and subscriptions, and
/// documents in its files. A project always belongs to exactly one
/// customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub customer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// Input for updating an existing project. All fields are optional for partial updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProjectInput {
    /// Reassign the project to a different customer.
    pub customer_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A project with its owning customer, used for detailed responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectWithCustomer {
    #[serde(flatten)]
    pub project: Project,
    pub customer: Customer,
}

/// Derived financial figures for a single project.
///
/// Cash totals are exact cent sums. The progress and earnings figures are
/// fractional and rounded to two decimal places for presentation; see
/// [`crate::finance`] for the underlying formulas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    /// Sum of incoming payment amounts, in cents.
    pub cash_in_total: i64,
    /// Sum of outgoing payment amounts, in cents.
    pub cash_out_total: i64,
    /// Price-weighted completion percentage across main features.
    pub feature_overall_progress: f64,
    /// Revenue earned proportional to completion, in cents.
    pub collectible_earnings: f64,
}
