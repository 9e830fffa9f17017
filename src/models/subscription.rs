use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recurring charge attached to a project.
///
/// Subscriptions cover things like domain names and hosting that renew on
/// a fixed interval. They are tracked for reference and do not participate
/// in the project's progress or earnings figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    /// Price per billing interval, in cents.
    pub price: i64,
    pub interval: BillingInterval,
    pub started_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How often a subscription renews.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Monthly,
    Yearly,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

/// Input for creating a new subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionInput {
    pub name: String,
    /// Price per interval in cents. Defaults to 0.
    #[serde(default)]
    pub price: i64,
    /// Billing interval. Defaults to `Yearly`.
    pub interval: Option<BillingInterval>,
    /// When the subscription started. Defaults to now.
    pub started_at: Option<DateTime<Utc>>,
}

/// Input for updating a subscription. All fields are optional for partial updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSubscriptionInput {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub interval: Option<BillingInterval>,
    pub started_at: Option<DateTime<Utc>>,
}
