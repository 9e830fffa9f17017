use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Money moving in or out of a project.
///
/// Amounts are in cents and never negative; the sign of the movement is
/// carried by [`PaymentDirection`] instead. This keeps cash totals a plain
/// sum over a filtered collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub project_id: Uuid,
    pub direction: PaymentDirection,
    /// Amount in cents. Never negative.
    pub amount: i64,
    pub description: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Which way the money moved.
///
/// - `In`: received from the customer
/// - `Out`: paid out for the project (subcontractors, hosting, ...)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentDirection {
    In,
    Out,
}

impl PaymentDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in" => Some(Self::In),
            "out" => Some(Self::Out),
            _ => None,
        }
    }
}

/// Input for recording a new payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentInput {
    pub direction: PaymentDirection,
    /// Amount in cents. Must not be negative.
    pub amount: i64,
    pub description: Option<String>,
    /// When the money moved. Defaults to now.
    pub paid_at: Option<DateTime<Utc>>,
}

/// Input for correcting a recorded payment. All fields are optional for partial updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePaymentInput {
    pub direction: Option<PaymentDirection>,
    pub amount: Option<i64>,
    pub description: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}
