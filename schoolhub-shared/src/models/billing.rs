/// Billing model
///
/// An invoice owed by a student. `payment_date` and `payment_method` are set
/// together when the invoice is marked paid.

use super::Entity;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Invoice status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BillingStatus {
    #[default]
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl BillingStatus {
    /// Pending and Overdue invoices still expect money
    pub fn is_outstanding(&self) -> bool {
        matches!(self, BillingStatus::Pending | BillingStatus::Overdue)
    }
}

impl fmt::Display for BillingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingStatus::Pending => write!(f, "Pending"),
            BillingStatus::Paid => write!(f, "Paid"),
            BillingStatus::Overdue => write!(f, "Overdue"),
            BillingStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// A billing row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Billing {
    pub id: i64,
    pub student_id: i64,
    pub amount: f64,
    pub description: String,
    pub due_date: NaiveDate,
    pub status: BillingStatus,
    #[serde(default)]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for issuing an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateBilling {
    #[validate(range(min = 1, message = "student_id must reference a student"))]
    pub student_id: i64,

    #[validate(range(min = 0.0, message = "amount cannot be negative"))]
    pub amount: f64,

    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,

    pub due_date: NaiveDate,

    #[serde(default)]
    pub status: BillingStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

/// Partial invoice update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateBilling {
    #[validate(range(min = 1, message = "student_id must reference a student"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<i64>,
    #[validate(range(min = 0.0, message = "amount cannot be negative"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[validate(length(min = 1, message = "description is required"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BillingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<Option<String>>,
}

impl Entity for Billing {
    const TABLE: &'static str = "billing";
    const NAME: &'static str = "invoice";

    type Id = i64;
    type Create = CreateBilling;
    type Update = UpdateBilling;

    fn id(&self) -> i64 {
        self.id
    }
}
