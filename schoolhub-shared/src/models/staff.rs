/// Staff model
///
/// `role` is free text ("Math Teacher", "Librarian", ...). `department` is
/// one of a handful of buckets but stored as text.

use super::Entity;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Employment status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StaffStatus {
    #[default]
    Active,
    Inactive,
    #[serde(rename = "On Leave")]
    OnLeave,
}

impl fmt::Display for StaffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaffStatus::Active => write!(f, "Active"),
            StaffStatus::Inactive => write!(f, "Inactive"),
            StaffStatus::OnLeave => write!(f, "On Leave"),
        }
    }
}

/// A staff row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub department: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub hire_date: NaiveDate,
    pub status: StaffStatus,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for hiring a staff member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateStaff {
    #[validate(length(min = 1, message = "first name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, message = "last name is required"))]
    pub last_name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, message = "role is required"))]
    pub role: String,

    #[validate(length(min = 1, message = "department is required"))]
    pub department: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    pub hire_date: NaiveDate,

    #[serde(default)]
    pub status: StaffStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Partial staff update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateStaff {
    #[validate(length(min = 1, message = "first name is required"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "last name is required"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[validate(email)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "role is required"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[validate(length(min = 1, message = "department is required"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hire_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StaffStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,
}

impl Entity for Staff {
    const TABLE: &'static str = "staff";
    const NAME: &'static str = "staff member";

    type Id = i64;
    type Create = CreateStaff;
    type Update = UpdateStaff;

    fn id(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_leave_wire_name() {
        let json = serde_json::to_value(StaffStatus::OnLeave).unwrap();
        assert_eq!(json, serde_json::json!("On Leave"));

        let parsed: StaffStatus = serde_json::from_value(serde_json::json!("On Leave")).unwrap();
        assert_eq!(parsed, StaffStatus::OnLeave);
    }

    #[test]
    fn test_default_status_is_active() {
        assert_eq!(StaffStatus::default(), StaffStatus::Active);
    }
}
