/// Student model
///
/// # Schema
///
/// ```sql
/// CREATE TABLE students (
///     id BIGSERIAL PRIMARY KEY,
///     first_name TEXT NOT NULL,
///     last_name TEXT NOT NULL,
///     email TEXT NOT NULL,
///     grade TEXT NOT NULL,
///     section TEXT NOT NULL,
///     status TEXT NOT NULL DEFAULT 'Active',
///     enrollment_date DATE NOT NULL,
///     avatar_url TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Email is not unique at the schema level; fallback data relies on that.

use super::Entity;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Enrollment status
///
/// Only drives color coding in the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
    Graduated,
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudentStatus::Active => write!(f, "Active"),
            StudentStatus::Inactive => write!(f, "Inactive"),
            StudentStatus::Graduated => write!(f, "Graduated"),
        }
    }
}

/// A student row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,

    /// Grade level, "1" through "10"
    pub grade: String,

    /// Section letter
    pub section: String,
    pub status: StudentStatus,
    pub enrollment_date: NaiveDate,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    /// "First Last"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Input for enrolling a student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateStudent {
    #[validate(length(min = 1, message = "first name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, message = "last name is required"))]
    pub last_name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, message = "grade is required"))]
    pub grade: String,

    #[validate(length(min = 1, message = "section is required"))]
    pub section: String,

    #[serde(default)]
    pub status: StudentStatus,

    pub enrollment_date: NaiveDate,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Partial student update
///
/// Only `Some` fields are sent to the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateStudent {
    #[validate(length(min = 1, message = "first name is required"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "last name is required"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[validate(email)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "grade is required"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[validate(length(min = 1, message = "section is required"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StudentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_date: Option<NaiveDate>,

    /// Use `Some(None)` to clear
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,
}

impl Entity for Student {
    const TABLE: &'static str = "students";
    const NAME: &'static str = "student";

    type Id = i64;
    type Create = CreateStudent;
    type Update = UpdateStudent;

    fn id(&self) -> i64 {
        self.id
    }
}
