/// System account model
///
/// A `User` is a dashboard account, distinct from students and staff. Its id
/// is the identity issued by the auth subsystem, so the profile row always
/// shares the id of an auth identity.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id TEXT PRIMARY KEY,              -- auth identity
///     email TEXT NOT NULL UNIQUE,
///     name TEXT NOT NULL,
///     role TEXT NOT NULL DEFAULT 'Teacher',
///     avatar_url TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```
/// use schoolhub_shared::models::user::{CreateUser, UserRole};
///
/// let new_user = CreateUser {
///     email: "librarian@jollychildren.edu".to_string(),
///     name: "Grace Ortiz".to_string(),
///     role: UserRole::Staff,
///     password: None,
///     avatar_url: None,
/// };
/// assert_eq!(new_user.role.to_string(), "Staff");
/// ```

use super::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Account role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    Admin,
    #[default]
    Teacher,
    Staff,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "Admin"),
            UserRole::Teacher => write!(f, "Teacher"),
            UserRole::Staff => write!(f, "Staff"),
        }
    }
}

/// A user profile row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Auth identity
    pub id: String,

    pub email: String,

    pub name: String,

    pub role: UserRole,

    #[serde(default)]
    pub avatar_url: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account
///
/// The password goes to the auth subsystem only; it is never stored in the
/// profile row. When absent a random one is generated.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    #[serde(default)]
    pub role: UserRole,

    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: Option<String>,

    pub avatar_url: Option<String>,
}

/// Profile row as inserted, id already issued by the auth subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewUserProfile {
    #[validate(length(min = 1, message = "id is required"))]
    pub id: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    pub role: UserRole,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Partial profile update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(email)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "name is required"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,

    /// Use `Some(None)` to clear
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const NAME: &'static str = "user";

    type Id = String;
    type Create = NewUserProfile;
    type Update = UpdateUser;

    fn id(&self) -> String {
        self.id.clone()
    }
}
