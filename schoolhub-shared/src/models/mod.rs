/// Entity models for SchoolHub
///
/// Each entity comes in three shapes: the persisted row, a `Create*` insert
/// shape (server-assigned fields omitted, validated before any backend
/// call) and an `Update*` partial whose `None` fields are never sent.
///
/// # Models
///
/// - `student`: Enrolled students
/// - `staff`: Teaching and support staff
/// - `attendance`: Daily attendance marks
/// - `grade`: Subject grades with letter derivation
/// - `billing`: Invoices and payments
/// - `user`: System accounts tied to auth identities
/// - `setting`: Key/value application settings
///
/// # Example
///
/// ```
/// use schoolhub_shared::models::{Entity, student::Student};
///
/// assert_eq!(Student::TABLE, "students");
/// ```

pub mod attendance;
pub mod billing;
pub mod grade;
pub mod setting;
pub mod staff;
pub mod student;
pub mod user;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use validator::Validate;

/// A row type stored in one backend table
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Backend table name
    const TABLE: &'static str;

    /// Singular name used in errors and logs
    const NAME: &'static str;

    /// Primary key type
    type Id: Serialize + Display + Clone + Send + Sync;

    /// Insert shape
    type Create: Serialize + Validate + Send + Sync;

    /// Partial update shape, validated field by field when present
    type Update: Serialize + Validate + Send + Sync;

    /// Primary key of this row
    fn id(&self) -> Self::Id;
}
