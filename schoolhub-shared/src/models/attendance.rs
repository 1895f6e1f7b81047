/// Attendance model
///
/// One logical record per (student_id, date). The backend does not enforce
/// it; `AttendanceService::bulk_save` keeps it by updating in place.

use super::Entity;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Attendance mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceStatus::Present => write!(f, "Present"),
            AttendanceStatus::Absent => write!(f, "Absent"),
            AttendanceStatus::Late => write!(f, "Late"),
            AttendanceStatus::Excused => write!(f, "Excused"),
        }
    }
}

/// An attendance row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendance {
    pub id: i64,
    pub student_id: i64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording attendance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateAttendance {
    #[validate(range(min = 1, message = "student_id must reference a student"))]
    pub student_id: i64,

    pub date: NaiveDate,

    pub status: AttendanceStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Partial attendance update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateAttendance {
    #[validate(range(min = 1, message = "student_id must reference a student"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AttendanceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl Entity for Attendance {
    const TABLE: &'static str = "attendance";
    const NAME: &'static str = "attendance record";

    type Id = i64;
    type Create = CreateAttendance;
    type Update = UpdateAttendance;

    fn id(&self) -> i64 {
        self.id
    }
}
