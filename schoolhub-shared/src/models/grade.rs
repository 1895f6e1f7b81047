/// Grade model
///
/// Scores are conceptually 0-100. The dashboard shows a letter derived from
/// the raw score with fixed cut-offs, see [`LetterGrade::from_score`].

use super::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};

/// Letter shown next to a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
}

impl LetterGrade {
    /// >=90 A, >=80 B, >=70 C, anything else D
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            LetterGrade::A
        } else if score >= 80.0 {
            LetterGrade::B
        } else if score >= 70.0 {
            LetterGrade::C
        } else {
            LetterGrade::D
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
        };
        f.write_str(letter)
    }
}

/// A grade row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub id: i64,
    pub student_id: i64,
    pub subject: String,
    pub grade: f64,
    pub max_grade: f64,
    pub semester: String,
    pub academic_year: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Grade {
    pub fn letter(&self) -> LetterGrade {
        LetterGrade::from_score(self.grade)
    }
}

/// Input for recording a grade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "score_within_max"))]
pub struct CreateGrade {
    #[validate(range(min = 1, message = "student_id must reference a student"))]
    pub student_id: i64,

    #[validate(length(min = 1, message = "subject is required"))]
    pub subject: String,

    #[validate(range(min = 0.0, message = "grade cannot be negative"))]
    pub grade: f64,

    #[validate(range(exclusive_min = 0.0, message = "max_grade must be positive"))]
    pub max_grade: f64,

    #[validate(length(min = 1, message = "semester is required"))]
    pub semester: String,

    #[validate(length(min = 1, message = "academic year is required"))]
    pub academic_year: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn score_within_max(grade: &CreateGrade) -> Result<(), ValidationError> {
    if grade.grade > grade.max_grade {
        return Err(ValidationError::new("grade_exceeds_max"));
    }
    Ok(())
}

/// Partial grade update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "update_score_within_max"))]
pub struct UpdateGrade {
    #[validate(range(min = 1, message = "student_id must reference a student"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<i64>,
    #[validate(length(min = 1, message = "subject is required"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[validate(range(min = 0.0, message = "grade cannot be negative"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<f64>,
    #[validate(range(exclusive_min = 0.0, message = "max_grade must be positive"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_grade: Option<f64>,
    #[validate(length(min = 1, message = "semester is required"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[validate(length(min = 1, message = "academic year is required"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

// Only checkable when both sides are in the patch.
fn update_score_within_max(update: &UpdateGrade) -> Result<(), ValidationError> {
    match (update.grade, update.max_grade) {
        (Some(grade), Some(max)) if grade > max => Err(ValidationError::new("grade_exceeds_max")),
        _ => Ok(()),
    }
}

impl Entity for Grade {
    const TABLE: &'static str = "grades";
    const NAME: &'static str = "grade";

    type Id = i64;
    type Create = CreateGrade;
    type Update = UpdateGrade;

    fn id(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_cutoffs() {
        assert_eq!(LetterGrade::from_score(100.0), LetterGrade::A);
        assert_eq!(LetterGrade::from_score(90.0), LetterGrade::A);
        assert_eq!(LetterGrade::from_score(89.99), LetterGrade::B);
        assert_eq!(LetterGrade::from_score(80.0), LetterGrade::B);
        assert_eq!(LetterGrade::from_score(70.0), LetterGrade::C);
        assert_eq!(LetterGrade::from_score(69.5), LetterGrade::D);
        assert_eq!(LetterGrade::from_score(0.0), LetterGrade::D);
    }

    #[test]
    fn test_score_cannot_exceed_max() {
        let grade = CreateGrade {
            student_id: 3,
            subject: "Science".to_string(),
            grade: 105.0,
            max_grade: 100.0,
            semester: "First".to_string(),
            academic_year: "2024-2025".to_string(),
            notes: None,
        };
        assert!(grade.validate().is_err());

        let ok = CreateGrade { grade: 88.0, ..grade };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_update_checks_present_fields_only() {
        assert!(UpdateGrade::default().validate().is_ok());

        let negative = UpdateGrade {
            grade: Some(-40.0),
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let over_max = UpdateGrade {
            grade: Some(60.0),
            max_grade: Some(50.0),
            ..Default::default()
        };
        assert!(over_max.validate().is_err());

        let blank_subject = UpdateGrade {
            subject: Some(String::new()),
            ..Default::default()
        };
        assert!(blank_subject.validate().is_err());
    }

    #[test]
    fn test_letter_display() {
        assert_eq!(LetterGrade::C.to_string(), "C");
    }
}
