/// Attendance access service
///
/// Besides the uniform operations this service records a whole class at
/// once. `bulk_create` always inserts; `bulk_save` keeps one record per
/// (student, date) by updating the existing mark when there is one.
///
/// # Example
///
/// ```no_run
/// use schoolhub_shared::models::attendance::AttendanceStatus;
/// use schoolhub_shared::services::attendance::{AttendanceMark, AttendanceService};
/// use chrono::NaiveDate;
///
/// # async fn example(service: AttendanceService) -> schoolhub_shared::DataResult<()> {
/// let day = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
/// service
///     .bulk_save(day, &[AttendanceMark::new(12, AttendanceStatus::Present)])
///     .await?;
/// # Ok(())
/// # }
/// ```

use super::repository::Repository;
use crate::backend::TableBackend;
use crate::error::DataResult;
use crate::models::attendance::{Attendance, AttendanceStatus, CreateAttendance, UpdateAttendance};
use crate::resilience::ResiliencePolicy;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;

/// One student's mark for a day, as entered on the attendance sheet
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceMark {
    pub student_id: i64,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

impl AttendanceMark {
    pub fn new(student_id: i64, status: AttendanceStatus) -> Self {
        AttendanceMark {
            student_id,
            status,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Clone)]
pub struct AttendanceService {
    repo: Repository<Attendance>,
}

impl AttendanceService {
    pub fn new(backend: Arc<dyn TableBackend>, policy: Arc<ResiliencePolicy>) -> Self {
        AttendanceService {
            repo: Repository::new(backend, policy),
        }
    }

    /// All marks, newest first
    pub async fn get_all(&self) -> DataResult<Vec<Attendance>> {
        self.repo.all().await
    }

    pub async fn get_by_id(&self, id: i64) -> DataResult<Option<Attendance>> {
        self.repo.find(&id).await
    }

    /// A student's history, most recent day first
    pub async fn get_by_student(&self, student_id: i64) -> DataResult<Vec<Attendance>> {
        let query = self
            .repo
            .query()
            .eq("student_id", student_id)
            .order_desc("date");
        self.repo.list(query).await
    }

    /// Every mark recorded for `date`
    pub async fn get_by_date(&self, date: NaiveDate) -> DataResult<Vec<Attendance>> {
        let query = self
            .repo
            .query()
            .eq("date", date.to_string())
            .order_asc("student_id");
        self.repo.list(query).await
    }

    /// Records one mark
    pub async fn create(&self, record: &CreateAttendance) -> DataResult<Attendance> {
        self.repo.insert(record).await
    }

    pub async fn update(&self, id: i64, update: &UpdateAttendance) -> DataResult<Attendance> {
        self.repo.patch(&id, update).await
    }

    pub async fn delete(&self, id: i64) -> DataResult<()> {
        self.repo.remove(&id).await
    }

    /// Inserts every record in one backend call
    pub async fn bulk_create(&self, records: &[CreateAttendance]) -> DataResult<Vec<Attendance>> {
        self.repo.insert_many(records).await
    }

    /// Saves a day's marks, updating existing records and creating the rest
    ///
    /// A student named more than once keeps only their last mark, so the day
    /// never holds two records for one student.
    ///
    /// # Arguments
    ///
    /// * `date` - The day being recorded
    /// * `marks` - One entry per student on the sheet
    ///
    /// # Returns
    ///
    /// The saved records, one per distinct student, in the order each
    /// student first appears in `marks`.
    pub async fn bulk_save(
        &self,
        date: NaiveDate,
        marks: &[AttendanceMark],
    ) -> DataResult<Vec<Attendance>> {
        let marks = latest_per_student(marks);

        let existing: HashMap<i64, Attendance> = self
            .get_by_date(date)
            .await?
            .into_iter()
            .map(|record| (record.student_id, record))
            .collect();

        let mut saved: Vec<Option<Attendance>> = vec![None; marks.len()];
        let mut to_create = Vec::new();
        let mut create_slots = Vec::new();

        for (slot, mark) in marks.iter().enumerate() {
            match existing.get(&mark.student_id) {
                Some(record) => {
                    let update = UpdateAttendance {
                        status: Some(mark.status),
                        notes: Some(mark.notes.clone()),
                        ..Default::default()
                    };
                    saved[slot] = Some(self.repo.patch(&record.id, &update).await?);
                }
                None => {
                    to_create.push(CreateAttendance {
                        student_id: mark.student_id,
                        date,
                        status: mark.status,
                        notes: mark.notes.clone(),
                    });
                    create_slots.push(slot);
                }
            }
        }

        let created = self.repo.insert_many(&to_create).await?;
        for (slot, record) in create_slots.into_iter().zip(created) {
            saved[slot] = Some(record);
        }

        tracing::info!(
            date = %date,
            updated = marks.len() - to_create.len(),
            created = to_create.len(),
            "Saved attendance"
        );
        Ok(saved.into_iter().flatten().collect())
    }
}

// Last mark per student, kept at the student's first position.
fn latest_per_student(marks: &[AttendanceMark]) -> Vec<AttendanceMark> {
    let mut positions: HashMap<i64, usize> = HashMap::new();
    let mut collapsed: Vec<AttendanceMark> = Vec::with_capacity(marks.len());

    for mark in marks {
        match positions.get(&mark.student_id) {
            Some(&index) => collapsed[index] = mark.clone(),
            None => {
                positions.insert(mark.student_id, collapsed.len());
                collapsed.push(mark.clone());
            }
        }
    }
    collapsed
}
