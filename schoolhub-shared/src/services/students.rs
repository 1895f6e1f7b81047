/// Student access service
///
/// Listing degrades to seeded fallback students when the backend is down and
/// the policy allows it. Deleting a student first removes the attendance,
/// grade and billing rows that reference it; if any of those deletes fails
/// the student row stays and the error is returned.

use super::repository::Repository;
use crate::backend::{Filter, TableBackend};
use crate::error::{DataError, DataResult};
use crate::fallback::{FallbackGenerator, DEFAULT_STUDENT_COUNT};
use crate::models::attendance::Attendance;
use crate::models::billing::Billing;
use crate::models::grade::Grade;
use crate::models::student::{CreateStudent, Student, UpdateStudent};
use crate::models::Entity;
use crate::resilience::ResiliencePolicy;
use std::sync::Arc;

/// Tables holding rows keyed by `student_id`, deleted before the student
pub const DEPENDENT_TABLES: [&str; 3] = [Attendance::TABLE, Grade::TABLE, Billing::TABLE];

#[derive(Clone)]
pub struct StudentService {
    repo: Repository<Student>,
    fallback: Option<Arc<FallbackGenerator>>,
}

impl StudentService {
    /// Creates the service; `fallback` feeds `get_all` during outages
    pub fn new(
        backend: Arc<dyn TableBackend>,
        policy: Arc<ResiliencePolicy>,
        fallback: Option<Arc<FallbackGenerator>>,
    ) -> Self {
        StudentService {
            repo: Repository::new(backend, policy),
            fallback,
        }
    }

    /// All students, newest first
    pub async fn get_all(&self) -> DataResult<Vec<Student>> {
        let fallback = self
            .fallback
            .clone()
            .map(|generator| move || generator.students(DEFAULT_STUDENT_COUNT));

        self.repo
            .list_or_fallback(self.repo.query().order_desc("created_at"), fallback)
            .await
    }

    /// Looks up one student; a missing row is `Ok(None)`
    pub async fn get_by_id(&self, id: i64) -> DataResult<Option<Student>> {
        self.repo.find(&id).await
    }

    /// Enrolls a student
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` before any backend call when the input
    /// breaks a field rule.
    pub async fn create(&self, student: &CreateStudent) -> DataResult<Student> {
        self.repo.insert(student).await
    }

    /// Applies a partial update
    ///
    /// # Arguments
    ///
    /// * `id` - The student to change
    /// * `update` - Only `Some` fields are validated and written
    ///
    /// # Returns
    ///
    /// The stored row, with `updated_at` moved forward.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `ValidationFailed` for a bad field.
    pub async fn update(&self, id: i64, update: &UpdateStudent) -> DataResult<Student> {
        self.repo.patch(&id, update).await
    }

    /// Deletes the student and every row that references it
    ///
    /// Attendance, grades and billing rows go first, then the student.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id. If a dependent delete fails its error
    /// is returned and the student row is left in place.
    pub async fn delete(&self, id: i64) -> DataResult<()> {
        if self.repo.find(&id).await?.is_none() {
            return Err(DataError::not_found(Student::NAME, id));
        }

        for table in DEPENDENT_TABLES {
            let removed = self
                .repo
                .backend()
                .delete(table, vec![Filter::eq("student_id", id)])
                .await
                .map_err(|e| {
                    tracing::warn!(
                        student_id = id,
                        table = table,
                        error = %e,
                        "Dependent delete failed, keeping student"
                    );
                    e
                })?;
            tracing::debug!(student_id = id, table = table, rows = removed, "Removed dependent rows");
        }

        self.repo.remove(&id).await?;
        tracing::info!(student_id = id, "Deleted student and dependent records");
        Ok(())
    }

    /// Case-insensitive substring match on first name, last name or email
    pub async fn search(&self, query: &str) -> DataResult<Vec<Student>> {
        let query = self
            .repo
            .query()
            .filter(Filter::any_contains(
                ["first_name", "last_name", "email"],
                query.trim(),
            ))
            .order_desc("created_at");
        self.repo.list(query).await
    }
}
