/// Grade access service

use super::repository::Repository;
use crate::backend::TableBackend;
use crate::error::DataResult;
use crate::models::grade::{CreateGrade, Grade, LetterGrade, UpdateGrade};
use crate::resilience::ResiliencePolicy;
use std::sync::Arc;

#[derive(Clone)]
pub struct GradeService {
    repo: Repository<Grade>,
}

impl GradeService {
    pub fn new(backend: Arc<dyn TableBackend>, policy: Arc<ResiliencePolicy>) -> Self {
        GradeService {
            repo: Repository::new(backend, policy),
        }
    }

    /// All grades, newest first
    pub async fn get_all(&self) -> DataResult<Vec<Grade>> {
        self.repo.all().await
    }

    pub async fn get_by_id(&self, id: i64) -> DataResult<Option<Grade>> {
        self.repo.find(&id).await
    }

    /// A student's grades, newest first
    pub async fn get_by_student(&self, student_id: i64) -> DataResult<Vec<Grade>> {
        let query = self
            .repo
            .query()
            .eq("student_id", student_id)
            .order_desc("created_at");
        self.repo.list(query).await
    }

    /// Every grade recorded for `subject`, newest first
    pub async fn get_by_subject(&self, subject: &str) -> DataResult<Vec<Grade>> {
        let query = self
            .repo
            .query()
            .eq("subject", subject)
            .order_desc("created_at");
        self.repo.list(query).await
    }

    /// Records a grade
    ///
    /// The score must lie between 0 and `max_grade`.
    pub async fn create(&self, grade: &CreateGrade) -> DataResult<Grade> {
        self.repo.insert(grade).await
    }

    /// Applies a partial update
    ///
    /// A patch carrying both `grade` and `max_grade` must keep the score
    /// within the maximum.
    pub async fn update(&self, id: i64, update: &UpdateGrade) -> DataResult<Grade> {
        self.repo.patch(&id, update).await
    }

    pub async fn delete(&self, id: i64) -> DataResult<()> {
        self.repo.remove(&id).await
    }

    /// Letter for a score: >=90 A, >=80 B, >=70 C, else D
    pub fn letter_grade(score: f64) -> LetterGrade {
        LetterGrade::from_score(score)
    }
}
