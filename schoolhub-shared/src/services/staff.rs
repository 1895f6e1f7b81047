/// Staff access service

use super::repository::Repository;
use crate::backend::TableBackend;
use crate::error::DataResult;
use crate::fallback::{FallbackGenerator, DEFAULT_STAFF_COUNT};
use crate::models::staff::{CreateStaff, Staff, UpdateStaff};
use crate::resilience::ResiliencePolicy;
use std::sync::Arc;

#[derive(Clone)]
pub struct StaffService {
    repo: Repository<Staff>,
    fallback: Option<Arc<FallbackGenerator>>,
}

impl StaffService {
    /// Creates the service; `fallback` feeds `get_all` during outages
    pub fn new(
        backend: Arc<dyn TableBackend>,
        policy: Arc<ResiliencePolicy>,
        fallback: Option<Arc<FallbackGenerator>>,
    ) -> Self {
        StaffService {
            repo: Repository::new(backend, policy),
            fallback,
        }
    }

    /// All staff, newest first; fallback staff when the backend is down
    pub async fn get_all(&self) -> DataResult<Vec<Staff>> {
        let fallback = self
            .fallback
            .clone()
            .map(|generator| move || generator.staff(DEFAULT_STAFF_COUNT));

        self.repo
            .list_or_fallback(self.repo.query().order_desc("created_at"), fallback)
            .await
    }

    /// Looks up one staff member; a missing row is `Ok(None)`
    pub async fn get_by_id(&self, id: i64) -> DataResult<Option<Staff>> {
        self.repo.find(&id).await
    }

    /// Adds a staff member after validating the input
    pub async fn create(&self, staff: &CreateStaff) -> DataResult<Staff> {
        self.repo.insert(staff).await
    }

    /// Applies a partial update; unknown ids are `NotFound`
    pub async fn update(&self, id: i64, update: &UpdateStaff) -> DataResult<Staff> {
        self.repo.patch(&id, update).await
    }

    pub async fn delete(&self, id: i64) -> DataResult<()> {
        self.repo.remove(&id).await
    }
}
