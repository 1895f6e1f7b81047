/// Entity access services
///
/// One service per entity, all sharing the same contract:
///
/// | operation | behaviour |
/// |---|---|
/// | `get_all` | newest first; fallback rows for students, staff and users when the policy allows |
/// | `get_by_id` | `Ok(None)` for a missing row |
/// | `create` | validated before any backend call, returns the persisted row |
/// | `update` | only present fields are sent, `updated_at` moves forward |
/// | `delete` | unknown id is `NotFound` |
///
/// Services are cheap `Clone` handles over shared backends. [`Services`]
/// builds all of them from one backend pair and one resilience policy.
///
/// # Example
///
/// ```
/// use schoolhub_shared::backend::MemoryBackend;
/// use schoolhub_shared::fallback::{FallbackGenerator, StatusWeights};
/// use schoolhub_shared::resilience::ResiliencePolicy;
/// use schoolhub_shared::services::Services;
/// use std::sync::Arc;
///
/// # async fn example() -> schoolhub_shared::DataResult<()> {
/// let backend = Arc::new(MemoryBackend::new());
/// let fallback = FallbackGenerator::new(7, StatusWeights::default())?;
/// let services = Services::new(
///     backend.clone(),
///     backend,
///     ResiliencePolicy::default(),
///     Some(fallback),
/// );
///
/// assert!(services.students.get_all().await?.is_empty());
/// # Ok(())
/// # }
/// ```

pub mod attendance;
pub mod billing;
pub mod grades;
pub mod repository;
pub mod settings;
pub mod staff;
pub mod students;
pub mod users;

use crate::backend::{AuthBackend, TableBackend};
use crate::fallback::FallbackGenerator;
use crate::resilience::ResiliencePolicy;
use std::sync::Arc;

pub use attendance::{AttendanceMark, AttendanceService};
pub use billing::BillingService;
pub use grades::GradeService;
pub use repository::Repository;
pub use settings::SettingsService;
pub use staff::StaffService;
pub use students::StudentService;
pub use users::UserService;

/// Every entity service over one backend
#[derive(Clone)]
pub struct Services {
    pub students: StudentService,
    pub staff: StaffService,
    pub attendance: AttendanceService,
    pub grades: GradeService,
    pub billing: BillingService,
    pub users: UserService,
    pub settings: SettingsService,
}

impl Services {
    pub fn new(
        tables: Arc<dyn TableBackend>,
        auth: Arc<dyn AuthBackend>,
        policy: ResiliencePolicy,
        fallback: Option<FallbackGenerator>,
    ) -> Self {
        let policy = Arc::new(policy);
        let fallback = fallback.map(Arc::new);

        if let Some(generator) = &fallback {
            if !generator.is_reproducible() {
                tracing::debug!(seed = generator.seed(), "Fallback data seeded from entropy");
            }
        }

        Services {
            students: StudentService::new(tables.clone(), policy.clone(), fallback.clone()),
            staff: StaffService::new(tables.clone(), policy.clone(), fallback.clone()),
            attendance: AttendanceService::new(tables.clone(), policy.clone()),
            grades: GradeService::new(tables.clone(), policy.clone()),
            billing: BillingService::new(tables.clone(), policy.clone()),
            users: UserService::new(tables.clone(), auth, policy.clone(), fallback),
            settings: SettingsService::new(tables, policy),
        }
    }
}
