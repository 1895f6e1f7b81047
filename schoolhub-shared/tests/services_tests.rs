/// Integration tests for the entity access services
///
/// Everything runs against `MemoryBackend`; outages are simulated by
/// switching it offline or wrapping it in a backend that fails on purpose.

use async_trait::async_trait;
use chrono::NaiveDate;
use schoolhub_shared::backend::{Filter, MemoryBackend, Query, TableBackend};
use schoolhub_shared::error::{DataError, DataResult};
use schoolhub_shared::fallback::{FallbackGenerator, StatusWeights};
use schoolhub_shared::models::attendance::{AttendanceStatus, CreateAttendance};
use schoolhub_shared::models::billing::{BillingStatus, CreateBilling};
use schoolhub_shared::models::grade::{CreateGrade, LetterGrade, UpdateGrade};
use schoolhub_shared::models::setting::SchoolProfile;
use schoolhub_shared::models::student::{CreateStudent, StudentStatus, UpdateStudent};
use schoolhub_shared::models::user::{CreateUser, UserRole};
use schoolhub_shared::resilience::{ReadFailure, ResiliencePolicy};
use schoolhub_shared::services::{AttendanceMark, GradeService, Services};
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn fallback(seed: u64) -> FallbackGenerator {
    FallbackGenerator::new(seed, StatusWeights::default()).unwrap()
}

fn services_with(backend: Arc<MemoryBackend>, policy: ResiliencePolicy) -> Services {
    Services::new(backend.clone(), backend, policy, Some(fallback(2024)))
}

fn services(backend: Arc<MemoryBackend>) -> Services {
    services_with(backend, ResiliencePolicy::default())
}

fn new_student(first: &str, last: &str) -> CreateStudent {
    CreateStudent {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{}.{}@school.edu", first.to_lowercase(), last.to_lowercase()),
        grade: "5".to_string(),
        section: "C".to_string(),
        status: StudentStatus::Active,
        enrollment_date: date(2024, 6, 3),
        avatar_url: None,
    }
}

fn new_invoice(student_id: i64, due: NaiveDate, status: BillingStatus) -> CreateBilling {
    CreateBilling {
        student_id,
        amount: 1500.0,
        description: "Tuition".to_string(),
        due_date: due,
        status,
        payment_date: None,
        payment_method: None,
    }
}

fn new_grade(student_id: i64, subject: &str, score: f64) -> CreateGrade {
    CreateGrade {
        student_id,
        subject: subject.to_string(),
        grade: score,
        max_grade: 100.0,
        semester: "First".to_string(),
        academic_year: "2024-2025".to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn test_create_then_get_round_trips() {
    let backend = Arc::new(MemoryBackend::new());
    let services = services(backend);

    let created = services
        .students
        .create(&new_student("Ava", "Reyes"))
        .await
        .unwrap();
    let fetched = services.students.get_by_id(created.id).await.unwrap();

    assert_eq!(fetched, Some(created.clone()));
    assert_eq!(created.full_name(), "Ava Reyes");
}

#[tokio::test]
async fn test_update_preserves_absent_fields_and_moves_updated_at() {
    let backend = Arc::new(MemoryBackend::new());
    let services = services(backend);
    let created = services
        .students
        .create(&new_student("Liam", "Cruz"))
        .await
        .unwrap();

    let update = UpdateStudent {
        section: Some("E".to_string()),
        ..Default::default()
    };
    let updated = services.students.update(created.id, &update).await.unwrap();

    assert_eq!(updated.section, "E");
    assert_eq!(updated.first_name, created.first_name);
    assert_eq!(updated.email, created.email);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);
}

#[tokio::test]
async fn test_update_unknown_id_is_not_found() {
    let backend = Arc::new(MemoryBackend::new());
    let services = services(backend);

    let result = services
        .staff
        .update(404, &Default::default())
        .await;
    assert!(matches!(result, Err(DataError::NotFound { .. })));
}

#[tokio::test]
async fn test_delete_then_get_is_none() {
    let backend = Arc::new(MemoryBackend::new());
    let services = services(backend);
    let created = services
        .students
        .create(&new_student("Mia", "Torres"))
        .await
        .unwrap();

    services.students.delete(created.id).await.unwrap();
    assert_eq!(services.students.get_by_id(created.id).await.unwrap(), None);
    assert!(matches!(
        services.students.delete(created.id).await,
        Err(DataError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_get_all_newest_first_and_idempotent() {
    let backend = Arc::new(MemoryBackend::new());
    let services = services(backend);
    for (first, last) in [("Ava", "Reyes"), ("Noah", "Kim"), ("Ella", "Diaz")] {
        services.students.create(&new_student(first, last)).await.unwrap();
    }

    let first_read = services.students.get_all().await.unwrap();
    let second_read = services.students.get_all().await.unwrap();

    let names: Vec<&str> = first_read.iter().map(|s| s.first_name.as_str()).collect();
    assert_eq!(names, ["Ella", "Noah", "Ava"]);
    assert_eq!(first_read, second_read);
}

#[tokio::test]
async fn test_search_is_case_insensitive_across_fields() {
    let backend = Arc::new(MemoryBackend::new());
    let services = services(backend);
    services.students.create(&new_student("Ava", "Reyes")).await.unwrap();
    services.students.create(&new_student("Noah", "Avalos")).await.unwrap();
    services.students.create(&new_student("Ella", "Diaz")).await.unwrap();

    let hits = services.students.search("AVA").await.unwrap();
    let names: Vec<&str> = hits.iter().map(|s| s.last_name.as_str()).collect();
    assert_eq!(names, ["Avalos", "Reyes"]);

    let by_email = services.students.search("diaz@school").await.unwrap();
    assert_eq!(by_email.len(), 1);
}

#[tokio::test]
async fn test_validation_happens_before_backend_call() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_offline(true);
    let services = services(backend);

    let mut invalid = new_student("Ava", "Reyes");
    invalid.email = "not-an-email".to_string();

    assert!(matches!(
        services.students.create(&invalid).await,
        Err(DataError::ValidationFailed(_))
    ));
}

#[tokio::test]
async fn test_update_validates_present_fields() {
    let backend = Arc::new(MemoryBackend::new());
    let services = services(backend.clone());
    let student = services.students.create(&new_student("Ava", "Reyes")).await.unwrap();
    let grade = services.grades.create(&new_grade(student.id, "Math", 91.0)).await.unwrap();

    let bad_student = UpdateStudent {
        email: Some("not-an-email".to_string()),
        first_name: Some(String::new()),
        ..Default::default()
    };
    assert!(matches!(
        services.students.update(student.id, &bad_student).await,
        Err(DataError::ValidationFailed(_))
    ));

    let bad_grade = UpdateGrade {
        grade: Some(-40.0),
        ..Default::default()
    };
    assert!(matches!(
        services.grades.update(grade.id, &bad_grade).await,
        Err(DataError::ValidationFailed(_))
    ));

    assert_eq!(services.students.get_by_id(student.id).await.unwrap(), Some(student.clone()));
    assert_eq!(services.grades.get_by_id(grade.id).await.unwrap(), Some(grade));

    // Offline, a backend call would surface as NetworkUnavailable.
    backend.set_offline(true);
    assert!(matches!(
        services.students.update(student.id, &bad_student).await,
        Err(DataError::ValidationFailed(_))
    ));
}

#[tokio::test]
async fn test_offline_reads_degrade_to_seeded_fallback() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_offline(true);
    let services = services(backend.clone());

    let students = services.students.get_all().await.unwrap();
    assert_eq!(students.len(), 283);
    assert_eq!(students, fallback(2024).students(283));

    let staff = services.staff.get_all().await.unwrap();
    assert_eq!(staff.len(), 15);

    let users = services.users.get_all().await.unwrap();
    assert_eq!(users.len(), 3);
    assert_eq!(users[0].role, UserRole::Admin);
}

#[tokio::test]
async fn test_entities_without_fallback_propagate() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_offline(true);
    let services = services(backend);

    assert!(matches!(
        services.grades.get_all().await,
        Err(DataError::NetworkUnavailable(_))
    ));
    assert!(services.billing.get_pending().await.is_err());
    assert!(services.attendance.get_by_date(date(2024, 9, 2)).await.is_err());
}

#[tokio::test]
async fn test_propagate_policy_surfaces_outage() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_offline(true);
    let services = services_with(backend, ResiliencePolicy::strict());

    assert!(matches!(
        services.students.get_all().await,
        Err(DataError::NetworkUnavailable(_))
    ));
}

#[tokio::test]
async fn test_writes_never_fall_back() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_offline(true);
    let services = services(backend);

    assert!(matches!(
        services.students.create(&new_student("Ava", "Reyes")).await,
        Err(DataError::NetworkUnavailable(_))
    ));
    assert!(services.students.get_by_id(1).await.is_err());
}

#[tokio::test]
async fn test_student_delete_cascades_to_dependents() {
    let backend = Arc::new(MemoryBackend::new());
    let services = services(backend.clone());
    let leaving = services.students.create(&new_student("Ava", "Reyes")).await.unwrap();
    let staying = services.students.create(&new_student("Noah", "Kim")).await.unwrap();

    for student in [&leaving, &staying] {
        services
            .attendance
            .create(&CreateAttendance {
                student_id: student.id,
                date: date(2024, 9, 2),
                status: AttendanceStatus::Present,
                notes: None,
            })
            .await
            .unwrap();
        services.grades.create(&new_grade(student.id, "Math", 91.0)).await.unwrap();
        services
            .billing
            .create(&new_invoice(student.id, date(2024, 10, 1), BillingStatus::Pending))
            .await
            .unwrap();
    }

    services.students.delete(leaving.id).await.unwrap();

    assert!(services.attendance.get_by_student(leaving.id).await.unwrap().is_empty());
    assert!(services.grades.get_by_student(leaving.id).await.unwrap().is_empty());
    assert!(services.billing.get_by_student(leaving.id).await.unwrap().is_empty());

    assert_eq!(services.attendance.get_by_student(staying.id).await.unwrap().len(), 1);
    assert_eq!(services.grades.get_by_student(staying.id).await.unwrap().len(), 1);
    assert_eq!(backend.row_count("billing").await, 1);
}

/// Delegates to a `MemoryBackend` but refuses deletes on one table
struct RefusingDeletes {
    inner: Arc<MemoryBackend>,
    table: &'static str,
}

#[async_trait]
impl TableBackend for RefusingDeletes {
    async fn select(&self, query: Query) -> DataResult<Vec<JsonValue>> {
        self.inner.select(query).await
    }

    async fn insert(&self, table: &str, rows: Vec<JsonValue>) -> DataResult<Vec<JsonValue>> {
        self.inner.insert(table, rows).await
    }

    async fn update(&self, table: &str, filters: Vec<Filter>, patch: JsonValue) -> DataResult<Vec<JsonValue>> {
        self.inner.update(table, filters, patch).await
    }

    async fn delete(&self, table: &str, filters: Vec<Filter>) -> DataResult<u64> {
        if table == self.table {
            return Err(DataError::Backend("permission denied".to_string()));
        }
        self.inner.delete(table, filters).await
    }

    async fn upsert(&self, table: &str, row: JsonValue, on_conflict: &str) -> DataResult<JsonValue> {
        self.inner.upsert(table, row, on_conflict).await
    }

    async fn ping(&self) -> DataResult<()> {
        self.inner.ping().await
    }
}

#[tokio::test]
async fn test_failed_dependent_delete_keeps_student() {
    let memory = Arc::new(MemoryBackend::new());
    let refusing = Arc::new(RefusingDeletes {
        inner: memory.clone(),
        table: "grades",
    });
    let services = Services::new(refusing, memory.clone(), ResiliencePolicy::default(), None);

    let student = services.students.create(&new_student("Ava", "Reyes")).await.unwrap();
    services.grades.create(&new_grade(student.id, "Art", 88.0)).await.unwrap();

    let result = services.students.delete(student.id).await;
    assert!(matches!(result, Err(DataError::Backend(_))));
    assert!(services.students.get_by_id(student.id).await.unwrap().is_some());
    assert_eq!(memory.row_count("grades").await, 1);
}

/// Fails the first `failures` selects with `NetworkUnavailable`
struct FlakySelects {
    inner: Arc<MemoryBackend>,
    failures: AtomicU32,
}

#[async_trait]
impl TableBackend for FlakySelects {
    async fn select(&self, query: Query) -> DataResult<Vec<JsonValue>> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(DataError::NetworkUnavailable("connection reset".to_string()));
        }
        self.inner.select(query).await
    }

    async fn insert(&self, table: &str, rows: Vec<JsonValue>) -> DataResult<Vec<JsonValue>> {
        self.inner.insert(table, rows).await
    }

    async fn update(&self, table: &str, filters: Vec<Filter>, patch: JsonValue) -> DataResult<Vec<JsonValue>> {
        self.inner.update(table, filters, patch).await
    }

    async fn delete(&self, table: &str, filters: Vec<Filter>) -> DataResult<u64> {
        self.inner.delete(table, filters).await
    }

    async fn upsert(&self, table: &str, row: JsonValue, on_conflict: &str) -> DataResult<JsonValue> {
        self.inner.upsert(table, row, on_conflict).await
    }

    async fn ping(&self) -> DataResult<()> {
        self.inner.ping().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_reads_retry_per_policy() {
    let memory = Arc::new(MemoryBackend::new());
    memory
        .insert("grades", vec![json!({
            "student_id": 1, "subject": "Math", "grade": 95.0, "max_grade": 100.0,
            "semester": "First", "academic_year": "2024-2025"
        })])
        .await
        .unwrap();

    let flaky = Arc::new(FlakySelects {
        inner: memory,
        failures: AtomicU32::new(2),
    });
    let policy = ResiliencePolicy {
        read_failure: ReadFailure::Propagate,
        max_retries: 2,
        retry_delay: Duration::from_millis(50),
    };
    let grades = GradeService::new(flaky.clone(), Arc::new(policy));

    let all = grades.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].letter(), LetterGrade::A);
    assert_eq!(flaky.failures.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_attendance_bulk_save_updates_or_creates() {
    let backend = Arc::new(MemoryBackend::new());
    let services = services(backend.clone());
    let day = date(2024, 9, 2);

    services
        .attendance
        .bulk_create(&[CreateAttendance {
            student_id: 1,
            date: day,
            status: AttendanceStatus::Absent,
            notes: None,
        }])
        .await
        .unwrap();

    let saved = services
        .attendance
        .bulk_save(
            day,
            &[
                AttendanceMark::new(1, AttendanceStatus::Late).with_notes("Bus delay"),
                AttendanceMark::new(2, AttendanceStatus::Present),
            ],
        )
        .await
        .unwrap();

    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].status, AttendanceStatus::Late);
    assert_eq!(saved[0].notes.as_deref(), Some("Bus delay"));
    assert_eq!(saved[1].student_id, 2);
    assert_eq!(backend.row_count("attendance").await, 2);

    let day_marks = services.attendance.get_by_date(day).await.unwrap();
    assert_eq!(day_marks.len(), 2);
}

#[tokio::test]
async fn test_attendance_bulk_save_keeps_one_mark_per_student() {
    let backend = Arc::new(MemoryBackend::new());
    let services = services(backend.clone());
    let day = date(2024, 9, 2);

    let saved = services
        .attendance
        .bulk_save(
            day,
            &[
                AttendanceMark::new(7, AttendanceStatus::Present),
                AttendanceMark::new(8, AttendanceStatus::Late),
                AttendanceMark::new(7, AttendanceStatus::Absent),
            ],
        )
        .await
        .unwrap();

    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].student_id, 7);
    assert_eq!(saved[0].status, AttendanceStatus::Absent);

    let day_marks = services.attendance.get_by_date(day).await.unwrap();
    let for_seven: Vec<_> = day_marks.iter().filter(|a| a.student_id == 7).collect();
    assert_eq!(for_seven.len(), 1);
    assert_eq!(for_seven[0].status, AttendanceStatus::Absent);
    assert_eq!(backend.row_count("attendance").await, 2);
}

#[tokio::test]
async fn test_attendance_history_most_recent_first() {
    let backend = Arc::new(MemoryBackend::new());
    let services = services(backend);
    for day in [date(2024, 9, 3), date(2024, 9, 5), date(2024, 9, 4)] {
        services
            .attendance
            .create(&CreateAttendance {
                student_id: 7,
                date: day,
                status: AttendanceStatus::Present,
                notes: None,
            })
            .await
            .unwrap();
    }

    let history = services.attendance.get_by_student(7).await.unwrap();
    let days: Vec<NaiveDate> = history.iter().map(|a| a.date).collect();
    assert_eq!(days, [date(2024, 9, 5), date(2024, 9, 4), date(2024, 9, 3)]);
}

#[tokio::test]
async fn test_grades_by_subject_and_letter() {
    let backend = Arc::new(MemoryBackend::new());
    let services = services(backend);
    services.grades.create(&new_grade(1, "Math", 72.0)).await.unwrap();
    services.grades.create(&new_grade(2, "Math", 85.0)).await.unwrap();
    services.grades.create(&new_grade(1, "Science", 64.0)).await.unwrap();

    let math = services.grades.get_by_subject("Math").await.unwrap();
    assert_eq!(math.len(), 2);
    assert_eq!(math[0].letter(), LetterGrade::B);
    assert_eq!(GradeService::letter_grade(64.0), LetterGrade::D);
}

#[tokio::test]
async fn test_billing_pending_and_mark_as_paid() {
    let backend = Arc::new(MemoryBackend::new());
    let services = services(backend);
    let later = services
        .billing
        .create(&new_invoice(1, date(2024, 11, 1), BillingStatus::Pending))
        .await
        .unwrap();
    let overdue = services
        .billing
        .create(&new_invoice(1, date(2024, 8, 1), BillingStatus::Overdue))
        .await
        .unwrap();
    services
        .billing
        .create(&new_invoice(1, date(2024, 7, 1), BillingStatus::Paid))
        .await
        .unwrap();

    let pending = services.billing.get_pending().await.unwrap();
    let ids: Vec<i64> = pending.iter().map(|b| b.id).collect();
    assert_eq!(ids, [overdue.id, later.id]);

    let paid = services.billing.mark_as_paid(overdue.id, "Cash").await.unwrap();
    assert_eq!(paid.status, BillingStatus::Paid);
    assert_eq!(paid.payment_method.as_deref(), Some("Cash"));
    assert!(paid.payment_date.is_some());
    assert_eq!(services.billing.get_pending().await.unwrap().len(), 1);

    let all = services.billing.get_all().await.unwrap();
    assert_eq!(all[0].due_date, date(2024, 11, 1));
}

#[tokio::test]
async fn test_settings_get_set_and_profile() {
    let backend = Arc::new(MemoryBackend::new());
    let services = services(backend);

    assert_eq!(services.settings.get("currency").await.unwrap(), None);
    assert_eq!(services.settings.school_profile().await.unwrap(), SchoolProfile::default());

    services.settings.set("currency", json!("USD")).await.unwrap();
    services.settings.set("currency", json!("PHP")).await.unwrap();
    assert_eq!(services.settings.get("currency").await.unwrap(), Some(json!("PHP")));
    assert_eq!(services.settings.get_all().await.unwrap().len(), 1);

    let profile = SchoolProfile {
        school_name: "Jolly Children Annex".to_string(),
        ..SchoolProfile::default()
    };
    services.settings.save_school_profile(&profile).await.unwrap();
    assert_eq!(services.settings.school_profile().await.unwrap(), profile);
}

#[tokio::test]
async fn test_user_create_links_identity_and_profile() {
    let backend = Arc::new(MemoryBackend::new());
    let services = services(backend.clone());

    let user = services
        .users
        .create(&CreateUser {
            email: "librarian@jollychildren.edu".to_string(),
            name: "Grace Ortiz".to_string(),
            role: UserRole::Staff,
            password: Some("shelves42".to_string()),
            avatar_url: None,
        })
        .await
        .unwrap();

    assert_eq!(services.users.get_by_id(&user.id).await.unwrap(), Some(user.clone()));

    use schoolhub_shared::backend::AuthBackend;
    let session = backend
        .sign_in_with_password("librarian@jollychildren.edu", "shelves42", Default::default())
        .await
        .unwrap();
    assert_eq!(session.identity.id, user.id);

    let duplicate = services
        .users
        .create(&CreateUser {
            email: "librarian@jollychildren.edu".to_string(),
            name: "Someone Else".to_string(),
            role: UserRole::Teacher,
            password: None,
            avatar_url: None,
        })
        .await;
    assert!(matches!(duplicate, Err(DataError::Conflict(_))));
}
