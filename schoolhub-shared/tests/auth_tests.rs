/// Integration tests for sign-in, sessions and profile handling

use schoolhub_shared::auth::{AuthService, FallbackCredentials, ProfileUpdate};
use schoolhub_shared::backend::{AuthBackend, MemoryBackend};
use schoolhub_shared::error::DataError;
use schoolhub_shared::models::user::UserRole;
use schoolhub_shared::timeout::Deadline;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn auth_service(backend: &Arc<MemoryBackend>) -> AuthService {
    AuthService::new(backend.clone(), backend.clone(), Deadline::default())
}

#[tokio::test]
async fn test_fallback_admin_while_offline() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_offline(true);
    let auth = auth_service(&backend);

    let user = auth.sign_in("admin@jollychildren.edu", "admin123").await.unwrap();
    assert_eq!(user.id, "1");
    assert_eq!(user.name, "Administrator");
    assert_eq!(user.role, UserRole::Admin);
}

#[tokio::test]
async fn test_fallback_applies_when_backend_rejects() {
    let backend = Arc::new(MemoryBackend::new());
    let auth = auth_service(&backend);

    let user = auth.sign_in("teacher@jollychildren.edu", "teacher123").await.unwrap();
    assert_eq!(user.id, "2");
    assert_eq!(user.name, "John Teacher");
    assert_eq!(backend.sign_ins_completed(), 0);
}

#[tokio::test]
async fn test_unknown_credentials_rejected() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_offline(true);
    let auth = auth_service(&backend);

    let result = auth.sign_in("admin@jollychildren.edu", "wrong").await;
    assert!(matches!(result, Err(DataError::InvalidCredentials)));

    let auth = auth.with_credentials(FallbackCredentials::empty());
    let result = auth.sign_in("admin@jollychildren.edu", "admin123").await;
    assert!(matches!(result, Err(DataError::InvalidCredentials)));
}

#[tokio::test(start_paused = true)]
async fn test_slow_sign_in_is_cancelled_at_deadline() {
    let backend = Arc::new(MemoryBackend::new());
    backend
        .sign_up("admin@jollychildren.edu", "admin123", json!({ "name": "Admin" }))
        .await
        .unwrap();
    backend.set_latency(Duration::from_secs(30));

    let auth = AuthService::new(backend.clone(), backend.clone(), Deadline::new(Duration::from_secs(5)));
    let started = tokio::time::Instant::now();
    let user = auth.sign_in("admin@jollychildren.edu", "admin123").await.unwrap();

    assert_eq!(user.id, "1");
    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(backend.sign_ins_completed(), 0);
}

#[tokio::test]
async fn test_first_sign_in_creates_teacher_profile() {
    let backend = Arc::new(MemoryBackend::new());
    let identity = backend
        .sign_up("rosa@jollychildren.edu", "chalkboard", json!({ "name": "Rosa Lim" }))
        .await
        .unwrap();
    let auth = auth_service(&backend);

    let user = auth.sign_in("rosa@jollychildren.edu", "chalkboard").await.unwrap();
    assert_eq!(user.id, identity.id);
    assert_eq!(user.name, "Rosa Lim");
    assert_eq!(user.role, UserRole::Teacher);
    assert_eq!(backend.row_count("users").await, 1);

    let again = auth.sign_in("rosa@jollychildren.edu", "chalkboard").await.unwrap();
    assert_eq!(again, user);
    assert_eq!(backend.row_count("users").await, 1);
    assert_eq!(backend.sign_ins_completed(), 2);
}

#[tokio::test]
async fn test_default_profile_name_from_email() {
    let backend = Arc::new(MemoryBackend::new());
    backend
        .sign_up("marco@jollychildren.edu", "recess42", json!({}))
        .await
        .unwrap();
    let auth = auth_service(&backend);

    let user = auth.sign_in("marco@jollychildren.edu", "recess42").await.unwrap();
    assert_eq!(user.name, "marco");
}

#[tokio::test]
async fn test_current_user_follows_session() {
    let backend = Arc::new(MemoryBackend::new());
    backend
        .sign_up("rosa@jollychildren.edu", "chalkboard", json!({ "name": "Rosa Lim" }))
        .await
        .unwrap();
    let auth = auth_service(&backend);

    assert_eq!(auth.current_user().await.unwrap(), None);

    let user = auth.sign_in("rosa@jollychildren.edu", "chalkboard").await.unwrap();
    assert_eq!(auth.current_user().await.unwrap(), Some(user));

    backend.set_offline(true);
    assert_eq!(auth.current_user().await.unwrap(), None);

    backend.set_offline(false);
    auth.sign_out().await.unwrap();
    assert_eq!(auth.current_user().await.unwrap(), None);
}

#[tokio::test]
async fn test_update_profile_requires_session() {
    let backend = Arc::new(MemoryBackend::new());
    let auth = auth_service(&backend);

    let update = ProfileUpdate {
        name: Some("New Name".to_string()),
        avatar: None,
    };
    assert!(matches!(
        auth.update_profile(&update).await,
        Err(DataError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn test_update_profile_changes_name_and_avatar() {
    let backend = Arc::new(MemoryBackend::new());
    backend
        .sign_up("rosa@jollychildren.edu", "chalkboard", json!({ "name": "Rosa Lim" }))
        .await
        .unwrap();
    let auth = auth_service(&backend);
    auth.sign_in("rosa@jollychildren.edu", "chalkboard").await.unwrap();

    let updated = auth
        .update_profile(&ProfileUpdate {
            name: Some("Rosa Lim-Santos".to_string()),
            avatar: Some(Some("https://cdn.jollychildren.edu/rosa.png".to_string())),
        })
        .await
        .unwrap();
    assert_eq!(updated.name, "Rosa Lim-Santos");
    assert_eq!(updated.avatar.as_deref(), Some("https://cdn.jollychildren.edu/rosa.png"));

    let cleared = auth
        .update_profile(&ProfileUpdate {
            name: None,
            avatar: Some(None),
        })
        .await
        .unwrap();
    assert_eq!(cleared.name, "Rosa Lim-Santos");
    assert_eq!(cleared.avatar, None);
}

#[tokio::test]
async fn test_seed_demo_users_is_idempotent() {
    let backend = Arc::new(MemoryBackend::new());
    let auth = auth_service(&backend);

    assert_eq!(auth.seed_demo_users().await.unwrap(), 2);
    assert_eq!(auth.seed_demo_users().await.unwrap(), 0);
    assert_eq!(backend.row_count("users").await, 2);

    let admin = auth.sign_in("admin@jollychildren.edu", "admin123").await.unwrap();
    assert_eq!(admin.role, UserRole::Admin);
    assert_ne!(admin.id, "1");
    assert_eq!(backend.sign_ins_completed(), 1);
}

#[tokio::test]
async fn test_seed_demo_users_offline_fails() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_offline(true);
    let auth = auth_service(&backend);

    assert!(matches!(
        auth.seed_demo_users().await,
        Err(DataError::NetworkUnavailable(_))
    ));
}
