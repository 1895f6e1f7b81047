/// User account service
///
/// A user is two records: an identity in the auth subsystem and a profile
/// row in `users` sharing its id. `create` makes the identity first (admin
/// API, pre-confirmed) and then the profile. Deleting removes the profile
/// row only.

use super::repository::Repository;
use crate::backend::{AuthBackend, TableBackend};
use crate::error::DataResult;
use crate::fallback::FallbackGenerator;
use crate::models::user::{CreateUser, NewUserProfile, UpdateUser, User};
use crate::resilience::ResiliencePolicy;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

const GENERATED_PASSWORD_LEN: usize = 16;

#[derive(Clone)]
pub struct UserService {
    repo: Repository<User>,
    auth: Arc<dyn AuthBackend>,
    fallback: Option<Arc<FallbackGenerator>>,
}

impl UserService {
    pub fn new(
        backend: Arc<dyn TableBackend>,
        auth: Arc<dyn AuthBackend>,
        policy: Arc<ResiliencePolicy>,
        fallback: Option<Arc<FallbackGenerator>>,
    ) -> Self {
        UserService {
            repo: Repository::new(backend, policy),
            auth,
            fallback,
        }
    }

    /// All accounts, newest first; the fixed accounts when the backend is down
    pub async fn get_all(&self) -> DataResult<Vec<User>> {
        let fallback = self
            .fallback
            .clone()
            .map(|generator| move || generator.users());

        self.repo
            .list_or_fallback(self.repo.query().order_desc("created_at"), fallback)
            .await
    }

    /// Profile by auth identity id
    pub async fn get_by_id(&self, id: &str) -> DataResult<Option<User>> {
        self.repo.find(&id.to_string()).await
    }

    /// Creates the auth identity, then the profile row with the same id
    ///
    /// Without a password a random one is generated; the account can then
    /// only sign in after a reset.
    pub async fn create(&self, user: &CreateUser) -> DataResult<User> {
        user.validate()?;

        let password = user.password.clone().unwrap_or_else(generate_password);
        let identity = self
            .auth
            .admin_create_user(&user.email, &password, json!({ "name": user.name }))
            .await?;

        let profile = NewUserProfile {
            id: identity.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            avatar_url: user.avatar_url.clone(),
        };
        let created = self.repo.insert(&profile).await?;

        tracing::info!(user_id = %created.id, email = %created.email, role = %created.role, "Created user");
        Ok(created)
    }

    /// Updates profile fields only; the auth identity is unchanged
    pub async fn update(&self, id: &str, update: &UpdateUser) -> DataResult<User> {
        self.repo.patch(&id.to_string(), update).await
    }

    /// Removes the profile row
    ///
    /// The auth identity stays; removing it needs the hosted console.
    pub async fn delete(&self, id: &str) -> DataResult<()> {
        self.repo.remove(&id.to_string()).await
    }
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}
