/// Authentication service
///
/// Wraps an [`AuthBackend`] and the `users` profile table.
///
/// # Bounded waits
///
/// `sign_in` and `current_user` run their auth backend call under a
/// [`Deadline`] (5 seconds by default). When the deadline passes the call's
/// cancellation token fires and the in-flight request is dropped.
///
/// # Sign-in fallback
///
/// If the backend sign-in fails for any reason (unreachable, timed out,
/// credentials rejected, profile write failed) the fixed credential table
/// is consulted. Pairs not in the table fail with `InvalidCredentials`.
///
/// # Example
///
/// ```
/// use schoolhub_shared::auth::AuthService;
/// use schoolhub_shared::backend::MemoryBackend;
/// use schoolhub_shared::timeout::Deadline;
/// use std::sync::Arc;
///
/// # async fn example() -> schoolhub_shared::DataResult<()> {
/// let backend = Arc::new(MemoryBackend::new());
/// backend.set_offline(true);
///
/// let auth = AuthService::new(backend.clone(), backend, Deadline::default());
/// let user = auth.sign_in("admin@jollychildren.edu", "admin123").await?;
/// assert_eq!(user.name, "Administrator");
/// # Ok(())
/// # }
/// ```

use super::credentials::FallbackCredentials;
use super::AuthUser;
use crate::backend::{AuthBackend, Identity, TableBackend};
use crate::error::{DataError, DataResult};
use crate::models::user::{NewUserProfile, UpdateUser, User, UserRole};
use crate::resilience::ResiliencePolicy;
use crate::services::repository::Repository;
use crate::timeout::Deadline;
use serde_json::json;
use std::sync::Arc;

/// Changes a signed-in user may make to their own profile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,

    /// `Some(None)` clears the avatar
    pub avatar: Option<Option<String>>,
}

#[derive(Clone)]
pub struct AuthService {
    auth: Arc<dyn AuthBackend>,
    users: Repository<User>,
    deadline: Deadline,
    credentials: FallbackCredentials,
}

impl AuthService {
    pub fn new(auth: Arc<dyn AuthBackend>, tables: Arc<dyn TableBackend>, deadline: Deadline) -> Self {
        AuthService {
            auth,
            users: Repository::new(tables, Arc::new(ResiliencePolicy::strict())),
            deadline,
            credentials: FallbackCredentials::default(),
        }
    }

    /// Replaces the fallback credential table
    pub fn with_credentials(mut self, credentials: FallbackCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Signs in, falling back to the fixed credential table on any failure
    pub async fn sign_in(&self, email: &str, password: &str) -> DataResult<AuthUser> {
        match self.backend_sign_in(email, password).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, email = %user.email, "Signed in");
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(email = %email, error = %e, "Backend sign-in failed, using fallback credentials");
                let user = self
                    .credentials
                    .check(email, password)
                    .ok_or(DataError::InvalidCredentials)?;
                tracing::info!(user_id = %user.id, email = %user.email, "Signed in with fallback credentials");
                Ok(user)
            }
        }
    }

    async fn backend_sign_in(&self, email: &str, password: &str) -> DataResult<AuthUser> {
        let session = self
            .deadline
            .run("sign_in", |cancel| async move {
                self.auth.sign_in_with_password(email, password, cancel).await
            })
            .await?;

        let identity = session.identity;
        match self.users.find(&identity.id).await? {
            Some(profile) => Ok(profile.into()),
            None => self.create_default_profile(&identity).await,
        }
    }

    // First sign-in of an identity without a profile row: persist a Teacher profile.
    async fn create_default_profile(&self, identity: &Identity) -> DataResult<AuthUser> {
        let name = identity.metadata_str("name").unwrap_or_else(|| {
            identity
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        });

        let profile = NewUserProfile {
            id: identity.id.clone(),
            email: identity.email.clone(),
            name,
            role: UserRole::Teacher,
            avatar_url: identity.metadata_str("avatar_url"),
        };
        let created = self.users.insert(&profile).await?;

        tracing::info!(user_id = %created.id, "Created default profile");
        Ok(created.into())
    }

    pub async fn sign_out(&self) -> DataResult<()> {
        self.auth.sign_out().await?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// The signed-in user, or `None`
    ///
    /// Timeouts, an unreachable backend and a missing profile all read as
    /// `None`.
    pub async fn current_user(&self) -> DataResult<Option<AuthUser>> {
        match self.lookup_current_user().await {
            Ok(user) => Ok(user),
            Err(e) => {
                tracing::warn!(error = %e, "Could not resolve current user");
                Ok(None)
            }
        }
    }

    async fn lookup_current_user(&self) -> DataResult<Option<AuthUser>> {
        let Some(identity) = self.current_identity().await? else {
            return Ok(None);
        };
        Ok(self.users.find(&identity.id).await?.map(AuthUser::from))
    }

    async fn current_identity(&self) -> DataResult<Option<Identity>> {
        self.deadline
            .run("current_user", |cancel| async move {
                self.auth.current_identity(cancel).await
            })
            .await
    }

    /// Updates the signed-in user's name and avatar
    pub async fn update_profile(&self, update: &ProfileUpdate) -> DataResult<AuthUser> {
        let identity = self
            .current_identity()
            .await?
            .ok_or(DataError::NotAuthenticated)?;

        let patch = UpdateUser {
            name: update.name.clone(),
            avatar_url: update.avatar.clone(),
            ..Default::default()
        };
        let updated = self.users.patch(&identity.id, &patch).await?;

        tracing::info!(user_id = %updated.id, "Updated profile");
        Ok(updated.into())
    }

    /// Registers the demo accounts and their profiles
    ///
    /// Accounts that already exist are skipped. Returns how many were
    /// created.
    pub async fn seed_demo_users(&self) -> DataResult<usize> {
        let mut created = 0;

        for (email, password, name, role) in self.credentials.demo_accounts() {
            let identity = match self.auth.sign_up(email, password, json!({ "name": name })).await {
                Ok(identity) => identity,
                Err(DataError::Conflict(_)) => {
                    tracing::debug!(email = %email, "Demo user already registered");
                    continue;
                }
                Err(e) if e.is_unavailable() => return Err(e),
                Err(e) => {
                    tracing::warn!(email = %email, error = %e, "Could not create demo user");
                    continue;
                }
            };

            let profile = NewUserProfile {
                id: identity.id,
                email: email.to_string(),
                name: name.to_string(),
                role,
                avatar_url: None,
            };
            if let Err(e) = self.users.insert(&profile).await {
                tracing::warn!(email = %email, error = %e, "Could not create demo profile");
                continue;
            }

            tracing::info!(email = %email, role = %role, "Created demo user");
            created += 1;
        }

        Ok(created)
    }
}
