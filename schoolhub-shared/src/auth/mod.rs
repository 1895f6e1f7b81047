/// Authentication
///
/// # Modules
///
/// - [`service`]: sign-in/out, current user, profile updates, demo seeding
/// - [`credentials`]: the fixed credential table used while the backend is down
/// - [`password`]: Argon2id hashing for locally held credentials
/// - [`jwt`]: session tokens issued by the in-memory backend
///
/// # Example
///
/// ```
/// use schoolhub_shared::auth::credentials::FallbackCredentials;
/// use schoolhub_shared::models::user::UserRole;
///
/// let credentials = FallbackCredentials::default();
/// let admin = credentials.check("admin@jollychildren.edu", "admin123").unwrap();
/// assert_eq!(admin.role, UserRole::Admin);
/// ```

pub mod credentials;
pub mod jwt;
pub mod password;
pub mod service;

use crate::models::user::{User, UserRole};
use serde::{Deserialize, Serialize};

pub use credentials::FallbackCredentials;
pub use service::{AuthService, ProfileUpdate};

/// The signed-in user as the dashboard sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        AuthUser {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            avatar: user.avatar_url,
        }
    }
}
