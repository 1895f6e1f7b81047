/// Backend abstraction
///
/// The hosted service exposes two interfaces, modelled as two traits:
///
/// - [`TableBackend`]: table-scoped select/insert/update/delete/upsert
/// - [`AuthBackend`]: password sign-in, sign-up, sign-out, current identity,
///   admin user creation
///
/// # Implementations
///
/// - [`rest::RestBackend`] / [`rest::RestAuth`]: HTTP clients for the hosted
///   REST and auth endpoints
/// - [`memory::MemoryBackend`]: in-process implementation of both traits for
///   tests and offline development
///
/// # Cancellation
///
/// Auth calls that run under a deadline receive a `CancellationToken`.
/// Implementations must stop waiting and return [`DataError::Cancelled`]
/// as soon as it fires; dropping the in-flight request future aborts it.
///
/// [`DataError::Cancelled`]: crate::error::DataError::Cancelled

pub mod memory;
pub mod query;
pub mod rest;

use crate::error::DataResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

pub use memory::MemoryBackend;
pub use query::{Filter, Order, Query};
pub use rest::{RestAuth, RestBackend};

/// Table-scoped data access
#[async_trait]
pub trait TableBackend: Send + Sync {
    /// Rows matching the query, in query order
    async fn select(&self, query: Query) -> DataResult<Vec<JsonValue>>;

    /// Inserts rows and returns them as persisted (ids, timestamps)
    async fn insert(&self, table: &str, rows: Vec<JsonValue>) -> DataResult<Vec<JsonValue>>;

    /// Merges `patch` into every matching row and returns the new rows
    async fn update(
        &self,
        table: &str,
        filters: Vec<Filter>,
        patch: JsonValue,
    ) -> DataResult<Vec<JsonValue>>;

    /// Deletes matching rows, returning how many were removed
    async fn delete(&self, table: &str, filters: Vec<Filter>) -> DataResult<u64>;

    /// Inserts or merges a row keyed by `on_conflict`
    async fn upsert(&self, table: &str, row: JsonValue, on_conflict: &str) -> DataResult<JsonValue>;

    /// Cheap reachability probe
    async fn ping(&self) -> DataResult<()>;
}

/// Identity issued by the auth subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,

    /// Free-form metadata supplied at sign-up (`name`, `avatar_url`, ...)
    #[serde(default, rename = "user_metadata")]
    pub metadata: JsonValue,
}

impl Identity {
    /// String value from metadata, if present and non-empty
    pub fn metadata_str(&self, key: &str) -> Option<String> {
        self.metadata
            .get(key)
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Authenticated session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub identity: Identity,
}

/// Authentication subsystem
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Creates a session for an email/password pair
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
        cancel: CancellationToken,
    ) -> DataResult<Session>;

    /// Registers a new identity; an existing email is a `Conflict`
    async fn sign_up(&self, email: &str, password: &str, metadata: JsonValue)
        -> DataResult<Identity>;

    /// Ends the current session
    async fn sign_out(&self) -> DataResult<()>;

    /// Identity behind the current session, if any
    async fn current_identity(&self, cancel: CancellationToken) -> DataResult<Option<Identity>>;

    /// Creates a confirmed identity with elevated credentials
    async fn admin_create_user(
        &self,
        email: &str,
        password: &str,
        metadata: JsonValue,
    ) -> DataResult<Identity>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_metadata_lookup() {
        let identity = Identity {
            id: "abc".to_string(),
            email: "teacher@jollychildren.edu".to_string(),
            metadata: json!({ "name": "John Teacher", "avatar_url": "" }),
        };
        assert_eq!(identity.metadata_str("name").as_deref(), Some("John Teacher"));
        assert_eq!(identity.metadata_str("avatar_url"), None);
        assert_eq!(identity.metadata_str("missing"), None);
    }

    #[test]
    fn test_identity_reads_user_metadata_key() {
        let identity: Identity = serde_json::from_value(json!({
            "id": "u-1",
            "email": "a@b.c",
            "user_metadata": { "name": "A" }
        }))
        .unwrap();
        assert_eq!(identity.metadata_str("name").as_deref(), Some("A"));
    }
}
