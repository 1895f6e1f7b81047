/// Error taxonomy for the data-access layer
///
/// Every backend, service and auth operation returns `DataResult<T>`. The
/// variants are structured so callers can branch on the kind of failure
/// instead of matching on message text.
///
/// # Example
///
/// ```
/// use schoolhub_shared::error::DataError;
///
/// let err = DataError::NetworkUnavailable("connection refused".to_string());
/// assert!(err.is_retryable());
/// assert!(!DataError::InvalidCredentials.is_retryable());
/// ```

use validator::ValidationErrors;

/// Result type alias used across the crate
pub type DataResult<T> = Result<T, DataError>;

/// Unified data-access error
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Backend could not be reached (connect failure, DNS, 5xx gateway)
    #[error("Backend unavailable: {0}")]
    NetworkUnavailable(String),

    /// Backend did not answer before the deadline
    #[error("Backend call timed out after {0} ms")]
    Timeout(u64),

    /// Call was cancelled before it completed
    #[error("Operation cancelled")]
    Cancelled,

    /// Email/password pair rejected
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Operation requires an authenticated session
    #[error("No authenticated user")]
    NotAuthenticated,

    /// Input failed validation before reaching the backend
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Row does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint or duplicate identity
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend answered with an error we do not classify further
    #[error("Backend error: {0}")]
    Backend(String),

    /// Row could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local persisted state could not be read or written
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl DataError {
    /// Builds a `NotFound` for the given entity and id
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DataError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True for failures that may succeed if the same call is repeated
    pub fn is_retryable(&self) -> bool {
        matches!(self, DataError::NetworkUnavailable(_) | DataError::Timeout(_))
    }

    /// True when the backend itself is out of reach
    ///
    /// Demo seeding stops on these. Fallback reads serve generated data on
    /// any error but log non-outage failures (rejected queries, rows that
    /// no longer decode) separately.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnavailable(_) | DataError::Timeout(_) | DataError::Cancelled
        )
    }
}

impl From<ValidationErrors> for DataError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let codes: Vec<String> = errs.iter().map(|e| e.code.to_string()).collect();
                format!("{} ({})", field, codes.join(", "))
            })
            .collect();
        fields.sort();
        DataError::ValidationFailed(fields.join("; "))
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DataError::Timeout(0)
        } else if err.is_connect() || err.is_request() {
            DataError::NetworkUnavailable(err.to_string())
        } else if err.is_decode() {
            DataError::Backend(format!("Malformed response: {}", err))
        } else {
            DataError::Backend(err.to_string())
        }
    }
}
