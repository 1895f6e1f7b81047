//! # SchoolHub Shared Library
//!
//! Data-access layer for the SchoolHub school administration dashboard.
//! Everything a presentation layer needs to talk to the hosted backend
//! lives here, together with the offline fallbacks used when it is down.
//!
//! ## Module Organization
//!
//! - `backend`: Table and auth backend traits, REST and in-memory implementations
//! - `models`: Entity rows and their insert/update shapes
//! - `services`: Per-entity access services with a uniform contract
//! - `auth`: Sign-in/out, current user, profile updates, local credentials
//! - `fallback`: Seeded generators for offline data
//! - `resilience`: The shared read-failure and retry policy
//! - `timeout`: Bounded waits backed by cancellation tokens
//! - `state`: Persisted client state (session user, widgets, messages, reports)
//! - `config`: Environment configuration
//! - `error`: The `DataError` taxonomy

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod fallback;
pub mod models;
pub mod resilience;
pub mod services;
pub mod state;
pub mod timeout;

pub use error::{DataError, DataResult};

/// Current version of the SchoolHub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
