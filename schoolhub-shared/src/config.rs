/// Configuration loaded from environment variables
///
/// # Environment Variables
///
/// - `SCHOOLHUB_BACKEND_URL`: base URL of the hosted backend (unset = in-memory)
/// - `SCHOOLHUB_ANON_KEY`: public API key, required with a backend URL
/// - `SCHOOLHUB_SERVICE_KEY`: elevated key for admin user creation (optional)
/// - `SCHOOLHUB_REQUEST_TIMEOUT_SECS`: HTTP request timeout (default: 30)
/// - `SCHOOLHUB_AUTH_TIMEOUT_MS`: bounded wait for auth calls (default: 5000)
/// - `SCHOOLHUB_READ_FAILURE`: `fallback` or `propagate` (default: fallback)
/// - `SCHOOLHUB_MAX_RETRIES`: read retries (default: 0)
/// - `SCHOOLHUB_RETRY_DELAY_MS`: base retry delay (default: 250)
/// - `SCHOOLHUB_FALLBACK_SEED`: seed for fallback data (default: entropy)
/// - `SCHOOLHUB_STATE_PATH`: client state file (default: schoolhub-state.json)
///
/// # Example
///
/// ```no_run
/// use schoolhub_shared::config::Config;
///
/// # fn example() -> Result<(), schoolhub_shared::config::ConfigError> {
/// let config = Config::from_env()?;
/// println!("auth timeout: {:?}", config.auth_deadline.timeout());
/// # Ok(())
/// # }
/// ```

use crate::resilience::{ReadFailure, ResiliencePolicy};
use crate::timeout::Deadline;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_STATE_PATH: &str = "schoolhub-state.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Hosted backend connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,

    /// Public key sent as `apikey` on every request
    pub anon_key: String,

    /// Service-role key, enables admin user creation
    #[serde(default, skip_serializing)]
    pub service_key: Option<String>,

    pub request_timeout_secs: u64,
}

/// Complete configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// None runs against the in-memory backend
    pub backend: Option<BackendConfig>,

    pub auth_deadline: Deadline,

    pub resilience: ResiliencePolicy,

    pub fallback_seed: Option<u64>,

    pub state_path: PathBuf,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match get("SCHOOLHUB_BACKEND_URL") {
            Some(url) => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::Invalid {
                        var: "SCHOOLHUB_BACKEND_URL",
                        value: url,
                        reason: "expected an http(s) URL".to_string(),
                    });
                }
                let anon_key =
                    get("SCHOOLHUB_ANON_KEY").ok_or(ConfigError::Missing("SCHOOLHUB_ANON_KEY"))?;
                Some(BackendConfig {
                    url,
                    anon_key,
                    service_key: get("SCHOOLHUB_SERVICE_KEY"),
                    request_timeout_secs: parse_or(
                        "SCHOOLHUB_REQUEST_TIMEOUT_SECS",
                        get("SCHOOLHUB_REQUEST_TIMEOUT_SECS"),
                        30,
                    )?,
                })
            }
            None => None,
        };

        let auth_timeout_ms: u64 =
            parse_or("SCHOOLHUB_AUTH_TIMEOUT_MS", get("SCHOOLHUB_AUTH_TIMEOUT_MS"), 5000)?;

        let read_failure: ReadFailure =
            parse_or("SCHOOLHUB_READ_FAILURE", get("SCHOOLHUB_READ_FAILURE"), ReadFailure::Fallback)?;

        let resilience = ResiliencePolicy {
            read_failure,
            max_retries: parse_or("SCHOOLHUB_MAX_RETRIES", get("SCHOOLHUB_MAX_RETRIES"), 0)?,
            retry_delay: Duration::from_millis(parse_or(
                "SCHOOLHUB_RETRY_DELAY_MS",
                get("SCHOOLHUB_RETRY_DELAY_MS"),
                250,
            )?),
        };

        let fallback_seed = match get("SCHOOLHUB_FALLBACK_SEED") {
            Some(raw) => Some(parse("SCHOOLHUB_FALLBACK_SEED", raw)?),
            None => None,
        };

        let state_path = get("SCHOOLHUB_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH));

        Ok(Config {
            backend,
            auth_deadline: Deadline::from_millis(Some(auth_timeout_ms)),
            resilience,
            fallback_seed,
            state_path,
        })
    }
}

fn parse<T>(var: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw.trim().parse::<T>() {
        Ok(value) => Ok(value),
        Err(e) => Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => parse(var, raw),
        None => Ok(default),
    }
}
