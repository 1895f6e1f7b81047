/// Settings access service
///
/// Settings are keyed rows in `app_settings`. A missing key reads as `None`
/// rather than an error, and `set` upserts on the key.
///
/// # Example
///
/// ```no_run
/// use schoolhub_shared::services::settings::SettingsService;
/// use serde_json::json;
///
/// # async fn example(settings: SettingsService) -> schoolhub_shared::DataResult<()> {
/// settings.set("currency", json!("PHP")).await?;
/// assert_eq!(settings.get("currency").await?, Some(json!("PHP")));
/// # Ok(())
/// # }
/// ```

use crate::backend::{Query, TableBackend};
use crate::error::DataResult;
use crate::models::setting::{AppSetting, SchoolProfile};
use crate::resilience::ResiliencePolicy;
use chrono::{SecondsFormat, Utc};
use futures::future::try_join_all;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const SETTINGS_TABLE: &str = "app_settings";

#[derive(Clone)]
pub struct SettingsService {
    backend: Arc<dyn TableBackend>,
    policy: Arc<ResiliencePolicy>,
}

impl SettingsService {
    pub fn new(backend: Arc<dyn TableBackend>, policy: Arc<ResiliencePolicy>) -> Self {
        SettingsService { backend, policy }
    }

    async fn select(&self, query: Query) -> DataResult<Vec<AppSetting>> {
        let rows = self
            .policy
            .retry(SETTINGS_TABLE, || self.backend.select(query.clone()))
            .await?;
        rows.into_iter()
            .map(|row| Ok(serde_json::from_value(row)?))
            .collect()
    }

    /// Value stored under `key`, `None` when the key is absent
    pub async fn get(&self, key: &str) -> DataResult<Option<JsonValue>> {
        let query = Query::table(SETTINGS_TABLE).eq("key", key).limit(1);
        Ok(self
            .select(query)
            .await?
            .into_iter()
            .next()
            .map(|setting| setting.value))
    }

    /// Inserts or replaces the value under `key`
    pub async fn set(&self, key: &str, value: JsonValue) -> DataResult<()> {
        let row = json!({
            "key": key,
            "value": value,
            "updated_at": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        });
        self.backend.upsert(SETTINGS_TABLE, row, "key").await?;

        tracing::debug!(key = %key, "Saved setting");
        Ok(())
    }

    /// Every setting as a key/value map
    pub async fn get_all(&self) -> DataResult<BTreeMap<String, JsonValue>> {
        let settings = self.select(Query::table(SETTINGS_TABLE)).await?;
        Ok(settings.into_iter().map(|s| (s.key, s.value)).collect())
    }

    /// Typed view over the well-known keys, defaults for missing ones
    pub async fn school_profile(&self) -> DataResult<SchoolProfile> {
        Ok(SchoolProfile::from_settings(&self.get_all().await?))
    }

    /// Writes every key of `profile`
    pub async fn save_school_profile(&self, profile: &SchoolProfile) -> DataResult<()> {
        let writes = profile
            .to_settings()?
            .into_iter()
            .map(|(key, value)| async move { self.set(&key, value).await });
        try_join_all(writes).await?;
        tracing::info!(school = %profile.school_name, "Saved school profile");
        Ok(())
    }
}
