/// Application settings
///
/// Settings are stored one row per key in `app_settings` with an arbitrary
/// JSON value. [`SchoolProfile`] is the typed view over the well-known keys
/// the dashboard reads and writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// A settings row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSetting {
    pub key: String,
    pub value: JsonValue,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Notification channel toggles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPrefs {
    pub email: bool,
    pub sms: bool,
    pub push: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        NotificationPrefs {
            email: true,
            sms: false,
            push: true,
        }
    }
}

/// Backup policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPolicy {
    pub auto_backup: bool,
    pub backup_frequency: String,
    pub cloud_storage: bool,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        BackupPolicy {
            auto_backup: true,
            backup_frequency: "Daily".to_string(),
            cloud_storage: true,
        }
    }
}

/// School profile and preferences
///
/// Each field maps to one settings key; a missing or malformed key falls
/// back to the default for that field only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolProfile {
    pub school_name: String,
    pub school_address: String,
    pub school_phone: String,
    pub school_email: String,
    pub school_website: String,
    pub academic_year: String,
    pub currency: String,
    pub timezone: String,
    pub language: String,
    pub notifications: NotificationPrefs,
    pub backup: BackupPolicy,
}

impl Default for SchoolProfile {
    fn default() -> Self {
        SchoolProfile {
            school_name: "Jolly Children Academic Center".to_string(),
            school_address: "123 Education Street, Learning City, LC 12345".to_string(),
            school_phone: "+1 (555) 123-4567".to_string(),
            school_email: "info@jollychildren.edu".to_string(),
            school_website: "www.jollychildren.edu".to_string(),
            academic_year: "2024-2025".to_string(),
            currency: "PHP".to_string(),
            timezone: "America/New_York".to_string(),
            language: "English".to_string(),
            notifications: NotificationPrefs::default(),
            backup: BackupPolicy::default(),
        }
    }
}

impl SchoolProfile {
    /// Builds a profile from a settings map
    pub fn from_settings(settings: &BTreeMap<String, JsonValue>) -> Self {
        let defaults = SchoolProfile::default();

        fn pick<T: serde::de::DeserializeOwned>(
            settings: &BTreeMap<String, JsonValue>,
            key: &str,
            default: T,
        ) -> T {
            settings
                .get(key)
                .filter(|v| !v.is_null())
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or(default)
        }

        SchoolProfile {
            school_name: pick(settings, "school_name", defaults.school_name),
            school_address: pick(settings, "school_address", defaults.school_address),
            school_phone: pick(settings, "school_phone", defaults.school_phone),
            school_email: pick(settings, "school_email", defaults.school_email),
            school_website: pick(settings, "school_website", defaults.school_website),
            academic_year: pick(settings, "academic_year", defaults.academic_year),
            currency: pick(settings, "currency", defaults.currency),
            timezone: pick(settings, "timezone", defaults.timezone),
            language: pick(settings, "language", defaults.language),
            notifications: pick(settings, "notifications", defaults.notifications),
            backup: pick(settings, "backup", defaults.backup),
        }
    }

    /// Flattens the profile back into settings keys
    pub fn to_settings(&self) -> Result<Vec<(String, JsonValue)>, serde_json::Error> {
        match serde_json::to_value(self)? {
            JsonValue::Object(map) => Ok(map.into_iter().collect()),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_keys_use_defaults() {
        let mut settings = BTreeMap::new();
        settings.insert("currency".to_string(), json!("USD"));
        settings.insert("school_name".to_string(), JsonValue::Null);

        let profile = SchoolProfile::from_settings(&settings);
        assert_eq!(profile.currency, "USD");
        assert_eq!(profile.school_name, "Jolly Children Academic Center");
        assert_eq!(profile.notifications, NotificationPrefs::default());
    }

    #[test]
    fn test_backup_uses_dashboard_keys() {
        let json = serde_json::to_value(BackupPolicy::default()).unwrap();
        assert_eq!(
            json,
            json!({ "autoBackup": true, "backupFrequency": "Daily", "cloudStorage": true })
        );
    }

    #[test]
    fn test_round_trip_through_settings() {
        let mut profile = SchoolProfile::default();
        profile.language = "Filipino".to_string();

        let settings: BTreeMap<String, JsonValue> =
            profile.to_settings().unwrap().into_iter().collect();
        assert_eq!(settings.len(), 11);
        assert_eq!(SchoolProfile::from_settings(&settings), profile);
    }
}
