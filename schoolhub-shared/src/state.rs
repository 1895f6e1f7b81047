/// Persisted client state
///
/// The dashboard keeps four values between sessions: the signed-in user,
/// the dashboard widget layout, the communications outbox and the report
/// catalogue. They live in one versioned JSON document:
///
/// ```json
/// {
///   "version": 1,
///   "user": { "id": "1", "email": "...", "name": "...", "role": "Admin" },
///   "dashboardWidgets": [...],
///   "communications": [...],
///   "reports": [...]
/// }
/// ```
///
/// A missing file loads as the empty state. A document written by an
/// unknown version is discarded with a warning rather than misread.
///
/// # Example
///
/// ```no_run
/// use schoolhub_shared::state::LocalStore;
///
/// # async fn example() -> schoolhub_shared::DataResult<()> {
/// let store = LocalStore::new("schoolhub-state.json");
/// let mut state = store.load().await?;
/// state.user = None;
/// store.save(&state).await?;
/// # Ok(())
/// # }
/// ```

use crate::auth::AuthUser;
use crate::error::DataResult;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Document version written by this build
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommunicationType {
    Announcement,
    Email,
    #[serde(rename = "SMS")]
    Sms,
    Notice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommunicationStatus {
    Sent,
    Scheduled,
    Draft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// A message in the communications outbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Communication {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: CommunicationType,
    pub title: String,
    pub content: String,
    pub recipients: Vec<String>,
    pub sender: String,
    pub date: String,
    pub status: CommunicationStatus,
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportType {
    Attendance,
    Academic,
    Financial,
    Student,
    Staff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    Available,
    Generating,
    Error,
}

/// An entry in the report catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ReportType,
    pub description: String,
    pub last_generated: String,
    pub status: ReportStatus,
    pub file_size: String,
}

/// Everything the client persists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientState {
    pub version: u32,

    #[serde(default)]
    pub user: Option<AuthUser>,

    /// Widget layout, opaque to this crate
    #[serde(default)]
    pub dashboard_widgets: JsonValue,

    #[serde(default)]
    pub communications: Vec<Communication>,

    #[serde(default)]
    pub reports: Vec<Report>,
}

impl Default for ClientState {
    fn default() -> Self {
        ClientState {
            version: STATE_VERSION,
            user: None,
            dashboard_widgets: JsonValue::Null,
            communications: Vec::new(),
            reports: Vec::new(),
        }
    }
}

impl ClientState {
    /// Appends a message, assigning the next free id
    pub fn add_communication(&mut self, mut message: Communication) -> i64 {
        message.id = self.communications.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let id = message.id;
        self.communications.push(message);
        id
    }

    /// Inserts or replaces the report with the same id
    pub fn upsert_report(&mut self, report: Report) {
        match self.reports.iter_mut().find(|r| r.id == report.id) {
            Some(existing) => *existing = report,
            None => self.reports.push(report),
        }
    }
}

/// JSON file holding the client state
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LocalStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the state; missing file or unknown version gives the empty state
    pub async fn load(&self) -> DataResult<ClientState> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ClientState::default()),
            Err(e) => return Err(e.into()),
        };

        let document: JsonValue = serde_json::from_slice(&raw)?;
        let version = document.get("version").and_then(JsonValue::as_u64);
        if version != Some(u64::from(STATE_VERSION)) {
            tracing::warn!(
                path = %self.path.display(),
                found = ?version,
                expected = STATE_VERSION,
                "Discarding client state written by another version"
            );
            return Ok(ClientState::default());
        }

        Ok(serde_json::from_value(document)?)
    }

    /// Writes the state, replacing the file atomically
    pub async fn save(&self, state: &ClientState) -> DataResult<()> {
        let mut state = state.clone();
        state.version = STATE_VERSION;
        let body = serde_json::to_vec_pretty(&state)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), "Saved client state");
        Ok(())
    }

    /// Removes the file; clearing an absent file is not an error
    pub async fn clear(&self) -> DataResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
