/// In-memory backend
///
/// Implements both [`TableBackend`] and [`AuthBackend`] inside the process.
/// It behaves like the hosted service where the services can observe it:
///
/// - numeric ids are assigned per table, explicit ids are kept
/// - `created_at`/`updated_at` are stamped by the backend and strictly
///   increase, so "newest first" ordering is stable
/// - unique columns (`users.email`, `app_settings.key`, every `id`) raise
///   `Conflict`
/// - passwords are Argon2id hashes and sessions are signed JWTs
///
/// For failure testing it can be switched offline (every call fails with
/// `NetworkUnavailable`) and given artificial latency. Auth calls honour
/// their cancellation token while waiting out that latency.
///
/// # Example
///
/// ```
/// use schoolhub_shared::backend::{MemoryBackend, Query, TableBackend};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MemoryBackend::new();
/// let rows = backend.insert("students", vec![json!({ "first_name": "Ava" })]).await?;
/// assert_eq!(rows[0]["id"], 1);
///
/// let all = backend.select(Query::table("students")).await?;
/// assert_eq!(all.len(), 1);
/// # Ok(())
/// # }
/// ```

use super::query::{Filter, Query};
use super::{AuthBackend, Identity, Session, TableBackend};
use crate::auth::jwt::{create_token, validate_token, SessionClaims};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{DataError, DataResult};
use crate::timeout::cancellable;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const DEFAULT_SECRET: &str = "schoolhub-memory-backend-local-secret";

#[derive(Debug, Default)]
struct MemTable {
    rows: Vec<JsonValue>,
    next_id: i64,
}

#[derive(Debug, Clone)]
struct Account {
    id: String,
    email: String,
    password_hash: String,
    metadata: JsonValue,
}

impl Account {
    fn identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            email: self.email.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct AuthState {
    accounts: HashMap<String, Account>,
    session: Option<String>,
}

/// In-process backend for tests and offline development
#[derive(Debug)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, MemTable>>,
    unique: HashMap<&'static str, Vec<&'static str>>,
    auth: Mutex<AuthState>,
    secret: String,
    last_stamp: std::sync::Mutex<DateTime<Utc>>,
    offline: AtomicBool,
    latency_ms: AtomicU64,
    sign_ins_completed: AtomicU64,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates an empty, online backend
    pub fn new() -> Self {
        Self::with_secret(DEFAULT_SECRET)
    }

    /// Creates a backend signing sessions with `secret`
    pub fn with_secret(secret: impl Into<String>) -> Self {
        let mut unique = HashMap::new();
        unique.insert("users", vec!["email"]);
        unique.insert("app_settings", vec!["key"]);

        MemoryBackend {
            tables: RwLock::new(HashMap::new()),
            unique,
            auth: Mutex::new(AuthState::default()),
            secret: secret.into(),
            last_stamp: std::sync::Mutex::new(DateTime::<Utc>::MIN_UTC),
            offline: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            sign_ins_completed: AtomicU64::new(0),
        }
    }

    /// Simulates an outage: every call fails with `NetworkUnavailable`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Adds a delay before every call is answered
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of password sign-ins that ran to completion
    ///
    /// Cancelled sign-ins never reach completion, so this stays unchanged
    /// when a caller's deadline fires.
    pub fn sign_ins_completed(&self) -> u64 {
        self.sign_ins_completed.load(Ordering::SeqCst)
    }

    /// Number of rows currently stored in `table`
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    fn ensure_online(&self) -> DataResult<()> {
        if self.is_offline() {
            return Err(DataError::NetworkUnavailable(
                "memory backend is offline".to_string(),
            ));
        }
        Ok(())
    }

    async fn respond(&self) -> DataResult<()> {
        self.ensure_online()?;
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            sleep(Duration::from_millis(latency)).await;
            self.ensure_online()?;
        }
        Ok(())
    }

    // Strictly increasing, microsecond precision.
    fn stamp(&self) -> String {
        let mut last = self
            .last_stamp
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut now = Utc::now();
        if now <= *last {
            now = *last + ChronoDuration::microseconds(1);
        }
        *last = now;
        now.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn check_unique(
        &self,
        table: &str,
        existing: &[JsonValue],
        candidate: &JsonValue,
        skip_index: Option<usize>,
    ) -> DataResult<()> {
        let mut columns = vec!["id"];
        if let Some(extra) = self.unique.get(table) {
            columns.extend(extra.iter().copied());
        }

        for column in columns {
            let Some(value) = candidate.get(column).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = existing
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != skip_index)
                .any(|(_, row)| row.get(column) == Some(value));
            if clash {
                return Err(DataError::Conflict(format!(
                    "duplicate key value violates unique constraint \"{}_{}_key\"",
                    table, column
                )));
            }
        }
        Ok(())
    }

    fn insert_locked(&self, table_name: &str, table: &mut MemTable, row: JsonValue) -> DataResult<JsonValue> {
        let JsonValue::Object(mut object) = row else {
            return Err(DataError::Backend(format!(
                "insert into {} expects an object row",
                table_name
            )));
        };

        match object.get("id") {
            Some(JsonValue::Number(n)) => {
                if let Some(explicit) = n.as_i64() {
                    table.next_id = table.next_id.max(explicit);
                }
            }
            Some(JsonValue::String(_)) => {}
            _ => {
                table.next_id += 1;
                object.insert("id".to_string(), JsonValue::from(table.next_id));
            }
        }

        let stamp = self.stamp();
        object
            .entry("created_at")
            .or_insert_with(|| JsonValue::String(stamp.clone()));
        object.insert("updated_at".to_string(), JsonValue::String(stamp));

        let row = JsonValue::Object(object);
        self.check_unique(table_name, &table.rows, &row, None)?;
        table.rows.push(row.clone());
        Ok(row)
    }

    fn merge_locked(
        &self,
        table_name: &str,
        table: &mut MemTable,
        index: usize,
        patch: &Map<String, JsonValue>,
    ) -> DataResult<JsonValue> {
        let mut merged = table.rows[index].clone();
        if let JsonValue::Object(object) = &mut merged {
            for (key, value) in patch {
                if key == "id" || key == "created_at" || key == "updated_at" {
                    continue;
                }
                object.insert(key.clone(), value.clone());
            }
            object.insert("updated_at".to_string(), JsonValue::String(self.stamp()));
        }
        self.check_unique(table_name, &table.rows, &merged, Some(index))?;
        table.rows[index] = merged.clone();
        Ok(merged)
    }

    fn session_identity(&self, state: &AuthState) -> Option<Identity> {
        let token = state.session.as_ref()?;
        let claims = validate_token(token, &self.secret).ok()?;
        state
            .accounts
            .values()
            .find(|account| account.id == claims.sub)
            .map(Account::identity)
    }

    async fn register(&self, email: &str, password: &str, metadata: JsonValue) -> DataResult<Identity> {
        self.respond().await?;

        let key = email.trim().to_lowercase();
        let mut state = self.auth.lock().await;
        if state.accounts.contains_key(&key) {
            return Err(DataError::Conflict("User already registered".to_string()));
        }

        let password_hash =
            hash_password(password).map_err(|e| DataError::Backend(e.to_string()))?;
        let account = Account {
            id: Uuid::new_v4().to_string(),
            email: key.clone(),
            password_hash,
            metadata: if metadata.is_null() {
                JsonValue::Object(Map::new())
            } else {
                metadata
            },
        };
        let identity = account.identity();
        state.accounts.insert(key, account);

        tracing::debug!(user_id = %identity.id, email = %identity.email, "Registered identity");
        Ok(identity)
    }
}

#[async_trait]
impl TableBackend for MemoryBackend {
    async fn select(&self, query: Query) -> DataResult<Vec<JsonValue>> {
        self.respond().await?;

        let tables = self.tables.read().await;
        let mut rows: Vec<JsonValue> = tables
            .get(&query.table)
            .map(|t| t.rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default();

        query.sort(&mut rows);
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        tracing::debug!(table = %query.table, rows = rows.len(), "select");
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: Vec<JsonValue>) -> DataResult<Vec<JsonValue>> {
        self.respond().await?;

        let mut tables = self.tables.write().await;
        let target = tables.entry(table.to_string()).or_default();

        // All-or-nothing: work on a scratch copy.
        let mut scratch = MemTable {
            rows: target.rows.clone(),
            next_id: target.next_id,
        };
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            inserted.push(self.insert_locked(table, &mut scratch, row)?);
        }
        *target = scratch;

        tracing::debug!(table = %table, rows = inserted.len(), "insert");
        Ok(inserted)
    }

    async fn update(
        &self,
        table: &str,
        filters: Vec<Filter>,
        patch: JsonValue,
    ) -> DataResult<Vec<JsonValue>> {
        self.respond().await?;

        let JsonValue::Object(patch) = patch else {
            return Err(DataError::Backend(format!(
                "update of {} expects an object patch",
                table
            )));
        };

        let mut tables = self.tables.write().await;
        let Some(target) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let indexes: Vec<usize> = target
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| filters.iter().all(|f| f.matches(row)))
            .map(|(i, _)| i)
            .collect();

        let mut updated = Vec::with_capacity(indexes.len());
        for index in indexes {
            updated.push(self.merge_locked(table, target, index, &patch)?);
        }

        tracing::debug!(table = %table, rows = updated.len(), "update");
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: Vec<Filter>) -> DataResult<u64> {
        self.respond().await?;

        let mut tables = self.tables.write().await;
        let Some(target) = tables.get_mut(table) else {
            return Ok(0);
        };

        let before = target.rows.len();
        target
            .rows
            .retain(|row| !filters.iter().all(|f| f.matches(row)));
        let removed = (before - target.rows.len()) as u64;

        tracing::debug!(table = %table, rows = removed, "delete");
        Ok(removed)
    }

    async fn upsert(&self, table: &str, row: JsonValue, on_conflict: &str) -> DataResult<JsonValue> {
        self.respond().await?;

        let key = row.get(on_conflict).cloned().ok_or_else(|| {
            DataError::Backend(format!("upsert into {} is missing {}", table, on_conflict))
        })?;

        let mut tables = self.tables.write().await;
        let target = tables.entry(table.to_string()).or_default();

        let existing = target
            .rows
            .iter()
            .position(|r| r.get(on_conflict) == Some(&key));

        if let (Some(index), JsonValue::Object(patch)) = (existing, &row) {
            return self.merge_locked(table, target, index, patch);
        }
        self.insert_locked(table, target, row)
    }

    async fn ping(&self) -> DataResult<()> {
        self.respond().await
    }
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
        cancel: CancellationToken,
    ) -> DataResult<Session> {
        cancellable(&cancel, async {
            self.respond().await?;

            let mut state = self.auth.lock().await;
            let account = state
                .accounts
                .get(&email.trim().to_lowercase())
                .cloned()
                .ok_or(DataError::InvalidCredentials)?;

            let valid = verify_password(password, &account.password_hash)
                .map_err(|e| DataError::Backend(e.to_string()))?;
            if !valid {
                return Err(DataError::InvalidCredentials);
            }

            let claims = SessionClaims::new(account.id.clone(), account.email.clone());
            let token =
                create_token(&claims, &self.secret).map_err(|e| DataError::Backend(e.to_string()))?;
            state.session = Some(token.clone());
            self.sign_ins_completed.fetch_add(1, Ordering::SeqCst);

            Ok(Session {
                access_token: token,
                identity: account.identity(),
            })
        })
        .await
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: JsonValue) -> DataResult<Identity> {
        self.register(email, password, metadata).await
    }

    async fn sign_out(&self) -> DataResult<()> {
        self.respond().await?;
        self.auth.lock().await.session = None;
        Ok(())
    }

    async fn current_identity(&self, cancel: CancellationToken) -> DataResult<Option<Identity>> {
        cancellable(&cancel, async {
            self.respond().await?;
            let state = self.auth.lock().await;
            Ok(self.session_identity(&state))
        })
        .await
    }

    async fn admin_create_user(
        &self,
        email: &str,
        password: &str,
        metadata: JsonValue,
    ) -> DataResult<Identity> {
        self.register(email, password, metadata).await
    }
}
