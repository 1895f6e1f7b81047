/// Generic table access for one entity type
///
/// `Repository<E>` owns the uniform half of every service: decoding rows,
/// validating inserts, stamping `updated_at` on partial updates and turning
/// "nothing matched" into `NotFound`. Entity services wrap it and add their
/// own queries.
///
/// Reads go through the shared [`ResiliencePolicy`]; writes are sent once.

use crate::backend::{Filter, Query, TableBackend};
use crate::error::{DataError, DataResult};
use crate::models::Entity;
use crate::resilience::ResiliencePolicy;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::Value as JsonValue;
use std::marker::PhantomData;
use std::sync::Arc;
use validator::Validate;

pub struct Repository<E: Entity> {
    backend: Arc<dyn TableBackend>,
    policy: Arc<ResiliencePolicy>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Repository {
            backend: self.backend.clone(),
            policy: self.policy.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(backend: Arc<dyn TableBackend>, policy: Arc<ResiliencePolicy>) -> Self {
        Repository {
            backend,
            policy,
            _entity: PhantomData,
        }
    }

    pub fn backend(&self) -> &Arc<dyn TableBackend> {
        &self.backend
    }

    pub fn policy(&self) -> &ResiliencePolicy {
        &self.policy
    }

    /// Query over this entity's table
    pub fn query(&self) -> Query {
        Query::table(E::TABLE)
    }

    async fn select_rows(&self, query: Query) -> DataResult<Vec<JsonValue>> {
        self.policy
            .retry(E::TABLE, || self.backend.select(query.clone()))
            .await
    }

    /// Rows matching `query`, retrying per policy
    pub async fn list(&self, query: Query) -> DataResult<Vec<E>> {
        decode_all(self.select_rows(query).await?)
    }

    /// Rows matching `query`, or `fallback()` when the policy allows it
    pub async fn list_or_fallback<G>(&self, query: Query, fallback: Option<G>) -> DataResult<Vec<E>>
    where
        G: FnOnce() -> Vec<E>,
    {
        self.policy
            .read_or_fallback(
                E::TABLE,
                || {
                    let query = query.clone();
                    async move { decode_all(self.backend.select(query).await?) }
                },
                fallback,
            )
            .await
    }

    /// All rows, newest first
    pub async fn all(&self) -> DataResult<Vec<E>> {
        self.list(self.query().order_desc("created_at")).await
    }

    pub async fn find(&self, id: &E::Id) -> DataResult<Option<E>> {
        let query = self.query().filter(id_filter::<E>(id)?).limit(1);
        match self.select_rows(query).await?.into_iter().next() {
            Some(row) => Ok(Some(decode(row)?)),
            None => Ok(None),
        }
    }

    /// Validates and inserts one row
    pub async fn insert(&self, input: &E::Create) -> DataResult<E> {
        input.validate()?;
        let row = serde_json::to_value(input)?;
        let inserted = self.backend.insert(E::TABLE, vec![row]).await?;

        let row = inserted.into_iter().next().ok_or_else(|| {
            DataError::Backend(format!("insert into {} returned no row", E::TABLE))
        })?;
        let entity: E = decode(row)?;

        tracing::debug!(table = E::TABLE, id = %entity.id(), "Inserted {}", E::NAME);
        Ok(entity)
    }

    /// Validates every input, then inserts them in one call
    pub async fn insert_many(&self, inputs: &[E::Create]) -> DataResult<Vec<E>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let mut rows = Vec::with_capacity(inputs.len());
        for input in inputs {
            input.validate()?;
            rows.push(serde_json::to_value(input)?);
        }
        decode_all(self.backend.insert(E::TABLE, rows).await?)
    }

    /// Applies a partial update and stamps `updated_at`
    ///
    /// Present fields are validated against the insert rules before any
    /// backend call. Only fields present in `update` are sent. The stamp is
    /// never earlier than the row's previous `updated_at`.
    pub async fn patch(&self, id: &E::Id, update: &E::Update) -> DataResult<E> {
        update.validate()?;
        let JsonValue::Object(mut fields) = serde_json::to_value(update)? else {
            return Err(DataError::ValidationFailed(format!(
                "{} update must be an object",
                E::NAME
            )));
        };

        let current = self
            .select_rows(self.query().filter(id_filter::<E>(id)?).limit(1))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DataError::not_found(E::NAME, id))?;

        let stamp = next_stamp(current.get("updated_at"));
        fields.insert(
            "updated_at".to_string(),
            JsonValue::String(stamp.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );

        self.patch_where(id, JsonValue::Object(fields)).await
    }

    /// Sends a raw patch for one row; no match is `NotFound`
    pub async fn patch_where(&self, id: &E::Id, patch: JsonValue) -> DataResult<E> {
        let updated = self
            .backend
            .update(E::TABLE, vec![id_filter::<E>(id)?], patch)
            .await?;

        let row = updated
            .into_iter()
            .next()
            .ok_or_else(|| DataError::not_found(E::NAME, id))?;

        tracing::debug!(table = E::TABLE, id = %id, "Updated {}", E::NAME);
        decode(row)
    }

    /// Deletes one row; no match is `NotFound`
    pub async fn remove(&self, id: &E::Id) -> DataResult<()> {
        let removed = self
            .backend
            .delete(E::TABLE, vec![id_filter::<E>(id)?])
            .await?;

        if removed == 0 {
            return Err(DataError::not_found(E::NAME, id));
        }

        tracing::debug!(table = E::TABLE, id = %id, "Deleted {}", E::NAME);
        Ok(())
    }

    /// Deletes every row matching `filters`, returning the count
    pub async fn remove_where(&self, filters: Vec<Filter>) -> DataResult<u64> {
        self.backend.delete(E::TABLE, filters).await
    }
}

fn id_filter<E: Entity>(id: &E::Id) -> DataResult<Filter> {
    Ok(Filter::eq("id", serde_json::to_value(id)?))
}

fn decode<E: Entity>(row: JsonValue) -> DataResult<E> {
    Ok(serde_json::from_value(row)?)
}

fn decode_all<E: Entity>(rows: Vec<JsonValue>) -> DataResult<Vec<E>> {
    rows.into_iter().map(decode).collect()
}

// Now, or one microsecond past the previous stamp if the clock lags it.
fn next_stamp(previous: Option<&JsonValue>) -> DateTime<Utc> {
    let now = Utc::now();
    let previous = previous
        .and_then(JsonValue::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc));

    match previous {
        Some(prev) if prev >= now => prev + Duration::microseconds(1),
        _ => now,
    }
}
