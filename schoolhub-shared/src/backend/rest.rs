/// HTTP clients for the hosted backend
///
/// [`RestBackend`] speaks the PostgREST dialect under `/rest/v1/<table>` and
/// [`RestAuth`] the auth API under `/auth/v1/...`. Both share one session
/// handle so table calls carry the signed-in user's token (row-level
/// security applies) and fall back to the anonymous key otherwise.
///
/// # Request Mapping
///
/// | operation | request |
/// |---|---|
/// | select | `GET /rest/v1/t?select=*&col=eq.v&order=c.desc` |
/// | insert | `POST /rest/v1/t`, `Prefer: return=representation` |
/// | update | `PATCH /rest/v1/t?col=eq.v`, `Prefer: return=representation` |
/// | delete | `DELETE /rest/v1/t?col=eq.v`, `Prefer: return=representation` |
/// | upsert | `POST /rest/v1/t?on_conflict=k`, `Prefer: resolution=merge-duplicates` |
///
/// # Example
///
/// ```no_run
/// use schoolhub_shared::backend::rest::RestBackend;
/// use schoolhub_shared::config::BackendConfig;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = BackendConfig {
///     url: "https://project.example.co".to_string(),
///     anon_key: "public-anon-key".to_string(),
///     service_key: None,
///     request_timeout_secs: 30,
/// };
/// let (tables, auth) = RestBackend::connect(&config)?;
/// # Ok(())
/// # }
/// ```

use super::query::{Filter, Query};
use super::{AuthBackend, Identity, Session, TableBackend};
use crate::config::BackendConfig;
use crate::error::{DataError, DataResult};
use crate::timeout::cancellable;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Access token of the signed-in user, shared by table and auth clients
pub type SessionHandle = Arc<RwLock<Option<String>>>;

/// Error body returned by PostgREST and the auth API
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<JsonValue>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl ErrorBody {
    fn text(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
            .unwrap_or_default()
    }

    fn code(&self) -> String {
        match &self.code {
            Some(JsonValue::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

/// Maps a non-success response to the error taxonomy
async fn into_error(response: Response) -> DataError {
    let status = response.status();
    let body: ErrorBody = response.json().await.unwrap_or_default();
    classify(status, &body)
}

fn classify(status: StatusCode, body: &ErrorBody) -> DataError {
    let text = body.text();
    let code = body.code();

    if code == "23505" || status == StatusCode::CONFLICT {
        return DataError::Conflict(text);
    }
    if code == "PGRST116" {
        return DataError::Backend(format!("expected a single row: {}", text));
    }

    match status {
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
            DataError::NetworkUnavailable(format!("{}: {}", status, text))
        }
        StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => DataError::Timeout(0),
        StatusCode::UNPROCESSABLE_ENTITY if text.contains("already") => DataError::Conflict(text),
        _ => DataError::Backend(format!("{}: {}", status, text)),
    }
}

fn build_client(config: &BackendConfig) -> DataResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| DataError::Backend(format!("Failed to build HTTP client: {}", e)))
}

fn base_url(config: &BackendConfig) -> String {
    config.url.trim_end_matches('/').to_string()
}

/// PostgREST table client
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base: String,
    anon_key: String,
    session: SessionHandle,
}

impl RestBackend {
    /// Creates a table client with its own (empty) session
    pub fn new(config: &BackendConfig) -> DataResult<Self> {
        Self::with_session(config, Arc::new(RwLock::new(None)))
    }

    /// Creates a table client sharing `session` with an auth client
    pub fn with_session(config: &BackendConfig, session: SessionHandle) -> DataResult<Self> {
        Ok(RestBackend {
            client: build_client(config)?,
            base: base_url(config),
            anon_key: config.anon_key.clone(),
            session,
        })
    }

    /// Builds a table client and an auth client over one session
    pub fn connect(config: &BackendConfig) -> DataResult<(RestBackend, RestAuth)> {
        let session: SessionHandle = Arc::new(RwLock::new(None));
        let tables = RestBackend::with_session(config, session.clone())?;
        let auth = RestAuth::with_session(config, session)?;
        Ok((tables, auth))
    }

    async fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let bearer = self
            .session
            .read()
            .await
            .clone()
            .unwrap_or_else(|| self.anon_key.clone());

        self.client
            .request(method, format!("{}/rest/v1/{}", self.base, table))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn send_rows(&self, request: RequestBuilder) -> DataResult<Vec<JsonValue>> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(into_error(response).await);
        }
        // DELETE/PATCH can answer 204 with no body.
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        Ok(response.json::<Vec<JsonValue>>().await?)
    }
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters.iter().map(Filter::to_param).collect()
}

#[async_trait]
impl TableBackend for RestBackend {
    async fn select(&self, query: Query) -> DataResult<Vec<JsonValue>> {
        tracing::debug!(table = %query.table, "GET rows");
        let request = self
            .request(Method::GET, &query.table)
            .await
            .query(&query.to_params());
        self.send_rows(request).await
    }

    async fn insert(&self, table: &str, rows: Vec<JsonValue>) -> DataResult<Vec<JsonValue>> {
        tracing::debug!(table = %table, rows = rows.len(), "POST rows");
        let request = self
            .request(Method::POST, table)
            .await
            .header("Prefer", "return=representation")
            .json(&rows);
        self.send_rows(request).await
    }

    async fn update(
        &self,
        table: &str,
        filters: Vec<Filter>,
        patch: JsonValue,
    ) -> DataResult<Vec<JsonValue>> {
        tracing::debug!(table = %table, "PATCH rows");
        let request = self
            .request(Method::PATCH, table)
            .await
            .query(&filter_params(&filters))
            .header("Prefer", "return=representation")
            .json(&patch);
        self.send_rows(request).await
    }

    async fn delete(&self, table: &str, filters: Vec<Filter>) -> DataResult<u64> {
        tracing::debug!(table = %table, "DELETE rows");
        let request = self
            .request(Method::DELETE, table)
            .await
            .query(&filter_params(&filters))
            .header("Prefer", "return=representation");
        Ok(self.send_rows(request).await?.len() as u64)
    }

    async fn upsert(&self, table: &str, row: JsonValue, on_conflict: &str) -> DataResult<JsonValue> {
        tracing::debug!(table = %table, on_conflict = %on_conflict, "UPSERT row");
        let request = self
            .request(Method::POST, table)
            .await
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[row]);
        self.send_rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DataError::Backend(format!("upsert into {} returned no row", table)))
    }

    async fn ping(&self) -> DataResult<()> {
        let response = self
            .client
            .get(format!("{}/rest/v1/", self.base))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .send()
            .await?;
        if response.status().is_server_error() {
            return Err(into_error(response).await);
        }
        Ok(())
    }
}

/// Auth API client
#[derive(Debug, Clone)]
pub struct RestAuth {
    client: Client,
    base: String,
    anon_key: String,
    service_key: Option<String>,
    session: SessionHandle,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: Identity,
}

impl RestAuth {
    pub fn new(config: &BackendConfig) -> DataResult<Self> {
        Self::with_session(config, Arc::new(RwLock::new(None)))
    }

    pub fn with_session(config: &BackendConfig, session: SessionHandle) -> DataResult<Self> {
        Ok(RestAuth {
            client: build_client(config)?,
            base: base_url(config),
            anon_key: config.anon_key.clone(),
            service_key: config.service_key.clone(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base, path)
    }

    async fn token(&self) -> Option<String> {
        self.session.read().await.clone()
    }

    async fn parse_identity(response: Response) -> DataResult<Identity> {
        let body: JsonValue = response.json().await?;
        // Sign-up answers with a session ({user: ...}) or the bare user.
        let user = body.get("user").cloned().unwrap_or(body);
        Ok(serde_json::from_value(user)?)
    }
}

#[async_trait]
impl AuthBackend for RestAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
        cancel: CancellationToken,
    ) -> DataResult<Session> {
        cancellable(&cancel, async {
            let response = self
                .client
                .post(self.url("token"))
                .query(&[("grant_type", "password")])
                .header("apikey", &self.anon_key)
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await?;

            match response.status() {
                status if status.is_success() => {}
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                    return Err(DataError::InvalidCredentials)
                }
                _ => return Err(into_error(response).await),
            }

            let token: TokenResponse = response.json().await?;
            *self.session.write().await = Some(token.access_token.clone());

            Ok(Session {
                access_token: token.access_token,
                identity: token.user,
            })
        })
        .await
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: JsonValue) -> DataResult<Identity> {
        let response = self
            .client
            .post(self.url("signup"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(into_error(response).await);
        }
        Self::parse_identity(response).await
    }

    async fn sign_out(&self) -> DataResult<()> {
        let Some(token) = self.token().await else {
            return Ok(());
        };

        let response = self
            .client
            .post(self.url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(into_error(response).await);
        }
        *self.session.write().await = None;
        Ok(())
    }

    async fn current_identity(&self, cancel: CancellationToken) -> DataResult<Option<Identity>> {
        let Some(token) = self.token().await else {
            return Ok(None);
        };

        cancellable(&cancel, async {
            let response = self
                .client
                .get(self.url("user"))
                .header("apikey", &self.anon_key)
                .bearer_auth(token)
                .send()
                .await?;

            match response.status() {
                status if status.is_success() => Ok(Some(response.json::<Identity>().await?)),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
                _ => Err(into_error(response).await),
            }
        })
        .await
    }

    async fn admin_create_user(
        &self,
        email: &str,
        password: &str,
        metadata: JsonValue,
    ) -> DataResult<Identity> {
        let service_key = self.service_key.as_ref().ok_or_else(|| {
            DataError::Backend("admin user creation requires SCHOOLHUB_SERVICE_KEY".to_string())
        })?;

        let response = self
            .client
            .post(self.url("admin/users"))
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .json(&json!({
                "email": email,
                "password": password,
                "email_confirm": true,
                "user_metadata": metadata,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(into_error(response).await);
        }
        Self::parse_identity(response).await
    }
}
