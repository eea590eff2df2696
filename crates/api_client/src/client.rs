//! Test case HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required).

use std::time::Duration;

use casegrid_core::RecordId;
use casegrid_engine::RecordStore;
use serde_json::{Map, Value};

use crate::auth::{AuthCredentials, CredentialStore};

/// Test case API client (blocking).
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::blocking::Client,
    api_base: String,
    token: String,
}

/// Error type for API operations.
#[derive(Debug)]
pub enum ApiError {
    /// No auth credentials configured
    NotAuthenticated,
    /// Network error
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// JSON parsing error
    Parse(String),
    /// Server rejected the request body (400/422)
    Validation(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotAuthenticated => write!(f, "Not authenticated, run `casegrid login` first"),
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            ApiError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ApiError::Validation(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiClient {
    /// Create a new client using saved auth credentials.
    pub fn from_saved_auth(timeout: Duration) -> Result<Self, ApiError> {
        let creds = CredentialStore::user()
            .and_then(|store| store.load())
            .ok_or(ApiError::NotAuthenticated)?;
        Self::new(creds, timeout)
    }

    /// Create a new client with explicit credentials.
    pub fn new(creds: AuthCredentials, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("casegrid/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: creds.api_base.trim_end_matches('/').to_string(),
            token: creds.token,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// List a team's test cases.
    pub fn list_records(&self, team_id: &str) -> Result<Vec<Value>, ApiError> {
        let url = format!("{}/api/testcases/", self.api_base);
        let response = self.http.get(&url)
            .bearer_auth(&self.token)
            .query(&[("team_id", team_id)])
            .send()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let json: Value = check_status(response)?
            .json()
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        records_from_json(json)
    }

    /// Partially update one test case, returning the full record.
    pub fn update_record(
        &self,
        id: &RecordId,
        payload: &Map<String, Value>,
    ) -> Result<Map<String, Value>, ApiError> {
        let url = format!("{}/api/testcases/{}/", self.api_base, id);
        let response = self.http.put(&url)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let json: Value = check_status(response)?
            .json()
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        match json {
            Value::Object(record) => Ok(record),
            _ => Err(ApiError::Parse("Expected a test case object".into())),
        }
    }
}

impl RecordStore for ApiClient {
    type Error = ApiError;

    fn update_record(
        &self,
        id: &RecordId,
        payload: &Map<String, Value>,
    ) -> Result<Map<String, Value>, ApiError> {
        ApiClient::update_record(self, id, payload)
    }
}

/// Unwrap a record list: a bare array or a paginated `{ "results": [...] }` envelope.
pub fn records_from_json(json: Value) -> Result<Vec<Value>, ApiError> {
    match json {
        Value::Array(records) => Ok(records),
        Value::Object(mut envelope) => match envelope.remove("results") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(ApiError::Parse("Missing results in response".into())),
        },
        _ => Err(ApiError::Parse("Expected a list of test cases".into())),
    }
}

fn check_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, ApiError> {
    let status = response.status().as_u16();
    if response.status().is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    match status {
        401 | 403 => Err(ApiError::NotAuthenticated),
        400 | 422 => Err(ApiError::Validation(error_message(&body))),
        _ => Err(ApiError::Http(status, error_message(&body))),
    }
}

/// Readable message from an error body.
///
/// `{"detail": "..."}` gives the detail; field errors such as
/// `{"title": ["too long"]}` become `title: too long`. Anything else is
/// returned as-is.
fn error_message(body: &str) -> String {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    if let Some(Value::String(detail)) = map.get("detail") {
        return detail.clone();
    }

    let parts: Vec<String> = map
        .iter()
        .map(|(field, errors)| {
            let text = match errors {
                Value::Array(items) => items
                    .iter()
                    .map(|v| v.as_str().map(String::from).unwrap_or_else(|| v.to_string()))
                    .collect::<Vec<_>>()
                    .join(", "),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}: {}", field, text)
        })
        .collect();
    if parts.is_empty() {
        body.trim().to_string()
    } else {
        parts.join("; ")
    }
}
