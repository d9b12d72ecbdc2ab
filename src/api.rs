use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::model::{AttendanceRecord, Student};

/// Failures from the backend endpoint. Callers never see the raw HTTP
/// response: either the envelope's `data` comes back unwrapped, or one of
/// these.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Envelope arrived with `status: "error"`.
    #[error("erro do servidor: {0}")]
    Server(String),
    /// Non-2xx HTTP status, network failure, or an undecodable body.
    #[error("erro na requisicao: {0}")]
    Transport(String),
}

/// Uniform response envelope used by every backend action.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub status: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub message: Option<String>,
}

pub fn unwrap_envelope(envelope: Envelope) -> Result<Value, ApiError> {
    if envelope.status == "error" {
        return Err(ApiError::Server(
            envelope.message.unwrap_or_else(|| "erro desconhecido".to_string()),
        ));
    }
    Ok(envelope.data)
}

/// Roster fetch seam the session depends on.
pub trait RosterProvider {
    fn roster(&self, class_id: &str) -> Result<Vec<Student>, ApiError>;
}

/// Batch submission seam shared by the session and the offline queue.
pub trait BatchSink {
    fn submit(&self, records: &[AttendanceRecord]) -> Result<(), ApiError>;
}

/// Client for the single spreadsheet-backend web app endpoint.
pub struct ApiClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            // Redirects must be followed; the web app answers via 302.
            http: reqwest::blocking::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET with `action` plus flat key/value query parameters.
    pub fn get(&self, action: &str, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        debug!(action, "GET {}", self.base_url);
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("action", action)])
            .query(params)
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::decode(response)
    }

    /// POST with a JSON body `{action, data}`.
    pub fn post(&self, action: &str, data: Value) -> Result<Value, ApiError> {
        debug!(action, "POST {}", self.base_url);
        let response = self
            .http
            .post(&self.base_url)
            .json(&json!({ "action": action, "data": data }))
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::decode(response)
    }

    fn decode(response: reqwest::blocking::Response) -> Result<Value, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Transport(format!(
                "{} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )));
        }
        let envelope: Envelope = response
            .json()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        unwrap_envelope(envelope)
    }

    // --- typed wrappers over the backend actions ---

    pub fn turmas(&self) -> Result<Value, ApiError> {
        self.get("getTurmas", &[])
    }

    pub fn disciplinas(&self) -> Result<Value, ApiError> {
        self.get("getDisciplinas", &[])
    }

    pub fn professores(&self) -> Result<Value, ApiError> {
        self.get("getProfessores", &[])
    }

    pub fn relatorio(&self, tipo: &str, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        let mut all = vec![("tipo", tipo)];
        all.extend_from_slice(params);
        self.get("getRelatorio", &all)
    }
}

impl RosterProvider for ApiClient {
    fn roster(&self, class_id: &str) -> Result<Vec<Student>, ApiError> {
        let data = self.get("getAlunos", &[("turmaId", class_id)])?;
        serde_json::from_value(data).map_err(|e| ApiError::Transport(e.to_string()))
    }
}

impl BatchSink for ApiClient {
    fn submit(&self, records: &[AttendanceRecord]) -> Result<(), ApiError> {
        let data = serde_json::to_value(records).map_err(|e| ApiError::Transport(e.to_string()))?;
        self.post("salvarChamadasEmLote", data)?;
        Ok(())
    }
}
