use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::api::ApiClient;
use crate::session::AttendanceSession;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything the sidecar holds between requests. Constructed once in
/// main and passed down explicitly; there are no globals.
#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub api: Option<ApiClient>,
    pub session: Option<AttendanceSession>,
}
