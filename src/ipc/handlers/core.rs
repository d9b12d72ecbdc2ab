use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use crate::api::ApiClient;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "apiUrl": state.api.as_ref().map(|a| a.base_url().to_string()),
        }),
    )
}

/// Opens (or creates) the local workspace database and wires the backend
/// client. The endpoint URL is persisted in settings so later runs may
/// omit it.
fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let conn = match db::open_db(&path) {
        Ok(conn) => conn,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
    };

    let api_url = match req.params.get("apiUrl").and_then(|v| v.as_str()) {
        Some(url) if !url.trim().is_empty() => {
            let url = url.trim().to_string();
            if let Err(e) = db::settings_set_json(&conn, "api_url", &json!(url)) {
                return err(&req.id, "db_update_failed", format!("{e:?}"), None);
            }
            Some(url)
        }
        _ => match db::settings_get_json(&conn, "api_url") {
            Ok(v) => v.and_then(|v| v.as_str().map(|s| s.to_string())),
            Err(e) => return err(&req.id, "db_query_failed", format!("{e:?}"), None),
        },
    };
    let Some(api_url) = api_url else {
        return err(
            &req.id,
            "config_missing",
            "apiUrl was never configured for this workspace",
            None,
        );
    };

    info!(workspace = %path.display(), "workspace selected");
    state.workspace = Some(path.clone());
    state.db = Some(conn);
    state.api = Some(ApiClient::new(api_url.clone()));
    state.session = None;

    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "apiUrl": api_url,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
