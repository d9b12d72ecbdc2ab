use crate::api::{ApiClient, ApiError};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

fn api_err_code(e: &ApiError) -> &'static str {
    match e {
        ApiError::Server(_) => "server_error",
        ApiError::Transport(_) => "transport_error",
    }
}

fn respond(id: &str, result: Result<serde_json::Value, ApiError>) -> serde_json::Value {
    match result {
        Ok(data) => ok(id, data),
        Err(e) => err(id, api_err_code(&e), e.to_string(), None),
    }
}

fn with_api<'s>(state: &'s AppState, req: &Request) -> Result<&'s ApiClient, serde_json::Value> {
    state
        .api
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

fn handle_reports_fetch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let api = match with_api(state, req) {
        Ok(api) => api,
        Err(resp) => return resp,
    };
    let Some(tipo) = req.params.get("tipo").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing tipo", None);
    };
    let mut extra: Vec<(String, String)> = Vec::new();
    if let Some(obj) = req.params.get("params").and_then(|v| v.as_object()) {
        for (k, v) in obj {
            let value = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            extra.push((k.clone(), value));
        }
    }
    let extra_refs: Vec<(&str, &str)> = extra
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    respond(&req.id, api.relatorio(tipo, &extra_refs))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "lists.turmas" => {
            let api = match with_api(state, req) {
                Ok(api) => api,
                Err(resp) => return Some(resp),
            };
            Some(respond(&req.id, api.turmas()))
        }
        "lists.disciplinas" => {
            let api = match with_api(state, req) {
                Ok(api) => api,
                Err(resp) => return Some(resp),
            };
            Some(respond(&req.id, api.disciplinas()))
        }
        "lists.professores" => {
            let api = match with_api(state, req) {
                Ok(api) => api,
                Err(resp) => return Some(resp),
            };
            Some(respond(&req.id, api.professores()))
        }
        "reports.fetch" => Some(handle_reports_fetch(state, req)),
        _ => None,
    }
}
