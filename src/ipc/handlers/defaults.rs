use serde_json::json;

use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

const DEFAULTS_KEY: &str = "defaults";
const KNOWN_FIELDS: [&str; 2] = ["defaultTurma", "defaultProfessor"];

/// Remembered selection-form defaults (turma, professor), the replacement
/// for the original app's localStorage keys.
fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match db::settings_get_json(conn, DEFAULTS_KEY) {
        Ok(v) => ok(&req.id, v.unwrap_or_else(|| json!({}))),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:?}"), None),
    }
}

fn handle_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(incoming) = req.params.as_object() else {
        return err(&req.id, "bad_params", "params must be an object", None);
    };

    let mut merged = match db::settings_get_json(conn, DEFAULTS_KEY) {
        Ok(v) => v.unwrap_or_else(|| json!({})),
        Err(e) => return err(&req.id, "db_query_failed", format!("{e:?}"), None),
    };
    for field in KNOWN_FIELDS {
        if let Some(v) = incoming.get(field) {
            if v.is_null() {
                if let Some(m) = merged.as_object_mut() {
                    m.remove(field);
                }
            } else {
                merged[field] = v.clone();
            }
        }
    }

    match db::settings_set_json(conn, DEFAULTS_KEY, &merged) {
        Ok(()) => ok(&req.id, merged),
        Err(e) => err(&req.id, "db_update_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "defaults.get" => Some(handle_get(state, req)),
        "defaults.set" => Some(handle_set(state, req)),
        _ => None,
    }
}
