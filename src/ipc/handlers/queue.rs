use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::queue::OfflineQueue;

fn handle_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let queue = OfflineQueue::new(conn);
    match queue.pending() {
        Ok(batches) => {
            let summaries: Vec<serde_json::Value> = batches
                .iter()
                .map(|b| {
                    json!({
                        "id": b.id,
                        "enqueuedAt": b.enqueued_at,
                        "records": b.records.len(),
                    })
                })
                .collect();
            ok(&req.id, json!({ "pending": summaries }))
        }
        Err(e) => err(&req.id, "db_query_failed", format!("{e:?}"), None),
    }
}

/// Replays pending batches against the backend. Invoked by the host when
/// connectivity comes back; there is no internal retry timer.
fn handle_drain(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(api) = state.api.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let queue = OfflineQueue::new(conn);
    match queue.drain(api) {
        Ok(report) => ok(
            &req.id,
            json!({
                "delivered": report.delivered,
                "remaining": report.remaining,
            }),
        ),
        Err(e) => err(&req.id, "db_update_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "queue.status" => Some(handle_status(state, req)),
        "queue.drain" => Some(handle_drain(state, req)),
        _ => None,
    }
}
