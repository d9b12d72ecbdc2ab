use serde_json::json;
use tracing::debug;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{PeriodMarks, PeriodStatus, SessionParams};
use crate::queue::OfflineQueue;
use crate::session::{AttendanceSession, FinishOutcome, SessionError, SessionEvent};

struct HandlerErr {
    code: &'static str,
    message: String,
}

impl HandlerErr {
    fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, None)
    }
}

impl From<SessionError> for HandlerErr {
    fn from(e: SessionError) -> Self {
        HandlerErr {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: format!("missing {}", key),
        })
}

/// `periodos` is a map `"1" | "2" | "3" -> status wire string`. Absent
/// entries stay unset and later default to Presente; an unknown status
/// string is rejected rather than defaulted.
fn parse_marks(params: &serde_json::Value) -> Result<PeriodMarks, HandlerErr> {
    let mut marks = PeriodMarks::default();
    let Some(raw) = params.get("periodos") else {
        return Ok(marks);
    };
    if raw.is_null() {
        return Ok(marks);
    }
    let Some(map) = raw.as_object() else {
        return Err(HandlerErr {
            code: "bad_params",
            message: "periodos must be an object".to_string(),
        });
    };
    for (period, value) in map {
        let status: PeriodStatus =
            serde_json::from_value(value.clone()).map_err(|_| HandlerErr {
                code: "bad_params",
                message: format!("invalid status for periodo {}: {}", period, value),
            })?;
        match period.as_str() {
            "1" => marks.period1 = Some(status),
            "2" => marks.period2 = Some(status),
            "3" => marks.period3 = Some(status),
            other => {
                return Err(HandlerErr {
                    code: "bad_params",
                    message: format!("unknown periodo: {}", other),
                })
            }
        }
    }
    Ok(marks)
}

fn parse_note(params: &serde_json::Value) -> String {
    params
        .get("observacao")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn start(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let session_params = SessionParams {
        teacher_id: get_required_str(params, "professorId")?,
        class_id: get_required_str(params, "turmaId")?,
        subject_id: get_required_str(params, "disciplinaId")?,
        date: get_required_str(params, "data")?,
    };
    let api = state.api.as_ref().ok_or(HandlerErr {
        code: "no_workspace",
        message: "select a workspace first".to_string(),
    })?;

    let mut session = AttendanceSession::new(session_params)?;
    session.subscribe(Box::new(|event| match event {
        SessionEvent::SessionStarted { total } => debug!(total, "sessionStarted"),
        SessionEvent::StudentChanged { index } => debug!(index, "studentChanged"),
        SessionEvent::SessionFinished { queued } => debug!(queued, "sessionFinished"),
    }));
    session.load_roster(api)?;

    let view = session.view();
    state.session = Some(session);
    Ok(serde_json::to_value(view).unwrap_or_else(|_| json!({})))
}

fn with_session<'s>(state: &'s mut AppState) -> Result<&'s mut AttendanceSession, HandlerErr> {
    state.session.as_mut().ok_or(HandlerErr {
        code: "no_session",
        message: "no attendance session in progress".to_string(),
    })
}

fn current(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let session = with_session(state)?;
    Ok(serde_json::to_value(session.view()).unwrap_or_else(|_| json!({})))
}

fn record(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let marks = parse_marks(params)?;
    let note = parse_note(params);
    let session = with_session(state)?;
    session.record_and_advance(marks, &note)?;
    Ok(serde_json::to_value(session.view()).unwrap_or_else(|_| json!({})))
}

fn back(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let session = with_session(state)?;
    session.go_back()?;
    Ok(serde_json::to_value(session.view()).unwrap_or_else(|_| json!({})))
}

fn cancel(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let session = with_session(state)?;
    session.cancel();
    state.session = None;
    Ok(json!({ "cancelled": true }))
}

fn finish(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let marks = parse_marks(params)?;
    let note = parse_note(params);
    let Some(session) = state.session.as_mut() else {
        return Err(HandlerErr {
            code: "no_session",
            message: "no attendance session in progress".to_string(),
        });
    };
    let Some(api) = state.api.as_ref() else {
        return Err(HandlerErr {
            code: "no_workspace",
            message: "select a workspace first".to_string(),
        });
    };
    let Some(conn) = state.db.as_ref() else {
        return Err(HandlerErr {
            code: "no_workspace",
            message: "select a workspace first".to_string(),
        });
    };

    let queue = OfflineQueue::new(conn);
    let outcome = session.finish(marks, &note, api, &queue)?;
    state.session = None;

    Ok(match outcome {
        FinishOutcome::Submitted { count } => json!({ "queued": false, "count": count }),
        FinishOutcome::Queued { count } => json!({ "queued": true, "count": count }),
    })
}

fn run(
    req: &Request,
    result: Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    match result {
        Ok(value) => ok(&req.id, value),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.start" => Some(run(req, start(state, &req.params))),
        "session.current" => Some(run(req, current(state))),
        "session.record" => Some(run(req, record(state, &req.params))),
        "session.back" => Some(run(req, back(state))),
        "session.cancel" => Some(run(req, cancel(state))),
        "session.finish" => Some(run(req, finish(state, &req.params))),
        _ => None,
    }
}
