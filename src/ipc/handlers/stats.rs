use rusqlite::Connection;
use serde_json::json;

use super::attendance::to_value;
use crate::ipc::error::{err, ok, service_err};
use crate::ipc::types::{AppState, Request};
use crate::models::StatRecord;
use crate::services::{self, ServiceError};
use crate::state::{StatsOp, StatsSlice};

/// Fetches the full stat set through the slice so the cache and the flags
/// stay honest for whichever operation asked.
fn fetch_records(conn: &Connection, slice: &mut StatsSlice) -> Result<Vec<StatRecord>, ServiceError> {
    slice.begin(StatsOp::FetchAll);
    match services::stats::fetch_all(conn) {
        Ok(records) => {
            slice.records = records.clone();
            slice.fulfill(StatsOp::FetchAll);
            Ok(records)
        }
        Err(e) => {
            slice.reject(StatsOp::FetchAll, e.message.clone());
            Err(e)
        }
    }
}

fn parse_threshold(params: &serde_json::Value, default: f64) -> Result<f64, String> {
    match params.get("threshold") {
        None => Ok(default),
        Some(v) => match v.as_f64() {
            Some(t) if t > 0.0 && t <= 100.0 => Ok(t),
            _ => Err("threshold must be a number in (0, 100]".to_string()),
        },
    }
}

fn handle_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match fetch_records(conn, &mut state.stats) {
        Ok(records) => ok(&req.id, json!({ "records": to_value(&records) })),
        Err(e) => service_err(&req.id, &e),
    }
}

fn handle_subject_wise(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match fetch_records(conn, &mut state.stats) {
        Ok(records) => {
            let groups = crate::stats::subject_wise(&records);
            ok(&req.id, json!({ "groups": to_value(&groups) }))
        }
        Err(e) => service_err(&req.id, &e),
    }
}

fn handle_professor_wise(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match fetch_records(conn, &mut state.stats) {
        Ok(records) => {
            let groups = crate::stats::professor_wise(&records);
            ok(&req.id, json!({ "groups": to_value(&groups) }))
        }
        Err(e) => service_err(&req.id, &e),
    }
}

fn handle_low(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let threshold = match parse_threshold(&req.params, 75.0) {
        Ok(t) => t,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match fetch_records(conn, &mut state.stats) {
        Ok(records) => {
            let below = crate::stats::below_threshold(&records, threshold);
            ok(
                &req.id,
                json!({ "threshold": threshold, "records": to_value(&below) }),
            )
        }
        Err(e) => service_err(&req.id, &e),
    }
}

fn handle_high(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let threshold = match parse_threshold(&req.params, 90.0) {
        Ok(t) => t,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match fetch_records(conn, &mut state.stats) {
        Ok(records) => {
            let above = crate::stats::at_or_above_threshold(&records, threshold);
            ok(
                &req.id,
                json!({ "threshold": threshold, "records": to_value(&above) }),
            )
        }
        Err(e) => service_err(&req.id, &e),
    }
}

fn handle_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.clone() else {
        return err(&req.id, "not_authenticated", "sign in first", None);
    };
    let target = match req.params.get("target") {
        None => 75.0,
        Some(v) => match v.as_f64() {
            Some(t) if t > 0.0 && t <= 100.0 => t,
            _ => return err(&req.id, "bad_params", "target must be in (0, 100]", None),
        },
    };

    state.stats.begin(StatsOp::Summarize);
    match services::stats::fetch_for_user(conn, &session.user_id) {
        Ok(records) => {
            let summary = crate::stats::user_summary(&records, target);
            state.stats.summary = Some(summary.clone());
            state.stats.fulfill(StatsOp::Summarize);
            ok(&req.id, to_value(&summary))
        }
        Err(e) => {
            state.stats.reject(StatsOp::Summarize, e.message.clone());
            service_err(&req.id, &e)
        }
    }
}

fn handle_state(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, to_value(&state.stats))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "stats.all" => Some(handle_all(state, req)),
        "stats.subjectWise" => Some(handle_subject_wise(state, req)),
        "stats.professorWise" => Some(handle_professor_wise(state, req)),
        "stats.lowAttendance" => Some(handle_low(state, req)),
        "stats.highAttendance" => Some(handle_high(state, req)),
        "stats.summary" => Some(handle_summary(state, req)),
        "stats.state" => Some(handle_state(state, req)),
        _ => None,
    }
}
