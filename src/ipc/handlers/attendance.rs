use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::db;
use crate::ipc::error::{err, ok, service_err};
use crate::ipc::types::{AppState, Request};
use crate::models::{AttendanceRecord, AttendanceStatus};
use crate::services;
use crate::state::{AttendanceOp, AttendanceSlice, StatsOp, StatsSlice};

pub(super) fn to_value<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

fn parse_date_param(params: &serde_json::Value, key: &str) -> Result<String, String> {
    match params.get(key).and_then(|v| v.as_str()) {
        None => Ok(db::today_string()),
        Some(raw) if db::is_valid_date(raw) => Ok(raw.to_string()),
        Some(raw) => Err(format!("{key} must be YYYY-MM-DD, got {raw}")),
    }
}

/// Post-mutation refetch of today's records and the stats cache. Failures
/// land in the slice error cells; they never fail the mutation that
/// triggered them.
pub(super) fn refresh_after_mutation(
    conn: &Connection,
    attendance: &mut AttendanceSlice,
    stats: &mut StatsSlice,
    user_id: &str,
) {
    if let Some(date) = attendance.today_date.clone() {
        attendance.begin(AttendanceOp::FetchToday);
        match services::attendance::for_date(conn, user_id, &date) {
            Ok(records) => {
                attendance.today = records;
                attendance.fulfill(AttendanceOp::FetchToday);
            }
            Err(e) => attendance.reject(AttendanceOp::FetchToday, e.message),
        }
    }

    stats.begin(StatsOp::FetchAll);
    match services::stats::fetch_all(conn) {
        Ok(records) => {
            stats.records = records;
            stats.fulfill(StatsOp::FetchAll);
        }
        Err(e) => stats.reject(StatsOp::FetchAll, e.message),
    }
}

fn handle_mark(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.clone() else {
        return err(
            &req.id,
            "not_authenticated",
            "sign in to mark attendance",
            None,
        );
    };

    let Some(subject_id) = req.params.get("subjectId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing subjectId", None);
    };
    let status = match req.params.get("status").and_then(|v| v.as_str()) {
        Some(raw) => match AttendanceStatus::parse(raw) {
            Some(s) => s,
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "status must be present, absent or off",
                    None,
                )
            }
        },
        None => return err(&req.id, "bad_params", "missing status", None),
    };
    let date = match parse_date_param(&req.params, "date") {
        Ok(d) => d,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let subject_id = subject_id.to_string();

    // Optimistic update: if the cell belongs to the cached today view, show
    // it before the store confirms. A failure below rolls this back.
    let optimistic = state.attendance.today_date.as_deref() == Some(date.as_str());
    let mut displaced = None;
    if optimistic {
        let provisional = AttendanceRecord {
            id: Uuid::new_v4().to_string(),
            user_id: session.user_id.clone(),
            subject_id: subject_id.clone(),
            date: date.clone(),
            status,
            marked_at: db::now_stamp(),
        };
        displaced = state.attendance.upsert_today(provisional);
    }

    state.attendance.begin(AttendanceOp::Mark);
    match services::attendance::mark(conn, &session.user_id, &subject_id, &date, status) {
        Ok(record) => {
            state.attendance.fulfill(AttendanceOp::Mark);
            if optimistic {
                // Replace the provisional entry with the authoritative row.
                state.attendance.upsert_today(record.clone());
            }
            // The mutating call returns the updated aggregate for its
            // subject, so the UI never has to guess at a stale percentage.
            let stat = services::stats::fetch_subject_stat(conn, &session.user_id, &subject_id)
                .unwrap_or_default();
            refresh_after_mutation(
                conn,
                &mut state.attendance,
                &mut state.stats,
                &session.user_id,
            );
            ok(
                &req.id,
                json!({
                    "record": to_value(&record),
                    "stat": stat.as_ref().map(to_value),
                }),
            )
        }
        Err(e) => {
            state.attendance.reject(AttendanceOp::Mark, e.message.clone());
            if optimistic {
                state
                    .attendance
                    .rollback_today(&session.user_id, &subject_id, &date, displaced);
            }
            service_err(&req.id, &e)
        }
    }
}

fn handle_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.clone() else {
        return err(
            &req.id,
            "not_authenticated",
            "sign in to remove attendance",
            None,
        );
    };
    let Some(subject_id) = req.params.get("subjectId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing subjectId", None);
    };
    let date = match parse_date_param(&req.params, "date") {
        Ok(d) => d,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    state.attendance.begin(AttendanceOp::Remove);
    match services::attendance::remove(conn, &session.user_id, subject_id, &date) {
        Ok(()) => {
            state.attendance.fulfill(AttendanceOp::Remove);
            state
                .attendance
                .remove_today(&session.user_id, subject_id, &date);
            state
                .attendance
                .remove_history(&session.user_id, subject_id, &date);
            refresh_after_mutation(
                conn,
                &mut state.attendance,
                &mut state.stats,
                &session.user_id,
            );
            ok(&req.id, json!({ "removed": true }))
        }
        Err(e) => {
            state
                .attendance
                .reject(AttendanceOp::Remove, e.message.clone());
            service_err(&req.id, &e)
        }
    }
}

fn handle_today(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.clone() else {
        return err(&req.id, "not_authenticated", "sign in first", None);
    };
    let date = match parse_date_param(&req.params, "date") {
        Ok(d) => d,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    state.attendance.begin(AttendanceOp::FetchToday);
    match services::attendance::for_date(conn, &session.user_id, &date) {
        Ok(records) => {
            state.attendance.today_date = Some(date.clone());
            state.attendance.today = records.clone();
            state.attendance.fulfill(AttendanceOp::FetchToday);
            ok(
                &req.id,
                json!({ "date": date, "records": to_value(&records) }),
            )
        }
        Err(e) => {
            state
                .attendance
                .reject(AttendanceOp::FetchToday, e.message.clone());
            service_err(&req.id, &e)
        }
    }
}

fn handle_history(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.clone() else {
        return err(&req.id, "not_authenticated", "sign in first", None);
    };
    let subject_id = req
        .params
        .get("subjectId")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let mut bounds = [None, None];
    for (slot, key) in bounds.iter_mut().zip(["from", "to"]) {
        if let Some(raw) = req.params.get(key).and_then(|v| v.as_str()) {
            if !db::is_valid_date(raw) {
                return err(
                    &req.id,
                    "bad_params",
                    format!("{key} must be YYYY-MM-DD, got {raw}"),
                    None,
                );
            }
            *slot = Some(raw.to_string());
        }
    }
    let [from, to] = bounds;

    state.attendance.begin(AttendanceOp::FetchHistory);
    match services::attendance::history(
        conn,
        &session.user_id,
        subject_id.as_deref(),
        from.as_deref(),
        to.as_deref(),
    ) {
        Ok(records) => {
            state.attendance.history = records.clone();
            state.attendance.fulfill(AttendanceOp::FetchHistory);
            ok(&req.id, json!({ "records": to_value(&records) }))
        }
        Err(e) => {
            state
                .attendance
                .reject(AttendanceOp::FetchHistory, e.message.clone());
            service_err(&req.id, &e)
        }
    }
}

fn handle_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.clone() else {
        return err(
            &req.id,
            "not_authenticated",
            "sign in to reset attendance",
            None,
        );
    };

    state.attendance.begin(AttendanceOp::Reset);
    match services::attendance::reset(conn, &session.user_id) {
        Ok(removed) => {
            state.attendance.fulfill(AttendanceOp::Reset);
            state.attendance.today.clear();
            state.attendance.history.clear();
            refresh_after_mutation(
                conn,
                &mut state.attendance,
                &mut state.stats,
                &session.user_id,
            );
            ok(&req.id, json!({ "removed": removed }))
        }
        Err(e) => {
            state
                .attendance
                .reject(AttendanceOp::Reset, e.message.clone());
            service_err(&req.id, &e)
        }
    }
}

fn handle_state(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, to_value(&state.attendance))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.mark" => Some(handle_mark(state, req)),
        "attendance.remove" => Some(handle_remove(state, req)),
        "attendance.today" => Some(handle_today(state, req)),
        "attendance.history" => Some(handle_history(state, req)),
        "attendance.reset" => Some(handle_reset(state, req)),
        "attendance.state" => Some(handle_state(state, req)),
        _ => None,
    }
}
