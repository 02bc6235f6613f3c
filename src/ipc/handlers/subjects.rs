use serde_json::json;

use super::attendance::{refresh_after_mutation, to_value};
use crate::ipc::error::{err, ok, service_err};
use crate::ipc::types::{AppState, Request};
use crate::services;

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "subjects": [] }));
    };
    match services::subjects::list(conn) {
        Ok(subjects) => ok(&req.id, json!({ "subjects": to_value(&subjects) })),
        Err(e) => service_err(&req.id, &e),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if state.session.is_none() {
        return err(&req.id, "not_authenticated", "sign in first", None);
    }
    let Some(name) = req.params.get("name").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing name", None);
    };
    let professor_name = req
        .params
        .get("professorName")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    match services::subjects::create(conn, name, professor_name) {
        Ok(subject) => ok(
            &req.id,
            json!({ "subjectId": subject.id, "subject": to_value(&subject) }),
        ),
        Err(e) => service_err(&req.id, &e),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if state.session.is_none() {
        return err(&req.id, "not_authenticated", "sign in first", None);
    }
    let Some(subject_id) = req.params.get("subjectId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing subjectId", None);
    };
    let name = req.params.get("name").and_then(|v| v.as_str());
    let professor_name = req.params.get("professorName").and_then(|v| v.as_str());

    match services::subjects::update(conn, subject_id, name, professor_name) {
        Ok(subject) => ok(&req.id, json!({ "subject": to_value(&subject) })),
        Err(e) => service_err(&req.id, &e),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(session) = state.session.clone() else {
        return err(&req.id, "not_authenticated", "sign in first", None);
    };
    let Some(subject_id) = req.params.get("subjectId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing subjectId", None);
    };

    match services::subjects::delete(conn, subject_id) {
        Ok(()) => {
            // The subject's rows are gone; cached lists and stats must not
            // keep showing them.
            state.attendance.today.retain(|r| r.subject_id != subject_id);
            state
                .attendance
                .history
                .retain(|r| r.subject_id != subject_id);
            refresh_after_mutation(
                conn,
                &mut state.attendance,
                &mut state.stats,
                &session.user_id,
            );
            ok(&req.id, json!({ "deleted": true }))
        }
        Err(e) => service_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.list" => Some(handle_list(state, req)),
        "subjects.create" => Some(handle_create(state, req)),
        "subjects.update" => Some(handle_update(state, req)),
        "subjects.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
