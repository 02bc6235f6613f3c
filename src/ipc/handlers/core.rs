use serde_json::json;
use std::path::PathBuf;
use uuid::Uuid;

use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request, Session};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "userId": state.session.as_ref().map(|s| s.user_id.clone()),
            "displayName": state.session.as_ref().map(|s| s.display_name.clone()),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = path else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match db::open_db(&path) {
        Ok(conn) => {
            state.workspace = Some(path.clone());
            state.db = Some(conn);
            // User ids are workspace-scoped; a switch drops the session and
            // every cached result.
            state.session = None;
            state.reset_slices();
            ok(&req.id, json!({ "workspacePath": path.to_string_lossy() }))
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn handle_sign_in(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let display_name = match req.params.get("displayName").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing displayName", None),
    };
    let user_id = req
        .params
        .get("userId")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let upsert = conn.execute(
        "INSERT INTO users(id, display_name) VALUES(?, ?)
         ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name",
        (&user_id, &display_name),
    );
    if let Err(e) = upsert {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }

    state.session = Some(Session {
        user_id: user_id.clone(),
        display_name: display_name.clone(),
    });
    // A different user must not see the previous user's cached lists.
    state.reset_slices();

    ok(
        &req.id,
        json!({ "userId": user_id, "displayName": display_name }),
    )
}

fn handle_sign_out(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session = None;
    state.reset_slices();
    ok(&req.id, json!({ "signedOut": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "session.signIn" => Some(handle_sign_in(state, req)),
        "session.signOut" => Some(handle_sign_out(state, req)),
        _ => None,
    }
}
