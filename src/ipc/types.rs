use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::state::{AttendanceSlice, StatsSlice};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub display_name: String,
}

/// Everything the daemon holds between requests: the open workspace, the
/// signed-in user, and the two state slices the UI reads back.
#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub session: Option<Session>,
    pub attendance: AttendanceSlice,
    pub stats: StatsSlice,
}

impl AppState {
    pub fn reset_slices(&mut self) {
        self.attendance = AttendanceSlice::default();
        self.stats = StatsSlice::default();
    }
}
