use rusqlite::{Connection, OptionalExtension, Row};

use crate::models::StatRecord;
use crate::services::ServiceError;

fn stat_from_row(row: &Row<'_>) -> rusqlite::Result<StatRecord> {
    Ok(StatRecord {
        user_id: row.get(0)?,
        subject_id: row.get(1)?,
        subject_name: row.get(2)?,
        professor_name: row.get(3)?,
        present_days: row.get(4)?,
        absent_days: row.get(5)?,
        off_days: row.get(6)?,
        total_days: row.get(7)?,
        attendance_percentage: row.get(8)?,
    })
}

const STAT_COLUMNS: &str = "user_id, subject_id, subject_name, professor_name, \
                            present_days, absent_days, off_days, total_days, \
                            attendance_percentage";

/// Every stat record in the store, across users. The per-subject percentage
/// is computed by the view, never client-side.
pub fn fetch_all(conn: &Connection) -> Result<Vec<StatRecord>, ServiceError> {
    let sql = format!(
        "SELECT {STAT_COLUMNS} FROM attendance_stats ORDER BY subject_name, user_id"
    );
    let mut stmt = conn.prepare(&sql).map_err(ServiceError::query)?;
    stmt.query_map([], stat_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(ServiceError::query)
}

pub fn fetch_for_user(conn: &Connection, user_id: &str) -> Result<Vec<StatRecord>, ServiceError> {
    let sql = format!(
        "SELECT {STAT_COLUMNS} FROM attendance_stats WHERE user_id = ? ORDER BY subject_name"
    );
    let mut stmt = conn.prepare(&sql).map_err(ServiceError::query)?;
    stmt.query_map([user_id], stat_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(ServiceError::query)
}

/// The refreshed stat row for one cell, if any rows remain for it.
pub fn fetch_subject_stat(
    conn: &Connection,
    user_id: &str,
    subject_id: &str,
) -> Result<Option<StatRecord>, ServiceError> {
    let sql = format!(
        "SELECT {STAT_COLUMNS} FROM attendance_stats WHERE user_id = ? AND subject_id = ?"
    );
    conn.query_row(&sql, (user_id, subject_id), stat_from_row)
        .optional()
        .map_err(ServiceError::query)
}
