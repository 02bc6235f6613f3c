use rusqlite::{types::Value, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db;
use crate::models::{AttendanceRecord, AttendanceStatus};
use crate::services::ServiceError;

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    let status_raw: String = row.get(4)?;
    Ok(AttendanceRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        subject_id: row.get(2)?,
        date: row.get(3)?,
        status: AttendanceStatus::parse(&status_raw).unwrap_or(AttendanceStatus::Off),
        marked_at: row.get(5)?,
    })
}

const RECORD_COLUMNS: &str = "id, user_id, subject_id, date, status, marked_at";

fn subject_exists(conn: &Connection, subject_id: &str) -> Result<bool, ServiceError> {
    conn.query_row("SELECT 1 FROM subjects WHERE id = ?", [subject_id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
    .map_err(ServiceError::query)
}

/// Upsert on (user_id, subject_id, date). Re-marking an already marked cell
/// updates its status in place and keeps the original row id.
pub fn mark(
    conn: &Connection,
    user_id: &str,
    subject_id: &str,
    date: &str,
    status: AttendanceStatus,
) -> Result<AttendanceRecord, ServiceError> {
    if !subject_exists(conn, subject_id)? {
        return Err(ServiceError::not_found("subject not found"));
    }

    conn.execute(
        "INSERT INTO attendance(id, user_id, subject_id, date, status, marked_at)
         VALUES(?, ?, ?, ?, ?, ?)
         ON CONFLICT(user_id, subject_id, date) DO UPDATE SET
           status = excluded.status,
           marked_at = excluded.marked_at",
        (
            Uuid::new_v4().to_string(),
            user_id,
            subject_id,
            date,
            status.as_str(),
            db::now_stamp(),
        ),
    )
    .map_err(ServiceError::update)?;

    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM attendance
         WHERE user_id = ? AND subject_id = ? AND date = ?"
    );
    conn.query_row(&sql, (user_id, subject_id, date), record_from_row)
        .map_err(ServiceError::query)
}

/// Deletes one cell. Removing something that was never marked is an error the
/// caller surfaces, not a silent no-op.
pub fn remove(
    conn: &Connection,
    user_id: &str,
    subject_id: &str,
    date: &str,
) -> Result<(), ServiceError> {
    let affected = conn
        .execute(
            "DELETE FROM attendance WHERE user_id = ? AND subject_id = ? AND date = ?",
            (user_id, subject_id, date),
        )
        .map_err(ServiceError::update)?;
    if affected == 0 {
        return Err(ServiceError::not_found(
            "no attendance record for that subject and date",
        ));
    }
    Ok(())
}

pub fn for_date(
    conn: &Connection,
    user_id: &str,
    date: &str,
) -> Result<Vec<AttendanceRecord>, ServiceError> {
    let mut stmt = conn
        .prepare(
            "SELECT a.id, a.user_id, a.subject_id, a.date, a.status, a.marked_at
             FROM attendance a
             JOIN subjects s ON s.id = a.subject_id
             WHERE a.user_id = ? AND a.date = ?
             ORDER BY s.name",
        )
        .map_err(ServiceError::query)?;
    stmt.query_map((user_id, date), record_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(ServiceError::query)
}

/// Filtered history, newest first. All filters optional.
pub fn history(
    conn: &Connection,
    user_id: &str,
    subject_id: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Vec<AttendanceRecord>, ServiceError> {
    let mut sql = format!("SELECT {RECORD_COLUMNS} FROM attendance WHERE user_id = ?");
    let mut params: Vec<Value> = vec![Value::Text(user_id.to_string())];
    if let Some(subject_id) = subject_id {
        sql.push_str(" AND subject_id = ?");
        params.push(Value::Text(subject_id.to_string()));
    }
    if let Some(from) = from {
        sql.push_str(" AND date >= ?");
        params.push(Value::Text(from.to_string()));
    }
    if let Some(to) = to {
        sql.push_str(" AND date <= ?");
        params.push(Value::Text(to.to_string()));
    }
    sql.push_str(" ORDER BY date DESC, marked_at DESC");

    let mut stmt = conn.prepare(&sql).map_err(ServiceError::query)?;
    stmt.query_map(rusqlite::params_from_iter(params), record_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(ServiceError::query)
}

/// Wipes every attendance row for the user. Returns how many were deleted.
pub fn reset(conn: &Connection, user_id: &str) -> Result<usize, ServiceError> {
    conn.execute("DELETE FROM attendance WHERE user_id = ?", [user_id])
        .map_err(ServiceError::update)
}
