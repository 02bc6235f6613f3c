use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE: &str = "attend.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            professor_name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('present','absent','off')),
            marked_at TEXT NOT NULL,
            UNIQUE(user_id, subject_id, date),
            FOREIGN KEY(user_id) REFERENCES users(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_user ON attendance(user_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_subject ON attendance(subject_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_user_date ON attendance(user_id, date)",
        [],
    )?;

    // Single authoritative source for stat records. Recreated on open so the
    // definition tracks the binary. Off days never enter the denominator; a
    // subject with no valid days reads 0.
    conn.execute("DROP VIEW IF EXISTS attendance_stats", [])?;
    conn.execute(
        "CREATE VIEW attendance_stats AS
         SELECT user_id,
                subject_id,
                subject_name,
                professor_name,
                present_days,
                absent_days,
                off_days,
                total_days,
                CASE WHEN present_days + absent_days = 0 THEN 0.0
                     ELSE ROUND(present_days * 100.0 / (present_days + absent_days), 2)
                END AS attendance_percentage
         FROM (
            SELECT a.user_id AS user_id,
                   a.subject_id AS subject_id,
                   s.name AS subject_name,
                   s.professor_name AS professor_name,
                   SUM(CASE WHEN a.status = 'present' THEN 1 ELSE 0 END) AS present_days,
                   SUM(CASE WHEN a.status = 'absent' THEN 1 ELSE 0 END) AS absent_days,
                   SUM(CASE WHEN a.status = 'off' THEN 1 ELSE 0 END) AS off_days,
                   COUNT(*) AS total_days
            FROM attendance a
            JOIN subjects s ON s.id = a.subject_id
            GROUP BY a.user_id, a.subject_id
         )",
        [],
    )?;

    Ok(conn)
}

/// Local calendar date in the form stored on attendance rows.
pub fn today_string() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

pub fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn is_valid_date(raw: &str) -> bool {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}
