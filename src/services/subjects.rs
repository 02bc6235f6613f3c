use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::models::Subject;
use crate::services::ServiceError;

pub fn list(conn: &Connection) -> Result<Vec<Subject>, ServiceError> {
    let mut stmt = conn
        .prepare("SELECT id, name, professor_name FROM subjects ORDER BY name")
        .map_err(ServiceError::query)?;
    stmt.query_map([], |row| {
        Ok(Subject {
            id: row.get(0)?,
            name: row.get(1)?,
            professor_name: row.get(2)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(ServiceError::query)
}

pub fn create(
    conn: &Connection,
    name: &str,
    professor_name: &str,
) -> Result<Subject, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::bad_params("name must not be empty"));
    }
    let duplicate = conn
        .query_row("SELECT 1 FROM subjects WHERE name = ?", [name], |r| {
            r.get::<_, i64>(0)
        })
        .optional()
        .map_err(ServiceError::query)?
        .is_some();
    if duplicate {
        return Err(ServiceError::bad_params("a subject with that name exists"));
    }

    let subject = Subject {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        professor_name: professor_name.trim().to_string(),
    };
    conn.execute(
        "INSERT INTO subjects(id, name, professor_name) VALUES(?, ?, ?)",
        (&subject.id, &subject.name, &subject.professor_name),
    )
    .map_err(ServiceError::update)?;
    Ok(subject)
}

pub fn update(
    conn: &Connection,
    subject_id: &str,
    name: Option<&str>,
    professor_name: Option<&str>,
) -> Result<Subject, ServiceError> {
    if let Some(name) = name {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::bad_params("name must not be empty"));
        }
        conn.execute(
            "UPDATE subjects SET name = ? WHERE id = ?",
            (name, subject_id),
        )
        .map_err(ServiceError::update)?;
    }
    if let Some(professor_name) = professor_name {
        conn.execute(
            "UPDATE subjects SET professor_name = ? WHERE id = ?",
            (professor_name.trim(), subject_id),
        )
        .map_err(ServiceError::update)?;
    }

    conn.query_row(
        "SELECT id, name, professor_name FROM subjects WHERE id = ?",
        [subject_id],
        |row| {
            Ok(Subject {
                id: row.get(0)?,
                name: row.get(1)?,
                professor_name: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(ServiceError::query)?
    .ok_or_else(|| ServiceError::not_found("subject not found"))
}

/// Removes the subject together with its attendance rows.
pub fn delete(conn: &Connection, subject_id: &str) -> Result<(), ServiceError> {
    let tx = conn.unchecked_transaction().map_err(ServiceError::update)?;
    tx.execute("DELETE FROM attendance WHERE subject_id = ?", [subject_id])
        .map_err(ServiceError::update)?;
    let affected = tx
        .execute("DELETE FROM subjects WHERE id = ?", [subject_id])
        .map_err(ServiceError::update)?;
    tx.commit().map_err(ServiceError::update)?;
    if affected == 0 {
        return Err(ServiceError::not_found("subject not found"));
    }
    Ok(())
}
