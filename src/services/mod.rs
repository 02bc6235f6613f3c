pub mod attendance;
pub mod stats;
pub mod subjects;

/// Uniform failure shape for every domain operation: a stable code the UI can
/// branch on plus a human-readable message. Errors never propagate past the
/// request boundary; handlers flatten them into the response envelope and the
/// slice error cells.
#[derive(Debug, Clone)]
pub struct ServiceError {
    pub code: &'static str,
    pub message: String,
}

impl ServiceError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        ServiceError {
            code,
            message: message.into(),
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        ServiceError::new("bad_params", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::new("not_found", message)
    }

    pub fn query(err: rusqlite::Error) -> Self {
        ServiceError::new("db_query_failed", err.to_string())
    }

    pub fn update(err: rusqlite::Error) -> Self {
        ServiceError::new("db_update_failed", err.to_string())
    }
}
