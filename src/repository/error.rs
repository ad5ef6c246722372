// ==========================================
// College ERP - Repository error type
// ==========================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== Concurrency =====
    /// Compare-and-set UPDATE matched no row: the record changed (or vanished)
    /// between read and write.
    #[error("Concurrent modification: {entity} id={id}")]
    CompareAndSetFailed { entity: String, id: String },

    // ===== Database =====
    #[error("Record not found: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("Database lock failed: {0}")]
    LockError(String),

    #[error("Database transaction failed: {0}")]
    DatabaseTransactionError(String),

    #[error("Database query failed: {0}")]
    DatabaseQueryError(String),

    #[error("Unique constraint violation: {0}")]
    UniqueConstraintViolation(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Check constraint violation: {0}")]
    CheckConstraintViolation(String),

    // ===== Data quality =====
    #[error("Invalid stored value (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        RepositoryError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(msg)
                } else if msg.contains("CHECK") {
                    RepositoryError::CheckConstraintViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_unique_violation_is_classified() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (id TEXT PRIMARY KEY)", []).unwrap();
        conn.execute("INSERT INTO t VALUES ('a')", []).unwrap();
        let err: RepositoryError = conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err().into();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_check_violation_is_classified() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (n INTEGER CHECK (n > 0))", []).unwrap();
        let err: RepositoryError = conn.execute("INSERT INTO t VALUES (0)", []).unwrap_err().into();
        assert!(matches!(err, RepositoryError::CheckConstraintViolation(_)));
    }
}
