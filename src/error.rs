#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("close error: {0}")]
    Close(String),

    #[error("database is not open")]
    NotOpen,

    #[error("corrupt row in {table}.{column}: {detail}")]
    CorruptRow {
        table: &'static str,
        column: &'static str,
        detail: String,
    },

    #[error("database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, _) = &e {
            if failure.code == rusqlite::ErrorCode::ConstraintViolation {
                return StoreError::Constraint(e.to_string());
            }
        }
        StoreError::Database(e.to_string())
    }
}
