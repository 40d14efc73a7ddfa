use thiserror::Error;

/// Failure of a data-access call.
///
/// Lookups that may legitimately find nothing return `Ok(None)` or an empty
/// `Vec`; `NotFound` is reserved for lookups the caller depends on, such as
/// resolving the membership a message is attributed to.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl DbError {
    /// True for UNIQUE, NOT NULL and FOREIGN KEY violations.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DbError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
