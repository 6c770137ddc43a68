//! Store-level errors shared by every persistence adapter.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate SKU/email, entry reversed twice |
//! | Database (foreign key violation) | `23503` | `InvalidReference` | Unknown warehouse/location, delete of a referenced row |
//! | Database (check constraint violation) | `23514` | `Conflict` | Negative threshold, unknown role or move type |
//! | Database (other) | Any other | `Storage` | Other database errors |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Unavailable` | Database unreachable |
//! | RowNotFound | N/A | `NotFound` | `fetch_one` on a missing row |

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub(crate) fn poisoned() -> Self {
        StoreError::Storage("lock poisoned".to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Map a SQLx error onto the store error taxonomy.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::InvalidReference(msg),
                Some("23514") => StoreError::Conflict(msg),
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool unavailable in {}", operation))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {}: {}", operation, e)),
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("row not found in {}", operation)),
        _ => StoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_unavailable() {
        assert!(matches!(
            map_sqlx_error("append", sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error("get", sqlx::Error::RowNotFound),
            StoreError::NotFound(_)
        ));
    }
}
