//! SQLite plumbing shared by the user and business stores

use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;
use thiserror::Error;

/// Persistence failures. Absence of a row is modelled as `Ok(None)` by the
/// lookup methods, not as an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email is already registered")]
    EmailTaken,
    #[error("role set must not be empty")]
    EmptyRoleSet,
    #[error("record not found")]
    NotFound,
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// One connection shared by every store; rusqlite connections are not `Sync`.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Open (or create) the database file at `path`.
pub fn open(path: &str) -> Result<SharedConnection, StoreError> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Private in-memory database, used by tests.
pub fn open_in_memory() -> Result<SharedConnection, StoreError> {
    let conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
