//! Storage Layer - SQLite-backed persistence
//!
//! - `schema`: DDL for the thirteen marketplace tables, their indexes and seed rows
//! - `manager`: one-shot schema materialization over a single held connection
//! - `store`: data-access operations, each on its own short-lived connection

pub mod manager;
pub mod schema;
pub mod store;

pub use manager::SchemaManager;
pub use store::{FeiraStore, StoreStats};

use crate::{Error, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// How long a writer waits on another connection's lock before giving up
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a connection with foreign-key enforcement turned on.
///
/// SQLite ships with foreign keys disabled and the setting is per
/// connection, so every handle has to go through here.
pub fn open_connection(path: &Path) -> Result<Connection> {
    let connection_error = |source| Error::Connection {
        path: path.to_path_buf(),
        source,
    };

    let conn = Connection::open(path).map_err(connection_error)?;
    conn.pragma_update(None, "foreign_keys", true)
        .map_err(connection_error)?;
    conn.busy_timeout(BUSY_TIMEOUT).map_err(connection_error)?;
    Ok(conn)
}

/// True when the error is a UNIQUE constraint violation
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
