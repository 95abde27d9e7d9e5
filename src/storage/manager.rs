//! Schema manager: materializes the marketplace schema

use std::path::{Path, PathBuf};
use rusqlite::Connection;
use tracing::{error, info};
use crate::{Error, Result};
use super::{open_connection, schema};

/// Creates tables, indexes and seed rows over one held connection.
///
/// Every step uses "if not exists" / insert-or-ignore semantics, so running
/// the whole sequence against an initialized store changes nothing.
/// Failures are logged and returned; none of them panic.
pub struct SchemaManager {
    db_path: PathBuf,
    conn: Option<Connection>,
}

impl SchemaManager {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            conn: None,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Open the database file (creating it if missing) with foreign keys enabled.
    pub fn connect(&mut self) -> Result<()> {
        let conn = report("connect", open_connection(&self.db_path))?;
        info!("Connected to database {}", self.db_path.display());
        self.conn = Some(conn);
        Ok(())
    }

    /// Create all tables in dependency order inside one transaction.
    pub fn create_schema(&mut self) -> Result<()> {
        let result = self.in_transaction("create tables", schema::table_statements());
        report("create tables", result)?;
        info!("Created {} tables", schema::TABLE_NAMES.len());
        Ok(())
    }

    pub fn create_indexes(&mut self) -> Result<()> {
        let result = self.in_transaction("create indexes", schema::CREATE_INDEXES.to_vec());
        report("create indexes", result)?;
        info!("Created {} indexes", schema::CREATE_INDEXES.len());
        Ok(())
    }

    /// Insert the fixed category set, skipping names that already exist.
    ///
    /// Returns how many categories were actually inserted.
    pub fn seed_sample_data(&mut self) -> Result<usize> {
        let result = self.seed_categories();
        let inserted = report("seed sample data", result)?;
        info!("Seeded {} new categories", inserted);
        Ok(inserted)
    }

    /// Run the full sequence: connect if needed, tables, indexes, optional seed.
    pub fn initialize(&mut self, seed: bool) -> Result<()> {
        if !self.is_connected() {
            self.connect()?;
        }
        self.create_schema()?;
        self.create_indexes()?;
        if seed {
            self.seed_sample_data()?;
        }
        Ok(())
    }

    /// Release the connection. A no-op when never connected.
    pub fn close(&mut self) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        let result = conn
            .close()
            .map_err(|(_, e)| Error::operation("close database", e));
        report("close", result)?;
        info!("Closed database {}", self.db_path.display());
        Ok(())
    }

    fn conn_mut(&mut self) -> Result<&mut Connection> {
        self.conn.as_mut().ok_or(Error::NotConnected)
    }

    fn in_transaction(&mut self, context: &'static str, stmts: Vec<&'static str>) -> Result<()> {
        let op = |e| Error::operation(context, e);
        let tx = self.conn_mut()?.transaction().map_err(op)?;
        for stmt in stmts {
            tx.execute(stmt, []).map_err(op)?;
        }
        tx.commit().map_err(op)
    }

    fn seed_categories(&mut self) -> Result<usize> {
        let op = |e| Error::operation("seed categories", e);
        let tx = self.conn_mut()?.transaction().map_err(op)?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(schema::INSERT_CATEGORY_IGNORE).map_err(op)?;
            for (name, description) in schema::SEED_CATEGORIES {
                inserted += stmt.execute([name, description]).map_err(op)?;
            }
        }
        tx.commit().map_err(op)?;
        Ok(inserted)
    }
}

fn report<T>(step: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        error!("Schema manager failed to {}: {}", step, e);
    }
    result
}
