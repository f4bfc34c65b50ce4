//! Database layer for the PozoVet store.

mod schema;
mod users;
mod pets;
mod products;
mod orders;
mod history;

pub(crate) use orders::{insert_order_item, insert_order_row, load_order, update_order_status};
pub(crate) use products::{adjust_stock, products_by_ids};

use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// How long a connection waits on the database write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid stored amount: {0}")]
    Decimal(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(schema::SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a deferred transaction.
    pub fn transaction(&mut self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    /// Begin a write transaction that takes the database write lock up
    /// front, so every read inside it sees state no concurrent writer can
    /// change before commit.
    pub fn immediate_transaction(&mut self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}

/// Format a decimal amount for TEXT storage.
pub(crate) fn decimal_to_sql(value: Decimal) -> String {
    value.to_string()
}

/// Parse a decimal amount read back from TEXT storage.
pub(crate) fn decimal_from_sql(text: &str) -> DbResult<Decimal> {
    text.parse::<Decimal>()
        .map_err(|err| DbError::Decimal(format!("{}: {}", text, err)))
}
