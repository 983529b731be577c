use rusqlite::types::Value;
use rusqlite::{Connection, Result, Transaction};
use std::rc::Rc;
use tracing::debug;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        rusqlite::vtab::array::load_module(&conn)?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.create_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        // journal_mode reports the resulting mode as a row, so it cannot go
        // through execute_batch.
        let mode: String = self
            .conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        self.conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (journal_mode={}, foreign keys on)", mode);
        Ok(())
    }

    /// Create every table and index that does not exist yet. Safe to run on
    /// every open.
    fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("SQLite schema ensured (version 1)");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Start a transaction on the shared connection. Dropping it without
    /// calling `commit` rolls back.
    pub fn transaction(&self) -> Result<Transaction<'_>> {
        self.conn.unchecked_transaction()
    }

    /// Commit anything still pending, then release the connection.
    pub fn close(self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        self.conn.close().map_err(|(_, e)| e)?;
        debug!("Database closed");
        Ok(())
    }
}

/// Bind a list of strings as a single `rarray(?)` parameter.
pub(crate) fn text_array(values: &[String]) -> Rc<Vec<Value>> {
    Rc::new(values.iter().cloned().map(Value::from).collect())
}
