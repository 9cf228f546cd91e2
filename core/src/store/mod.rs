//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The engine never touches it; jobs call store methods and never execute
//! SQL directly.

use crate::{error::CrmResult, event::EventLogEntry};
mod call_assignment;
mod call_record;
mod customer;
mod upload;
mod user_profile;
use rusqlite::{params, Connection};

pub use customer::CustomerFilter;
pub use upload::UploadHistory;

pub struct CrmStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl CrmStore {
    pub fn open(path: &str) -> CrmResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> CrmResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    pub fn reopen(&self) -> CrmResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> CrmResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_customers.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_calls.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_uploads.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/005_assignments.sql"))?;
        Ok(())
    }

    /// Raw connection for tests that need to plant bad rows.
    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    // ── Transactions ──────────────────────────────────────────────

    /// Run `f` inside one transaction. An `Err` from `f` rolls back;
    /// `rollback_on_success` rolls back a successful run too (dry runs).
    pub fn within_transaction<T>(
        &self,
        rollback_on_success: bool,
        f: impl FnOnce(&Self) -> CrmResult<T>,
    ) -> CrmResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        if rollback_on_success {
            tx.rollback()?;
        } else {
            tx.commit()?;
        }
        Ok(value)
    }

    /// Run `f` inside a savepoint so a failing row undoes only its own
    /// writes. Must be called inside `within_transaction`.
    pub fn within_savepoint<T>(
        &self,
        name: &str,
        f: impl FnOnce(&Self) -> CrmResult<T>,
    ) -> CrmResult<T> {
        self.conn.execute_batch(&format!("SAVEPOINT {name};"))?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch(&format!("RELEASE {name};"))?;
                Ok(value)
            }
            Err(e) => {
                self.conn
                    .execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name};"))?;
                Err(e)
            }
        }
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> CrmResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (source, event_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.source, entry.event_type, entry.payload, entry.created_at],
        )?;
        Ok(())
    }

    pub fn events_of_type(&self, event_type: &str) -> CrmResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source, event_type, payload, created_at
             FROM event_log WHERE event_type = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![event_type], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    source:     row.get(1)?,
                    event_type: row.get(2)?,
                    payload:    row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self) -> CrmResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM event_log", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Map a stored enum string back to its Rust value inside a row closure.
pub(crate) fn parse_column<T>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = crate::error::CrmError>,
{
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}
