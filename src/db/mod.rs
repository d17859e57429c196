//! Persistence module split across logical submodules, one per table. Every
//! function takes a plain `&Connection` so callers can hand in either the
//! live connection or an open transaction.

pub(crate) mod connection;
pub(crate) mod courses;
pub(crate) mod instructors;
pub(crate) mod registrations;
pub(crate) mod students;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

/// Cheap existence probe used before writes that would otherwise fail with an
/// anonymous constraint error. `table` and `column` are always literals.
pub(crate) fn row_exists(conn: &Connection, table: &str, column: &str, id: &str) -> Result<bool> {
    let sql = format!("SELECT 1 FROM {table} WHERE {column} = ?1");
    let found = conn
        .query_row(&sql, params![id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}
