use rusqlite::{params, Connection};

use crate::error::{map_constraint, Result, SchoolError};
use crate::models::EntityKind;

use super::row_exists;

/// Every `(student_id, course_id)` pair in insertion order.
pub fn fetch_registrations(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt =
        conn.prepare("SELECT student_id, course_id FROM registrations ORDER BY rowid")?;

    let pairs = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(pairs)
}

/// `INSERT OR IGNORE` makes repeated registrations a no-op. It does not cover
/// foreign keys, so unknown ids still fail; they are probed first to name the
/// missing side in the error.
pub fn insert_registration(conn: &Connection, student_id: &str, course_id: &str) -> Result<()> {
    if !row_exists(conn, "students", "student_id", student_id)? {
        return Err(SchoolError::Referential(format!(
            "student \"{student_id}\" does not exist"
        )));
    }
    if !row_exists(conn, "courses", "course_id", course_id)? {
        return Err(SchoolError::Referential(format!(
            "course \"{course_id}\" does not exist"
        )));
    }

    conn.execute(
        "INSERT OR IGNORE INTO registrations (student_id, course_id) VALUES (?1, ?2)",
        params![student_id, course_id],
    )
    .map_err(|err| {
        map_constraint(
            err,
            EntityKind::Student,
            student_id,
            "registration references an unknown student or course",
        )
    })?;
    Ok(())
}
