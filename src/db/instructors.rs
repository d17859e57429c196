use rusqlite::{params, Connection};

use crate::error::{map_constraint, Result, SchoolError};
use crate::models::{EntityKind, Instructor};

use super::row_exists;

pub fn fetch_instructors(conn: &Connection) -> Result<Vec<Instructor>> {
    let mut stmt = conn.prepare(
        "SELECT instructor_id, name, age, email FROM instructors ORDER BY rowid",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, name, age, email)| Instructor::new(name, age, email, id))
        .collect()
}

pub fn insert_instructor(conn: &Connection, instructor: &Instructor) -> Result<()> {
    conn.execute(
        "INSERT INTO instructors (instructor_id, name, age, email) VALUES (?1, ?2, ?3, ?4)",
        params![
            instructor.instructor_id,
            instructor.person.name,
            instructor.person.age,
            instructor.person.email
        ],
    )
    .map_err(|err| {
        map_constraint(
            err,
            EntityKind::Instructor,
            &instructor.instructor_id,
            "instructor insert",
        )
    })?;
    Ok(())
}

/// Rewrite an instructor row, carrying `courses.instructor_id` along on a
/// rename. Same transaction contract as `update_student`.
pub fn update_instructor(conn: &Connection, old_id: &str, instructor: &Instructor) -> Result<()> {
    if !row_exists(conn, "instructors", "instructor_id", old_id)? {
        return Err(SchoolError::not_found(EntityKind::Instructor, old_id));
    }

    let new_id = instructor.instructor_id.as_str();
    if new_id != old_id {
        conn.execute(
            "UPDATE instructors SET instructor_id = ?1 WHERE instructor_id = ?2",
            params![new_id, old_id],
        )
        .map_err(|err| map_constraint(err, EntityKind::Instructor, new_id, "instructor rename"))?;
        conn.execute(
            "UPDATE courses SET instructor_id = ?1 WHERE instructor_id = ?2",
            params![new_id, old_id],
        )?;
    }

    conn.execute(
        "UPDATE instructors SET name = ?1, age = ?2, email = ?3 WHERE instructor_id = ?4",
        params![
            instructor.person.name,
            instructor.person.age,
            instructor.person.email,
            new_id
        ],
    )?;
    Ok(())
}

/// Courses taught by this instructor fall back to unassigned via
/// `ON DELETE SET NULL`.
pub fn delete_instructor(conn: &Connection, instructor_id: &str) -> Result<()> {
    let deleted = conn.execute(
        "DELETE FROM instructors WHERE instructor_id = ?1",
        params![instructor_id],
    )?;

    if deleted == 0 {
        Err(SchoolError::not_found(EntityKind::Instructor, instructor_id))
    } else {
        Ok(())
    }
}
