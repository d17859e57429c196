use rusqlite::{params, Connection};

use crate::error::{map_constraint, Result, SchoolError};
use crate::models::{EntityKind, Student};

use super::row_exists;

/// Load every student in table order. Rows go back through `Student::new`, so
/// a hand-edited database with a malformed email fails the load loudly.
pub fn fetch_students(conn: &Connection) -> Result<Vec<Student>> {
    let mut stmt = conn.prepare("SELECT student_id, name, age, email FROM students ORDER BY rowid")?;

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
        .map(|(id, name, age, email)| Student::new(name, age, email, id))
        .collect()
}

pub fn insert_student(conn: &Connection, student: &Student) -> Result<()> {
    conn.execute(
        "INSERT INTO students (student_id, name, age, email) VALUES (?1, ?2, ?3, ?4)",
        params![
            student.student_id,
            student.person.name,
            student.person.age,
            student.person.email
        ],
    )
    .map_err(|err| map_constraint(err, EntityKind::Student, &student.student_id, "student insert"))?;
    Ok(())
}

/// Rewrite a student row. When the id changes, registrations follow it; the
/// caller runs this inside a transaction with deferred foreign keys.
pub fn update_student(conn: &Connection, old_id: &str, student: &Student) -> Result<()> {
    if !row_exists(conn, "students", "student_id", old_id)? {
        return Err(SchoolError::not_found(EntityKind::Student, old_id));
    }

    let new_id = student.student_id.as_str();
    if new_id != old_id {
        conn.execute(
            "UPDATE students SET student_id = ?1 WHERE student_id = ?2",
            params![new_id, old_id],
        )
        .map_err(|err| map_constraint(err, EntityKind::Student, new_id, "student rename"))?;
        conn.execute(
            "UPDATE registrations SET student_id = ?1 WHERE student_id = ?2",
            params![new_id, old_id],
        )?;
    }

    conn.execute(
        "UPDATE students SET name = ?1, age = ?2, email = ?3 WHERE student_id = ?4",
        params![student.person.name, student.person.age, student.person.email, new_id],
    )?;
    Ok(())
}

/// Registrations cascade away with the row.
pub fn delete_student(conn: &Connection, student_id: &str) -> Result<()> {
    let deleted = conn.execute("DELETE FROM students WHERE student_id = ?1", params![student_id])?;

    if deleted == 0 {
        Err(SchoolError::not_found(EntityKind::Student, student_id))
    } else {
        Ok(())
    }
}
