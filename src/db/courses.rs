use rusqlite::{params, Connection};

use crate::error::{map_constraint, Result, SchoolError};
use crate::models::{Course, EntityKind};

use super::row_exists;

/// Courses come back unlinked: `instructor_id` is the raw column value and
/// `enrolled_students` is empty until the cache graph wires them.
pub fn fetch_courses(conn: &Connection) -> Result<Vec<Course>> {
    let mut stmt =
        conn.prepare("SELECT course_id, course_name, instructor_id FROM courses ORDER BY rowid")?;

    let courses = stmt
        .query_map([], |row| {
            Ok(Course::new(
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(courses)
}

pub fn insert_course(conn: &Connection, course: &Course) -> Result<()> {
    if let Some(instructor_id) = course.instructor_id.as_deref() {
        require_instructor(conn, instructor_id)?;
    }

    conn.execute(
        "INSERT INTO courses (course_id, course_name, instructor_id) VALUES (?1, ?2, ?3)",
        params![course.course_id, course.course_name, course.instructor_id],
    )
    .map_err(|err| {
        map_constraint(
            err,
            EntityKind::Course,
            &course.course_id,
            "course references an unknown instructor",
        )
    })?;
    Ok(())
}

/// Point a course at an instructor, replacing whatever was there. Unknown
/// instructors are rejected just like unknown ids in registrations.
pub fn set_course_instructor(conn: &Connection, instructor_id: &str, course_id: &str) -> Result<()> {
    if !row_exists(conn, "courses", "course_id", course_id)? {
        return Err(SchoolError::not_found(EntityKind::Course, course_id));
    }
    require_instructor(conn, instructor_id)?;

    conn.execute(
        "UPDATE courses SET instructor_id = ?1 WHERE course_id = ?2",
        params![instructor_id, course_id],
    )
    .map_err(|err| {
        map_constraint(
            err,
            EntityKind::Course,
            course_id,
            "course references an unknown instructor",
        )
    })?;
    Ok(())
}

/// Rewrite a course row including its instructor. On a rename the
/// registrations are moved first; the caller defers foreign keys so the
/// intermediate state is allowed inside the transaction.
pub fn update_course(conn: &Connection, old_id: &str, course: &Course) -> Result<()> {
    if !row_exists(conn, "courses", "course_id", old_id)? {
        return Err(SchoolError::not_found(EntityKind::Course, old_id));
    }
    if let Some(instructor_id) = course.instructor_id.as_deref() {
        require_instructor(conn, instructor_id)?;
    }

    let new_id = course.course_id.as_str();
    if new_id != old_id {
        // Shared registrations would otherwise trip the join table's key first.
        if row_exists(conn, "courses", "course_id", new_id)? {
            return Err(SchoolError::duplicate(EntityKind::Course, new_id));
        }
        conn.execute(
            "UPDATE registrations SET course_id = ?1 WHERE course_id = ?2",
            params![new_id, old_id],
        )?;
    }

    conn.execute(
        "UPDATE courses SET course_id = ?1, course_name = ?2, instructor_id = ?3
         WHERE course_id = ?4",
        params![new_id, course.course_name, course.instructor_id, old_id],
    )
    .map_err(|err| map_constraint(err, EntityKind::Course, new_id, "course update"))?;
    Ok(())
}

/// Registrations for the course cascade away.
pub fn delete_course(conn: &Connection, course_id: &str) -> Result<()> {
    let deleted = conn.execute("DELETE FROM courses WHERE course_id = ?1", params![course_id])?;

    if deleted == 0 {
        Err(SchoolError::not_found(EntityKind::Course, course_id))
    } else {
        Ok(())
    }
}

fn require_instructor(conn: &Connection, instructor_id: &str) -> Result<()> {
    if row_exists(conn, "instructors", "instructor_id", instructor_id)? {
        Ok(())
    } else {
        Err(SchoolError::Referential(format!(
            "instructor \"{instructor_id}\" does not exist"
        )))
    }
}
