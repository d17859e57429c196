//! Flat display rows for the records table and the CSV export built on top of
//! the cache graph.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::graph::SchoolGraph;
use crate::models::EntityKind;

pub const CSV_HEADER: [&str; 4] = ["Type", "ID", "Name", "Extra"];

/// One line of the records table: `(type, id, name, age, email, related)`.
/// Courses leave age and email empty and carry their instructor's name as
/// `related`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRow {
    pub kind: EntityKind,
    pub id: String,
    pub name: String,
    pub age: Option<i64>,
    pub email: Option<String>,
    pub related: String,
}

/// Lazily walk students, then instructors, then courses. Call again to start
/// over; each call reads the graph as it is at that moment.
pub fn view_rows(graph: &SchoolGraph) -> impl Iterator<Item = ViewRow> + '_ {
    let students = graph.students().map(|s| ViewRow {
        kind: EntityKind::Student,
        id: s.student_id.clone(),
        name: s.person.name.clone(),
        age: Some(s.person.age),
        email: Some(s.person.email.clone()),
        related: s.registered_courses.join(", "),
    });
    let instructors = graph.instructors().map(|i| ViewRow {
        kind: EntityKind::Instructor,
        id: i.instructor_id.clone(),
        name: i.person.name.clone(),
        age: Some(i.person.age),
        email: Some(i.person.email.clone()),
        related: i.assigned_courses.join(", "),
    });
    let courses = graph.courses().map(move |c| ViewRow {
        kind: EntityKind::Course,
        id: c.course_id.clone(),
        name: c.course_name.clone(),
        age: None,
        email: None,
        related: graph
            .instructor_of(c)
            .map(|i| i.person.name.clone())
            .unwrap_or_default(),
    });
    students.chain(instructors).chain(courses)
}

/// Rows for the CSV export, header excluded.
pub fn csv_rows(graph: &SchoolGraph) -> Vec<[String; 4]> {
    let mut rows = Vec::new();
    for s in graph.students() {
        rows.push([
            EntityKind::Student.to_string(),
            s.student_id.clone(),
            s.person.name.clone(),
            joined_or_dash(&s.registered_courses),
        ]);
    }
    for i in graph.instructors() {
        rows.push([
            EntityKind::Instructor.to_string(),
            i.instructor_id.clone(),
            i.person.name.clone(),
            joined_or_dash(&i.assigned_courses),
        ]);
    }
    for c in graph.courses() {
        let instructor = graph
            .instructor_of(c)
            .map(|i| i.person.name.as_str())
            .unwrap_or("—");
        rows.push([
            EntityKind::Course.to_string(),
            c.course_id.clone(),
            c.course_name.clone(),
            format!("Instr: {instructor}, Enrolled: {}", c.enrolled_students.len()),
        ]);
    }
    rows
}

fn joined_or_dash(ids: &[String]) -> String {
    if ids.is_empty() {
        "-".to_string()
    } else {
        ids.join(", ")
    }
}

/// Render the whole export, CRLF-terminated like most spreadsheet tools expect.
pub fn render_csv(graph: &SchoolGraph) -> String {
    let mut out = String::new();
    push_record(&mut out, CSV_HEADER.iter().copied());
    for row in csv_rows(graph) {
        push_record(&mut out, row.iter().map(String::as_str));
    }
    out
}

pub fn write_csv(graph: &SchoolGraph, path: &Path) -> Result<usize> {
    let rows = csv_rows(graph).len();
    fs::write(path, render_csv(graph))?;
    Ok(rows)
}

fn push_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (idx, field) in fields.enumerate() {
        if idx > 0 {
            out.push(',');
        }
        out.push_str(&quote_field(field));
    }
    out.push_str("\r\n");
}

/// Quote only when needed, doubling embedded quotes.
fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Course, Instructor, Student};

    fn sample() -> SchoolGraph {
        let mut graph = SchoolGraph::new();
        graph
            .add_student(Student::new("Ann", 20, "ann@x.com", "S1").unwrap())
            .unwrap();
        graph
            .add_student(Student::new("Ben \"B\"", 21, "ben@x.com", "S2").unwrap())
            .unwrap();
        graph
            .add_instructor(Instructor::new("Cole", 50, "cole@x.com", "I1").unwrap())
            .unwrap();
        graph
            .add_course(Course::new("C1", "Algebra", Some("I1".into())))
            .unwrap();
        graph.add_course(Course::new("C2", "Biology", None)).unwrap();
        graph.register_student_in_course("S1", "C1").unwrap();
        graph.register_student_in_course("S1", "C2").unwrap();
        graph
    }

    #[test]
    fn csv_extra_column_summaries() {
        let rows = csv_rows(&sample());
        assert_eq!(rows[0][3], "C1, C2");
        assert_eq!(rows[1][3], "-");
        assert_eq!(rows[2][3], "C1");
        assert_eq!(rows[3][3], "Instr: Cole, Enrolled: 1");
        assert_eq!(rows[4][3], "Instr: —, Enrolled: 1");
    }

    #[test]
    fn csv_quotes_only_when_needed() {
        let text = render_csv(&sample());
        let lines: Vec<&str> = text.split("\r\n").collect();
        assert_eq!(lines[0], "Type,ID,Name,Extra");
        assert_eq!(lines[1], "Student,S1,Ann,\"C1, C2\"");
        assert_eq!(lines[2], "Student,S2,\"Ben \"\"B\"\"\",-");
        assert_eq!(lines[4], "Course,C1,Algebra,\"Instr: Cole, Enrolled: 1\"");
    }

    #[test]
    fn view_rows_are_restartable() {
        let graph = sample();
        let first: Vec<ViewRow> = view_rows(&graph).collect();
        let second: Vec<ViewRow> = view_rows(&graph).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);

        let course = &first[3];
        assert_eq!(course.kind, EntityKind::Course);
        assert_eq!(course.related, "Cole");
        assert_eq!(course.age, None);
        assert_eq!(first[4].related, "");
    }
}
