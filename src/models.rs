//! Domain models mirrored by the SQLite tables. They stay light-weight data
//! holders: relationships are kept as identity-key lists rather than object
//! references, so the cache graph can wipe and relink them wholesale.

use std::fmt;

use crate::error::Result;
use crate::validation::{validate_age, validate_email};

/// The three record kinds. Display gives the label used in tables, CSV rows
/// and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Student,
    Instructor,
    Course,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Student => "Student",
            EntityKind::Instructor => "Instructor",
            EntityKind::Course => "Course",
        };
        f.write_str(label)
    }
}

/// Fields shared by students and instructors. Only constructible through
/// [`PersonInfo::new`], which runs the age and email checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonInfo {
    pub name: String,
    /// Never negative.
    pub age: i64,
    pub email: String,
}

impl PersonInfo {
    pub fn new(name: impl Into<String>, age: i64, email: impl Into<String>) -> Result<Self> {
        let age = validate_age(age)?;
        let email = email.into();
        validate_email(&email)?;
        Ok(Self {
            name: name.into(),
            age,
            email,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub student_id: String,
    pub person: PersonInfo,
    /// Course ids in registration order, never duplicated.
    pub registered_courses: Vec<String>,
}

impl Student {
    pub fn new(
        name: impl Into<String>,
        age: i64,
        email: impl Into<String>,
        student_id: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            student_id: student_id.into(),
            person: PersonInfo::new(name, age, email)?,
            registered_courses: Vec::new(),
        })
    }

    /// Record a course registration. Returns `false` when it was already there.
    pub fn register_course(&mut self, course_id: &str) -> bool {
        push_unique(&mut self.registered_courses, course_id)
    }
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.student_id, self.person.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instructor {
    pub instructor_id: String,
    pub person: PersonInfo,
    /// Course ids this instructor teaches, never duplicated.
    pub assigned_courses: Vec<String>,
}

impl Instructor {
    pub fn new(
        name: impl Into<String>,
        age: i64,
        email: impl Into<String>,
        instructor_id: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            instructor_id: instructor_id.into(),
            person: PersonInfo::new(name, age, email)?,
            assigned_courses: Vec::new(),
        })
    }

    pub fn assign_course(&mut self, course_id: &str) -> bool {
        push_unique(&mut self.assigned_courses, course_id)
    }
}

impl fmt::Display for Instructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.instructor_id, self.person.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub course_id: String,
    pub course_name: String,
    /// At most one instructor; `None` means unassigned.
    pub instructor_id: Option<String>,
    pub enrolled_students: Vec<String>,
}

impl Course {
    pub fn new(
        course_id: impl Into<String>,
        course_name: impl Into<String>,
        instructor_id: Option<String>,
    ) -> Self {
        Self {
            course_id: course_id.into(),
            course_name: course_name.into(),
            instructor_id,
            enrolled_students: Vec::new(),
        }
    }

    pub fn add_student(&mut self, student_id: &str) -> bool {
        push_unique(&mut self.enrolled_students, student_id)
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.course_id, self.course_name)
    }
}

pub(crate) fn push_unique(ids: &mut Vec<String>, id: &str) -> bool {
    if ids.iter().any(|existing| existing == id) {
        false
    } else {
        ids.push(id.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SchoolError, ValidationError};

    #[test]
    fn student_construction_validates() {
        let student = Student::new("Ann", 20, "ann@x.com", "S1").unwrap();
        assert_eq!(student.person.age, 20);
        assert!(student.registered_courses.is_empty());

        let err = Student::new("Ann", -1, "ann@x.com", "S1").unwrap_err();
        assert!(matches!(
            err,
            SchoolError::Validation(ValidationError::NegativeAge(-1))
        ));
        assert!(Instructor::new("Bob", 40, "not-an-email", "I1").is_err());
    }

    #[test]
    fn relationship_lists_ignore_duplicates() {
        let mut student = Student::new("Ann", 20, "ann@x.com", "S1").unwrap();
        assert!(student.register_course("C1"));
        assert!(!student.register_course("C1"));
        assert!(student.register_course("C2"));
        assert_eq!(student.registered_courses, vec!["C1", "C2"]);
    }
}
