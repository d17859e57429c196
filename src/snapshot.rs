//! Flat, serde-friendly records used for JSON import/export and for the
//! `get_students`/`get_instructors`/`get_courses` query surface.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub name: String,
    pub age: i64,
    pub email: String,
    pub student_id: String,
    #[serde(default)]
    pub registered_course_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructorRecord {
    pub name: String,
    pub age: i64,
    pub email: String,
    pub instructor_id: String,
    #[serde(default)]
    pub assigned_course_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub course_id: String,
    pub course_name: String,
    #[serde(default)]
    pub instructor_id: Option<String>,
    #[serde(default)]
    pub enrolled_student_ids: Vec<String>,
}

/// Whole-database snapshot in the on-disk JSON layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub students: Vec<StudentRecord>,
    #[serde(default)]
    pub instructors: Vec<InstructorRecord>,
    #[serde(default)]
    pub courses: Vec<CourseRecord>,
}

impl Snapshot {
    pub fn read_json(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let mut body = serde_json::to_string_pretty(self)?;
        body.push('\n');
        fs::write(path, body)?;
        Ok(())
    }
}
