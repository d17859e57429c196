//! Process-local store with JSON as its only persistence. Registration and
//! assignment mutate the graph directly; there is no separate write step.

use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::export::{self, ViewRow};
use crate::graph::{SchoolGraph, SearchResults};
use crate::models::{Course, Instructor, Student};
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    graph: SchoolGraph,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &SchoolGraph {
        &self.graph
    }

    pub fn add_student(&mut self, student: Student) -> Result<()> {
        self.graph.add_student(student)
    }

    pub fn add_instructor(&mut self, instructor: Instructor) -> Result<()> {
        self.graph.add_instructor(instructor)
    }

    pub fn add_course(&mut self, course: Course) -> Result<()> {
        self.graph.add_course(course)
    }

    pub fn register_student_in_course(&mut self, student_id: &str, course_id: &str) -> Result<()> {
        self.graph.register_student_in_course(student_id, course_id)
    }

    pub fn assign_instructor_to_course(&mut self, instructor_id: &str, course_id: &str) -> Result<()> {
        self.graph.assign_instructor_to_course(instructor_id, course_id)
    }

    pub fn update_student(&mut self, old_id: &str, student: Student) -> Result<()> {
        self.graph.update_student(old_id, student)
    }

    pub fn update_instructor(&mut self, old_id: &str, instructor: Instructor) -> Result<()> {
        self.graph.update_instructor(old_id, instructor)
    }

    pub fn update_course(&mut self, old_id: &str, course: Course) -> Result<()> {
        self.graph.update_course(old_id, course)
    }

    pub fn delete_student(&mut self, student_id: &str) -> Result<()> {
        self.graph.delete_student(student_id)
    }

    pub fn delete_instructor(&mut self, instructor_id: &str) -> Result<()> {
        self.graph.delete_instructor(instructor_id)
    }

    pub fn delete_course(&mut self, course_id: &str) -> Result<()> {
        self.graph.delete_course(course_id)
    }

    pub fn search(&self, text: &str) -> SearchResults<'_> {
        self.graph.search(text)
    }

    pub fn view_rows(&self) -> impl Iterator<Item = ViewRow> + '_ {
        export::view_rows(&self.graph)
    }

    pub fn to_snapshot(&self) -> Snapshot {
        self.graph.to_snapshot()
    }

    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self> {
        Ok(Self {
            graph: SchoolGraph::from_snapshot(snapshot)?,
        })
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        self.to_snapshot().write_json(path)?;
        info!(path = %path.display(), "saved JSON snapshot");
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let store = Self::from_snapshot(&Snapshot::read_json(path)?)?;
        let (students, instructors, courses) = store.graph.counts();
        info!(path = %path.display(), students, instructors, courses, "loaded JSON snapshot");
        Ok(store)
    }
}
