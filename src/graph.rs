//! In-memory object graph shared by both stores.
//!
//! Entities live in insertion-ordered registries keyed by identity key, and
//! relationships are plain id lists on both ends (student <-> course,
//! instructor <-> course). The persistent store never patches this graph: it
//! discards it and calls [`SchoolGraph::rebuild`] after every committed write.

use std::collections::HashMap;

use tracing::warn;

use crate::error::{Result, SchoolError};
use crate::models::{push_unique, Course, EntityKind, Instructor, PersonInfo, Student};
use crate::snapshot::{CourseRecord, InstructorRecord, Snapshot, StudentRecord};

/// Anything stored in a [`Registry`] exposes its identity key.
pub trait Keyed {
    fn key(&self) -> &str;
    fn set_key(&mut self, key: String);
}

impl Keyed for Student {
    fn key(&self) -> &str {
        &self.student_id
    }

    fn set_key(&mut self, key: String) {
        self.student_id = key;
    }
}

impl Keyed for Instructor {
    fn key(&self) -> &str {
        &self.instructor_id
    }

    fn set_key(&mut self, key: String) {
        self.instructor_id = key;
    }
}

impl Keyed for Course {
    fn key(&self) -> &str {
        &self.course_id
    }

    fn set_key(&mut self, key: String) {
        self.course_id = key;
    }
}

/// Insertion-ordered map from identity key to entity.
#[derive(Debug, Clone)]
pub struct Registry<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Keyed> Registry<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&pos| &self.items[pos])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        match self.index.get(key) {
            Some(&pos) => self.items.get_mut(pos),
            None => None,
        }
    }

    /// Insert unless the key is taken. Returns `false` on collision.
    pub fn insert(&mut self, item: T) -> bool {
        if self.index.contains_key(item.key()) {
            return false;
        }
        self.index.insert(item.key().to_string(), self.items.len());
        self.items.push(item);
        true
    }

    pub fn remove(&mut self, key: &str) -> Option<T> {
        let pos = self.index.remove(key)?;
        let removed = self.items.remove(pos);
        for (offset, item) in self.items[pos..].iter().enumerate() {
            self.index.insert(item.key().to_string(), pos + offset);
        }
        Some(removed)
    }

    /// Move an entry to a new key, keeping its position.
    pub fn rekey(&mut self, old: &str, new: &str) -> bool {
        if old == new {
            return self.contains(old);
        }
        if self.contains(new) {
            return false;
        }
        let Some(pos) = self.index.remove(old) else {
            return false;
        };
        self.items[pos].set_key(new.to_string());
        self.index.insert(new.to_string(), pos);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }
}

/// Case-insensitive matches grouped per kind.
#[derive(Debug, Default)]
pub struct SearchResults<'a> {
    pub students: Vec<&'a Student>,
    pub instructors: Vec<&'a Instructor>,
    pub courses: Vec<&'a Course>,
}

impl SearchResults<'_> {
    pub fn total(&self) -> usize {
        self.students.len() + self.instructors.len() + self.courses.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchoolGraph {
    students: Registry<Student>,
    instructors: Registry<Instructor>,
    courses: Registry<Course>,
}

impl SchoolGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn students(&self) -> std::slice::Iter<'_, Student> {
        self.students.iter()
    }

    pub fn instructors(&self) -> std::slice::Iter<'_, Instructor> {
        self.instructors.iter()
    }

    pub fn courses(&self) -> std::slice::Iter<'_, Course> {
        self.courses.iter()
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.get(id)
    }

    pub fn instructor(&self, id: &str) -> Option<&Instructor> {
        self.instructors.get(id)
    }

    pub fn course(&self, id: &str) -> Option<&Course> {
        self.courses.get(id)
    }

    pub fn instructor_of(&self, course: &Course) -> Option<&Instructor> {
        course
            .instructor_id
            .as_deref()
            .and_then(|id| self.instructors.get(id))
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.students.len(),
            self.instructors.len(),
            self.courses.len(),
        )
    }

    /// Discard everything and relink from freshly loaded rows.
    ///
    /// Relationship lists on the incoming entities are ignored; the only
    /// sources of truth are each course's `instructor_id` and the
    /// registration pairs. A course whose instructor id does not resolve
    /// becomes unassigned, and registration pairs naming an unknown id are
    /// skipped.
    pub fn rebuild(
        &mut self,
        students: Vec<Student>,
        instructors: Vec<Instructor>,
        courses: Vec<Course>,
        registrations: &[(String, String)],
    ) {
        self.students.clear();
        self.instructors.clear();
        self.courses.clear();

        for mut student in students {
            student.registered_courses.clear();
            self.students.insert(student);
        }
        for mut instructor in instructors {
            instructor.assigned_courses.clear();
            self.instructors.insert(instructor);
        }
        for mut course in courses {
            course.enrolled_students.clear();
            if let Some(id) = course.instructor_id.take() {
                if self.instructors.contains(&id) {
                    course.instructor_id = Some(id);
                }
            }
            self.courses.insert(course);
        }

        for course in self.courses.iter() {
            if let Some(instructor_id) = course.instructor_id.as_deref() {
                if let Some(instructor) = self.instructors.get_mut(instructor_id) {
                    instructor.assign_course(&course.course_id);
                }
            }
        }

        for (student_id, course_id) in registrations {
            if !self.link_registration(student_id, course_id) {
                warn!(%student_id, %course_id, "skipping registration with unknown id");
            }
        }
    }

    /// Link a student and a course in both directions. Returns `false` when
    /// either side is missing.
    fn link_registration(&mut self, student_id: &str, course_id: &str) -> bool {
        if !self.students.contains(student_id) || !self.courses.contains(course_id) {
            return false;
        }
        if let Some(student) = self.students.get_mut(student_id) {
            student.register_course(course_id);
        }
        if let Some(course) = self.courses.get_mut(course_id) {
            course.add_student(student_id);
        }
        true
    }

    fn unlink_instructor(&mut self, course_id: &str) {
        let previous = self
            .courses
            .get_mut(course_id)
            .and_then(|course| course.instructor_id.take());
        if let Some(previous) = previous {
            if let Some(instructor) = self.instructors.get_mut(&previous) {
                instructor.assigned_courses.retain(|id| id != course_id);
            }
        }
    }

    fn link_instructor(&mut self, instructor_id: &str, course_id: &str) {
        self.unlink_instructor(course_id);
        if let Some(course) = self.courses.get_mut(course_id) {
            course.instructor_id = Some(instructor_id.to_string());
        }
        if let Some(instructor) = self.instructors.get_mut(instructor_id) {
            instructor.assign_course(course_id);
        }
    }

    pub fn add_student(&mut self, mut student: Student) -> Result<()> {
        student.registered_courses.clear();
        let id = student.student_id.clone();
        if !self.students.insert(student) {
            return Err(SchoolError::duplicate(EntityKind::Student, &id));
        }
        Ok(())
    }

    pub fn add_instructor(&mut self, mut instructor: Instructor) -> Result<()> {
        instructor.assigned_courses.clear();
        let id = instructor.instructor_id.clone();
        if !self.instructors.insert(instructor) {
            return Err(SchoolError::duplicate(EntityKind::Instructor, &id));
        }
        Ok(())
    }

    pub fn add_course(&mut self, mut course: Course) -> Result<()> {
        if self.courses.contains(&course.course_id) {
            return Err(SchoolError::duplicate(EntityKind::Course, &course.course_id));
        }
        let instructor_id = course.instructor_id.take();
        if let Some(id) = instructor_id.as_deref() {
            self.require_instructor(id)?;
        }
        course.enrolled_students.clear();
        let course_id = course.course_id.clone();
        self.courses.insert(course);
        if let Some(id) = instructor_id {
            self.link_instructor(&id, &course_id);
        }
        Ok(())
    }

    /// Idempotent: registering an existing pair changes nothing.
    pub fn register_student_in_course(&mut self, student_id: &str, course_id: &str) -> Result<()> {
        if !self.students.contains(student_id) {
            return Err(SchoolError::Referential(format!(
                "student \"{student_id}\" does not exist"
            )));
        }
        if !self.courses.contains(course_id) {
            return Err(SchoolError::Referential(format!(
                "course \"{course_id}\" does not exist"
            )));
        }
        self.link_registration(student_id, course_id);
        Ok(())
    }

    /// Overwrites any prior assignment.
    pub fn assign_instructor_to_course(&mut self, instructor_id: &str, course_id: &str) -> Result<()> {
        if !self.courses.contains(course_id) {
            return Err(SchoolError::not_found(EntityKind::Course, course_id));
        }
        self.require_instructor(instructor_id)?;
        self.link_instructor(instructor_id, course_id);
        Ok(())
    }

    fn require_instructor(&self, instructor_id: &str) -> Result<()> {
        if self.instructors.contains(instructor_id) {
            Ok(())
        } else {
            Err(SchoolError::Referential(format!(
                "instructor \"{instructor_id}\" does not exist"
            )))
        }
    }

    /// Replace a student's scalar fields, renaming it (and every reference to
    /// it) when the id changed. Registrations are kept.
    pub fn update_student(&mut self, old_id: &str, updated: Student) -> Result<()> {
        let new_id = updated.student_id.clone();
        self.rename(EntityKind::Student, old_id, &new_id)?;
        if new_id != old_id {
            for course in self.courses.items.iter_mut() {
                replace_id(&mut course.enrolled_students, old_id, &new_id);
            }
        }
        if let Some(student) = self.students.get_mut(&new_id) {
            student.person = updated.person;
        }
        Ok(())
    }

    pub fn update_instructor(&mut self, old_id: &str, updated: Instructor) -> Result<()> {
        let new_id = updated.instructor_id.clone();
        self.rename(EntityKind::Instructor, old_id, &new_id)?;
        if new_id != old_id {
            for course in self.courses.items.iter_mut() {
                if course.instructor_id.as_deref() == Some(old_id) {
                    course.instructor_id = Some(new_id.clone());
                }
            }
        }
        if let Some(instructor) = self.instructors.get_mut(&new_id) {
            instructor.person = updated.person;
        }
        Ok(())
    }

    /// Course updates also carry the instructor assignment, like the SQL
    /// `UPDATE courses` they mirror.
    pub fn update_course(&mut self, old_id: &str, updated: Course) -> Result<()> {
        if !self.courses.contains(old_id) {
            return Err(SchoolError::not_found(EntityKind::Course, old_id));
        }
        if let Some(id) = updated.instructor_id.as_deref() {
            self.require_instructor(id)?;
        }
        let new_id = updated.course_id.clone();
        self.rename(EntityKind::Course, old_id, &new_id)?;
        if new_id != old_id {
            for student in self.students.items.iter_mut() {
                replace_id(&mut student.registered_courses, old_id, &new_id);
            }
            for instructor in self.instructors.items.iter_mut() {
                replace_id(&mut instructor.assigned_courses, old_id, &new_id);
            }
        }
        if let Some(course) = self.courses.get_mut(&new_id) {
            course.course_name = updated.course_name;
        }
        match updated.instructor_id {
            Some(instructor_id) => self.link_instructor(&instructor_id, &new_id),
            None => self.unlink_instructor(&new_id),
        }
        Ok(())
    }

    fn rename(&mut self, kind: EntityKind, old_id: &str, new_id: &str) -> Result<()> {
        let (exists, taken) = match kind {
            EntityKind::Student => (self.students.contains(old_id), self.students.contains(new_id)),
            EntityKind::Instructor => (
                self.instructors.contains(old_id),
                self.instructors.contains(new_id),
            ),
            EntityKind::Course => (self.courses.contains(old_id), self.courses.contains(new_id)),
        };
        if !exists {
            return Err(SchoolError::not_found(kind, old_id));
        }
        if old_id == new_id {
            return Ok(());
        }
        if taken {
            return Err(SchoolError::duplicate(kind, new_id));
        }
        match kind {
            EntityKind::Student => self.students.rekey(old_id, new_id),
            EntityKind::Instructor => self.instructors.rekey(old_id, new_id),
            EntityKind::Course => self.courses.rekey(old_id, new_id),
        };
        Ok(())
    }

    /// Drops the student and its registrations.
    pub fn delete_student(&mut self, student_id: &str) -> Result<()> {
        self.students
            .remove(student_id)
            .ok_or_else(|| SchoolError::not_found(EntityKind::Student, student_id))?;
        for course in self.courses.items.iter_mut() {
            course.enrolled_students.retain(|id| id != student_id);
        }
        Ok(())
    }

    /// Courses taught by the instructor become unassigned; they are not deleted.
    pub fn delete_instructor(&mut self, instructor_id: &str) -> Result<()> {
        self.instructors
            .remove(instructor_id)
            .ok_or_else(|| SchoolError::not_found(EntityKind::Instructor, instructor_id))?;
        for course in self.courses.items.iter_mut() {
            if course.instructor_id.as_deref() == Some(instructor_id) {
                course.instructor_id = None;
            }
        }
        Ok(())
    }

    pub fn delete_course(&mut self, course_id: &str) -> Result<()> {
        self.unlink_instructor(course_id);
        self.courses
            .remove(course_id)
            .ok_or_else(|| SchoolError::not_found(EntityKind::Course, course_id))?;
        for student in self.students.items.iter_mut() {
            student.registered_courses.retain(|id| id != course_id);
        }
        Ok(())
    }

    /// Case-insensitive substring match on name or id. An empty query matches
    /// everything.
    pub fn search(&self, text: &str) -> SearchResults<'_> {
        let needle = text.to_lowercase();
        let hit = |label: &str, id: &str| {
            label.to_lowercase().contains(&needle) || id.to_lowercase().contains(&needle)
        };
        SearchResults {
            students: self
                .students
                .iter()
                .filter(|s| hit(&s.person.name, &s.student_id))
                .collect(),
            instructors: self
                .instructors
                .iter()
                .filter(|i| hit(&i.person.name, &i.instructor_id))
                .collect(),
            courses: self
                .courses
                .iter()
                .filter(|c| hit(&c.course_name, &c.course_id))
                .collect(),
        }
    }

    /// Every registration as `(student_id, course_id)`, in student order.
    pub fn registrations(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.students.iter().flat_map(|student| {
            student
                .registered_courses
                .iter()
                .map(move |course_id| (student.student_id.as_str(), course_id.as_str()))
        })
    }

    pub fn student_records(&self) -> Vec<StudentRecord> {
        self.students
            .iter()
            .map(|s| StudentRecord {
                name: s.person.name.clone(),
                age: s.person.age,
                email: s.person.email.clone(),
                student_id: s.student_id.clone(),
                registered_course_ids: s.registered_courses.clone(),
            })
            .collect()
    }

    pub fn instructor_records(&self) -> Vec<InstructorRecord> {
        self.instructors
            .iter()
            .map(|i| InstructorRecord {
                name: i.person.name.clone(),
                age: i.person.age,
                email: i.person.email.clone(),
                instructor_id: i.instructor_id.clone(),
                assigned_course_ids: i.assigned_courses.clone(),
            })
            .collect()
    }

    pub fn course_records(&self) -> Vec<CourseRecord> {
        self.courses
            .iter()
            .map(|c| CourseRecord {
                course_id: c.course_id.clone(),
                course_name: c.course_name.clone(),
                instructor_id: c.instructor_id.clone(),
                enrolled_student_ids: c.enrolled_students.clone(),
            })
            .collect()
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            students: self.student_records(),
            instructors: self.instructor_records(),
            courses: self.course_records(),
        }
    }

    /// Build a graph from a snapshot, validating every person and writing both
    /// directions of each relationship even if the file only recorded one.
    ///
    /// A course's own `instructor_id` wins; when it is missing or unknown the
    /// first instructor listing the course in `assigned_course_ids` is used.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self> {
        let mut graph = Self::new();

        for record in &snapshot.students {
            graph.add_student(Student {
                student_id: record.student_id.clone(),
                person: PersonInfo::new(&record.name, record.age, &record.email)?,
                registered_courses: Vec::new(),
            })?;
        }
        for record in &snapshot.instructors {
            graph.add_instructor(Instructor {
                instructor_id: record.instructor_id.clone(),
                person: PersonInfo::new(&record.name, record.age, &record.email)?,
                assigned_courses: Vec::new(),
            })?;
        }
        for record in &snapshot.courses {
            let declared = record
                .instructor_id
                .as_deref()
                .filter(|id| graph.instructors.contains(id));
            let claimed = || {
                snapshot
                    .instructors
                    .iter()
                    .find(|i| i.assigned_course_ids.contains(&record.course_id))
                    .map(|i| i.instructor_id.as_str())
            };
            let instructor_id = declared.or_else(claimed).map(str::to_string);
            graph.add_course(Course::new(
                record.course_id.clone(),
                record.course_name.clone(),
                instructor_id,
            ))?;
        }

        for record in &snapshot.courses {
            for student_id in &record.enrolled_student_ids {
                graph.link_registration(student_id, &record.course_id);
            }
        }
        for record in &snapshot.students {
            for course_id in &record.registered_course_ids {
                graph.link_registration(&record.student_id, course_id);
            }
        }

        Ok(graph)
    }
}

fn replace_id(ids: &mut Vec<String>, old_id: &str, new_id: &str) {
    let mut renamed = Vec::with_capacity(ids.len());
    for id in ids.drain(..) {
        let id = if id == old_id { new_id.to_string() } else { id };
        push_unique(&mut renamed, &id);
    }
    *ids = renamed;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: &str, name: &str) -> Student {
        Student::new(name, 20, format!("{}@school.edu", id.to_lowercase()), id).unwrap()
    }

    fn instructor(id: &str, name: &str) -> Instructor {
        Instructor::new(name, 45, format!("{}@school.edu", id.to_lowercase()), id).unwrap()
    }

    #[test]
    fn rebuild_links_both_directions() {
        let mut graph = SchoolGraph::new();
        graph.rebuild(
            vec![student("S1", "Ann"), student("S2", "Ben")],
            vec![instructor("I1", "Dr. Cole")],
            vec![
                Course::new("C1", "Algebra", Some("I1".into())),
                Course::new("C2", "Biology", Some("I404".into())),
            ],
            &[
                ("S1".into(), "C1".into()),
                ("S2".into(), "C1".into()),
                ("S1".into(), "C2".into()),
                ("S9".into(), "C1".into()),
            ],
        );

        assert_eq!(graph.student("S1").unwrap().registered_courses, vec!["C1", "C2"]);
        assert_eq!(graph.course("C1").unwrap().enrolled_students, vec!["S1", "S2"]);
        assert_eq!(graph.instructor("I1").unwrap().assigned_courses, vec!["C1"]);
        assert_eq!(graph.course("C2").unwrap().instructor_id, None);
    }

    #[test]
    fn rebuild_discards_previous_contents() {
        let mut graph = SchoolGraph::new();
        graph.add_student(student("S1", "Ann")).unwrap();
        graph.rebuild(vec![student("S2", "Ben")], Vec::new(), Vec::new(), &[]);
        assert!(graph.student("S1").is_none());
        assert_eq!(graph.counts(), (1, 0, 0));
    }

    #[test]
    fn registry_remove_and_rekey_keep_index_consistent() {
        let mut registry = Registry::default();
        for id in ["A", "B", "C"] {
            assert!(registry.insert(student(id, id)));
        }
        assert!(!registry.insert(student("B", "dup")));
        registry.remove("A");
        assert_eq!(registry.get("C").unwrap().student_id, "C");
        assert!(registry.rekey("B", "Z"));
        assert!(!registry.rekey("C", "Z"));
        let order: Vec<&str> = registry.iter().map(|s| s.key()).collect();
        assert_eq!(order, vec!["Z", "C"]);
        assert!(registry.get("B").is_none());
    }

    #[test]
    fn reassigning_moves_course_between_instructors() {
        let mut graph = SchoolGraph::new();
        graph.add_instructor(instructor("I1", "Cole")).unwrap();
        graph.add_instructor(instructor("I2", "Diaz")).unwrap();
        graph
            .add_course(Course::new("C1", "Algebra", Some("I1".into())))
            .unwrap();
        graph.assign_instructor_to_course("I2", "C1").unwrap();

        assert!(graph.instructor("I1").unwrap().assigned_courses.is_empty());
        assert_eq!(graph.instructor("I2").unwrap().assigned_courses, vec!["C1"]);
        assert_eq!(graph.course("C1").unwrap().instructor_id.as_deref(), Some("I2"));
    }

    #[test]
    fn renaming_course_updates_both_sides() {
        let mut graph = SchoolGraph::new();
        graph.add_student(student("S1", "Ann")).unwrap();
        graph.add_instructor(instructor("I1", "Cole")).unwrap();
        graph
            .add_course(Course::new("C1", "Algebra", Some("I1".into())))
            .unwrap();
        graph.register_student_in_course("S1", "C1").unwrap();

        graph
            .update_course("C1", Course::new("C9", "Algebra II", Some("I1".into())))
            .unwrap();

        assert_eq!(graph.student("S1").unwrap().registered_courses, vec!["C9"]);
        assert_eq!(graph.instructor("I1").unwrap().assigned_courses, vec!["C9"]);
        assert_eq!(graph.course("C9").unwrap().enrolled_students, vec!["S1"]);
        assert!(graph.course("C1").is_none());
    }

    #[test]
    fn search_is_case_insensitive() {
        let mut graph = SchoolGraph::new();
        graph.add_student(student("S1", "Ann")).unwrap();
        graph.add_student(student("S2", "Joanna")).unwrap();
        graph.add_course(Course::new("ANN-101", "Annals", None)).unwrap();

        let found = graph.search("ANN");
        assert_eq!(found.students.len(), 2);
        assert_eq!(found.courses.len(), 1);
        assert_eq!(graph.search("").total(), 3);
        assert_eq!(graph.search("zzz").total(), 0);
    }
}
