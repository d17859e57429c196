//! SQLite-backed store with an in-memory cache graph the UI reads directly.
//!
//! Every mutating call follows the same shape: run the statement(s), commit,
//! then rebuild the whole cache from the tables. A failed call never reaches
//! the rebuild, so the cache keeps showing the last committed state. Entity
//! references handed out by [`SchoolStore::graph`] or [`SchoolStore::search`]
//! borrow the store, which means the borrow checker already forces callers to
//! drop them before the next mutation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::db::{connection, courses, instructors, registrations, students};
use crate::error::{map_constraint, Result, SchoolError};
use crate::export::{self, ViewRow};
use crate::graph::{SchoolGraph, SearchResults};
use crate::models::{Course, EntityKind, Instructor, Student};
use crate::snapshot::{CourseRecord, InstructorRecord, Snapshot, StudentRecord};

pub struct SchoolStore {
    conn: Connection,
    path: PathBuf,
    graph: SchoolGraph,
}

impl SchoolStore {
    /// Open or create the database at `path` and load the cache.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = connection::open_database(&path)?;
        let mut store = Self {
            conn,
            path,
            graph: SchoolGraph::new(),
        };
        store.refresh_cache()?;
        info!(path = %store.path.display(), "opened school database");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn graph(&self) -> &SchoolGraph {
        &self.graph
    }

    /// Throw the cache away and rebuild it from the tables.
    pub fn refresh_cache(&mut self) -> Result<()> {
        let students = students::fetch_students(&self.conn)?;
        let instructors = instructors::fetch_instructors(&self.conn)?;
        let courses = courses::fetch_courses(&self.conn)?;
        let registrations = registrations::fetch_registrations(&self.conn)?;

        self.graph
            .rebuild(students, instructors, courses, &registrations);

        let (students, instructors, courses) = self.graph.counts();
        debug!(
            students,
            instructors,
            courses,
            registrations = registrations.len(),
            "cache rebuilt"
        );
        Ok(())
    }

    pub fn add_student(&mut self, student: &Student) -> Result<()> {
        students::insert_student(&self.conn, student)?;
        info!(student_id = %student.student_id, "student added");
        self.refresh_cache()
    }

    pub fn add_instructor(&mut self, instructor: &Instructor) -> Result<()> {
        instructors::insert_instructor(&self.conn, instructor)?;
        info!(instructor_id = %instructor.instructor_id, "instructor added");
        self.refresh_cache()
    }

    pub fn add_course(&mut self, course: &Course) -> Result<()> {
        courses::insert_course(&self.conn, course)?;
        info!(course_id = %course.course_id, "course added");
        self.refresh_cache()
    }

    /// Registering an existing pair is a silent no-op.
    pub fn register_student_in_course(&mut self, student_id: &str, course_id: &str) -> Result<()> {
        registrations::insert_registration(&self.conn, student_id, course_id)?;
        info!(%student_id, %course_id, "student registered");
        self.refresh_cache()
    }

    /// Overwrites any prior assignment. Unknown instructors are rejected with
    /// a referential error, unknown courses with not-found.
    pub fn assign_instructor_to_course(&mut self, instructor_id: &str, course_id: &str) -> Result<()> {
        courses::set_course_instructor(&self.conn, instructor_id, course_id)?;
        info!(%instructor_id, %course_id, "instructor assigned");
        self.refresh_cache()
    }

    pub fn update_student(&mut self, old_id: &str, student: &Student) -> Result<()> {
        let renamed = old_id != student.student_id;
        self.in_transaction(renamed, EntityKind::Student, &student.student_id, |conn| {
            students::update_student(conn, old_id, student)
        })?;
        info!(%old_id, student_id = %student.student_id, "student updated");
        self.refresh_cache()
    }

    pub fn update_instructor(&mut self, old_id: &str, instructor: &Instructor) -> Result<()> {
        let renamed = old_id != instructor.instructor_id;
        self.in_transaction(
            renamed,
            EntityKind::Instructor,
            &instructor.instructor_id,
            |conn| instructors::update_instructor(conn, old_id, instructor),
        )?;
        info!(%old_id, instructor_id = %instructor.instructor_id, "instructor updated");
        self.refresh_cache()
    }

    pub fn update_course(&mut self, old_id: &str, course: &Course) -> Result<()> {
        let renamed = old_id != course.course_id;
        self.in_transaction(renamed, EntityKind::Course, &course.course_id, |conn| {
            courses::update_course(conn, old_id, course)
        })?;
        info!(%old_id, course_id = %course.course_id, "course updated");
        self.refresh_cache()
    }

    pub fn delete_student(&mut self, student_id: &str) -> Result<()> {
        students::delete_student(&self.conn, student_id)?;
        info!(%student_id, "student deleted");
        self.refresh_cache()
    }

    pub fn delete_instructor(&mut self, instructor_id: &str) -> Result<()> {
        instructors::delete_instructor(&self.conn, instructor_id)?;
        info!(%instructor_id, "instructor deleted");
        self.refresh_cache()
    }

    pub fn delete_course(&mut self, course_id: &str) -> Result<()> {
        courses::delete_course(&self.conn, course_id)?;
        info!(%course_id, "course deleted");
        self.refresh_cache()
    }

    /// Run `write` atomically. Renames defer foreign-key checks to commit so
    /// parent and child rows can be rewritten in any order.
    fn in_transaction<F>(&mut self, defer_keys: bool, kind: EntityKind, id: &str, write: F) -> Result<()>
    where
        F: FnOnce(&Connection) -> Result<()>,
    {
        let tx = self.conn.transaction()?;
        if defer_keys {
            tx.execute_batch("PRAGMA defer_foreign_keys = ON")?;
        }
        write(&*tx)?;
        tx.commit()
            .map_err(|err| map_constraint(err, kind, id, "rename left dangling references"))?;
        Ok(())
    }

    pub fn search(&self, text: &str) -> SearchResults<'_> {
        self.graph.search(text)
    }

    pub fn get_students(&self) -> Vec<StudentRecord> {
        self.graph.student_records()
    }

    pub fn get_instructors(&self) -> Vec<InstructorRecord> {
        self.graph.instructor_records()
    }

    pub fn get_courses(&self) -> Vec<CourseRecord> {
        self.graph.course_records()
    }

    pub fn view_rows(&self) -> impl Iterator<Item = ViewRow> + '_ {
        export::view_rows(&self.graph)
    }

    pub fn to_snapshot(&self) -> Snapshot {
        self.graph.to_snapshot()
    }

    /// Replace the whole database with `snapshot`. Every entity is validated
    /// and both relationship directions are merged before anything is
    /// written; the wipe and the inserts then share one transaction.
    pub fn import_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        let incoming = SchoolGraph::from_snapshot(snapshot)?;

        let tx = self.conn.transaction()?;
        connection::clear_tables(&tx)?;
        for student in incoming.students() {
            students::insert_student(&tx, student)?;
        }
        for instructor in incoming.instructors() {
            instructors::insert_instructor(&tx, instructor)?;
        }
        for course in incoming.courses() {
            courses::insert_course(&tx, course)?;
        }
        for (student_id, course_id) in incoming.registrations() {
            registrations::insert_registration(&tx, student_id, course_id)?;
        }
        tx.commit()?;

        let (students, instructors, courses) = incoming.counts();
        info!(students, instructors, courses, "snapshot imported");
        self.refresh_cache()
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.to_snapshot().write_json(path)?;
        info!(path = %path.display(), "saved JSON snapshot");
        Ok(())
    }

    pub fn load_json(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let snapshot = Snapshot::read_json(path)?;
        self.import_snapshot(&snapshot)?;
        info!(path = %path.display(), "loaded JSON snapshot");
        Ok(())
    }

    /// Write the CSV export and return how many records it holds.
    pub fn export_csv(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let rows = export::write_csv(&self.graph, path)?;
        info!(path = %path.display(), rows, "exported CSV");
        Ok(rows)
    }

    /// Byte-copy the database file to `dest`. The store stays open and usable;
    /// copying onto the live file itself is refused.
    pub fn backup(&self, dest: impl AsRef<Path>) -> Result<u64> {
        let dest = dest.as_ref();
        if same_file(&self.path, dest) {
            return Err(SchoolError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "backup destination is the live database file",
            )));
        }

        // Every public call commits before returning, so the file on disk is
        // already current.
        debug_assert!(self.conn.is_autocommit());
        let bytes = fs::copy(&self.path, dest)?;
        info!(dest = %dest.display(), bytes, "database backed up");
        Ok(bytes)
    }

    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| err.into())
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    matches!(
        (fs::canonicalize(a), fs::canonicalize(b)),
        (Ok(left), Ok(right)) if left == right
    )
}
