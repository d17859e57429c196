//! Record keeping for a small school: students, instructors and courses, the
//! registrations and teaching assignments between them, plus search, CSV
//! export, JSON import/export and database backup.
//!
//! [`SchoolStore`] is the SQLite-backed store the terminal front end drives;
//! [`MemoryStore`] offers the same operations over a process-local graph with
//! JSON as its only persistence.
pub mod config;
mod db;
pub mod error;
pub mod export;
pub mod graph;
pub mod logging;
pub mod memory;
pub mod models;
pub mod snapshot;
pub mod store;
pub mod ui;
pub mod validation;

pub use config::Config;
pub use error::{Result, SchoolError, ValidationError};
pub use export::ViewRow;
pub use graph::{SchoolGraph, SearchResults};
pub use memory::MemoryStore;
pub use models::{Course, EntityKind, Instructor, PersonInfo, Student};
pub use snapshot::{CourseRecord, InstructorRecord, Snapshot, StudentRecord};
pub use store::SchoolStore;

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
