//! Error taxonomy shared by both stores. Callers (the terminal front end in
//! particular) match on these variants to decide what to show the user; the
//! stores themselves never recover from them.

use std::io;

use rusqlite::ffi;
use thiserror::Error;

use crate::models::EntityKind;

pub type Result<T, E = SchoolError> = std::result::Result<T, E>;

/// Rejected field values. Raised before any write reaches the database.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Age must be a non-negative integer (got {0}).")]
    NegativeAge(i64),
    #[error("Age must be a non-negative integer (got \"{0}\").")]
    InvalidAge(String),
    #[error("Invalid email format: \"{0}\".")]
    InvalidEmail(String),
    #[error("{0} is required.")]
    Required(&'static str),
}

#[derive(Error, Debug)]
pub enum SchoolError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{kind} id \"{id}\" already exists.")]
    DuplicateKey { kind: EntityKind, id: String },
    #[error("Referential error: {0}")]
    Referential(String),
    #[error("{kind} \"{id}\" not found.")]
    NotFound { kind: EntityKind, id: String },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl SchoolError {
    pub fn not_found(kind: EntityKind, id: &str) -> Self {
        SchoolError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn duplicate(kind: EntityKind, id: &str) -> Self {
        SchoolError::DuplicateKey {
            kind,
            id: id.to_string(),
        }
    }
}

/// Coerce SQLite constraint failures into the taxonomy. `kind`/`id` name the
/// row being written, `what` describes the reference for foreign-key failures.
pub(crate) fn map_constraint(
    err: rusqlite::Error,
    kind: EntityKind,
    id: &str,
    what: &str,
) -> SchoolError {
    let extended = match &err {
        rusqlite::Error::SqliteFailure(failure, _) => Some(failure.extended_code),
        _ => None,
    };

    match extended {
        Some(ffi::SQLITE_CONSTRAINT_PRIMARYKEY) | Some(ffi::SQLITE_CONSTRAINT_UNIQUE) => {
            SchoolError::duplicate(kind, id)
        }
        Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => SchoolError::Referential(what.to_string()),
        _ => err.into(),
    }
}
