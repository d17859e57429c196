//! Where the application keeps its files. Defaults live under a dot-folder in
//! the user's home; environment variables override each path individually.

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use directories::BaseDirs;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".school-records";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "school.sqlite";
const LOG_FILE_NAME: &str = "school-records.log";

pub const DB_PATH_ENV: &str = "SCHOOL_RECORDS_DB";
pub const LOG_PATH_ENV: &str = "SCHOOL_RECORDS_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::resolve(
            env::var_os(DB_PATH_ENV).map(PathBuf::from),
            env::var_os(LOG_PATH_ENV).map(PathBuf::from),
        )
    }

    /// Fill in whichever path was not overridden. The home directory is only
    /// looked up when a default is actually needed.
    pub fn resolve(db_path: Option<PathBuf>, log_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(path) => path,
            None => data_dir()?.join(DB_FILE_NAME),
        };
        let log_path = match log_path {
            Some(path) => path,
            None => data_dir()?.join(LOG_FILE_NAME),
        };
        Ok(Self { db_path, log_path })
    }
}

/// Resolve the absolute path to the data folder inside the user's home.
fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}
