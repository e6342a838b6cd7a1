//! Runtime settings for embedding the catalog.
//!
//! # Invariants
//! - A missing `db_path` means a private in-memory database.
//! - Logging is only started when `log_dir` is set.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::{default_log_level, init_logging, LoggingError};
use rusqlite::Connection;
use std::path::PathBuf;

/// Literal accepted in place of a database path to request memory storage.
pub const IN_MEMORY_DB: &str = ":memory:";

/// Settings a host fills in before opening the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CatalogConfig {
    /// Starts file logging when a log directory is configured.
    pub fn init_logging(&self) -> Result<bool, LoggingError> {
        let Some(log_dir) = &self.log_dir else {
            return Ok(false);
        };
        let log_dir = log_dir.to_string_lossy();
        init_logging(&self.log_level, &log_dir)?;
        Ok(true)
    }

    /// Opens and migrates the configured database.
    pub fn open_database(&self) -> DbResult<Connection> {
        match &self.db_path {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        }
    }
}
