//! Process-wide file logging.
//!
//! # Responsibility
//! - Start one rolling file logger per process.
//! - Record panics as sanitized `event=panic` lines before the default hook.
//!
//! # Invariants
//! - `init_logging` never panics.
//! - A second call with the same level and directory is a no-op; any other
//!   combination is rejected with `LoggingError::AlreadyInitialized`.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "quotebook";
const ROTATE_AFTER_BYTES: u64 = 8 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 4;
const PANIC_MESSAGE_LIMIT: usize = 200;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    level: &'static str,
    log_dir: PathBuf,
    _handle: LoggerHandle,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LoggingError {
    #[error("unknown log level `{0}`, expected trace|debug|info|warn|error")]
    UnknownLevel(String),
    #[error("log directory must be a non-empty absolute path, got `{0}`")]
    InvalidDirectory(String),
    #[error("cannot create log directory `{path}`: {reason}")]
    CreateDirectory { path: PathBuf, reason: String },
    #[error("logging already running with level `{level}` in `{log_dir}`")]
    AlreadyInitialized { level: &'static str, log_dir: PathBuf },
    #[error("logger backend failed to start: {0}")]
    Backend(String),
}

/// Starts file logging at `level` under `log_dir`.
///
/// # Errors
/// - `UnknownLevel` / `InvalidDirectory` for bad arguments.
/// - `AlreadyInitialized` when a logger with other settings is running.
/// - `CreateDirectory` / `Backend` when the file logger cannot start.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), LoggingError> {
    let level = parse_level(level)?;
    let log_dir = parse_log_dir(log_dir)?;

    let active = ACTIVE.get_or_try_init(|| start_logger(level, &log_dir))?;
    if active.level == level && active.log_dir == log_dir {
        Ok(())
    } else {
        Err(LoggingError::AlreadyInitialized {
            level: active.level,
            log_dir: active.log_dir.clone(),
        })
    }
}

/// `(level, log_dir)` of the running logger, `None` before `init_logging`.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.level, active.log_dir.clone()))
}

/// `debug` in debug builds, `info` in release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(level: &'static str, log_dir: &Path) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(log_dir).map_err(|err| LoggingError::CreateDirectory {
        path: log_dir.to_path_buf(),
        reason: err.to_string(),
    })?;

    let handle = Logger::try_with_str(level)
        .map_err(|err| LoggingError::Backend(err.to_string()))?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AFTER_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    install_panic_hook();
    info!(
        "event=logging_start module=core status=ok level={level} log_dir={} version={}",
        log_dir.display(),
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        level,
        log_dir: log_dir.to_path_buf(),
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<&'static str, LoggingError> {
    let parsed = match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => return Err(LoggingError::UnknownLevel(level.trim().to_string())),
    };
    Ok(parsed)
}

fn parse_log_dir(log_dir: &str) -> Result<PathBuf, LoggingError> {
    let trimmed = log_dir.trim();
    let path = Path::new(trimmed);
    if trimmed.is_empty() || !path.is_absolute() {
        return Err(LoggingError::InvalidDirectory(trimmed.to_string()));
    }
    Ok(path.to_path_buf())
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|text| (*text).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string payload".to_string());
        error!(
            "event=panic module=core status=error location={location} message={}",
            single_line(&message, PANIC_MESSAGE_LIMIT)
        );
        previous(info);
    }));
}

/// Flattens line breaks and caps the message at `limit` characters.
fn single_line(value: &str, limit: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    match flat.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, parse_level, parse_log_dir, single_line};
    use super::LoggingError;

    #[test]
    fn parse_level_is_case_and_alias_tolerant() {
        assert_eq!(parse_level(" DEBUG "), Ok("debug"));
        assert_eq!(parse_level("Warning"), Ok("warn"));
        assert_eq!(
            parse_level("verbose"),
            Err(LoggingError::UnknownLevel("verbose".to_string()))
        );
    }

    #[test]
    fn parse_log_dir_requires_absolute_path() {
        assert!(matches!(
            parse_log_dir("relative/logs"),
            Err(LoggingError::InvalidDirectory(_))
        ));
        assert!(matches!(
            parse_log_dir("  "),
            Err(LoggingError::InvalidDirectory(_))
        ));
    }

    #[test]
    fn single_line_flattens_and_truncates() {
        assert_eq!(single_line("a\nb", 10), "a b");
        assert_eq!(single_line("abcdef", 3), "abc...");
    }

    #[test]
    fn init_logging_accepts_repeat_and_rejects_other_settings() {
        let dir = tempfile::tempdir().unwrap();
        let dir_str = dir.path().to_str().unwrap().to_string();
        let other = tempfile::tempdir().unwrap();
        let other_str = other.path().to_str().unwrap().to_string();

        init_logging("info", &dir_str).unwrap();
        init_logging("INFO", &dir_str).unwrap();

        assert!(matches!(
            init_logging("debug", &dir_str),
            Err(LoggingError::AlreadyInitialized { .. })
        ));
        assert!(matches!(
            init_logging("info", &other_str),
            Err(LoggingError::AlreadyInitialized { .. })
        ));

        let (level, log_dir) = logging_status().unwrap();
        assert_eq!(level, "info");
        assert_eq!(log_dir, dir.path());
    }
}
