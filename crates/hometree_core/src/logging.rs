//! Process-wide logging setup.
//!
//! Logs go to stderr, or to size-rotated `hometree*.log` files when a
//! directory is given. Events are single-line `key=value` records that carry
//! entity kinds and counts, never keys.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "hometree";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();

struct LoggingState {
    level: &'static str,
    log_dir: Option<PathBuf>,
    _logger: LoggerHandle,
}

/// Starts the logger once per process.
///
/// Calling again with the same level and target is a no-op; any other
/// combination is refused because the backend cannot be swapped.
///
/// # Errors
/// Unknown level, relative or empty `log_dir`, a directory that cannot be
/// created, a conflicting second call, or a backend start failure.
pub fn init_logging(level: &str, log_dir: Option<&str>) -> Result<(), String> {
    let level = normalize_level(level)?;
    let log_dir = log_dir.map(normalize_log_dir).transpose()?;

    let state = LOGGING_STATE.get_or_try_init(|| start_logger(level, log_dir.clone()))?;
    ensure_same_config(state, level, log_dir.as_deref())
}

/// Active `(level, log_dir)`, `None` before [`init_logging`]. A `None`
/// directory means stderr.
pub fn logging_status() -> Option<(&'static str, Option<PathBuf>)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.level, state.log_dir.clone()))
}

/// `debug` in debug builds, `info` in release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(level: &'static str, log_dir: Option<PathBuf>) -> Result<LoggingState, String> {
    let logger = Logger::try_with_str(level)
        .map_err(|err| format!("invalid log level `{level}`: {err}"))?;

    let handle = match log_dir.as_deref() {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| {
                format!("failed to create log directory `{}`: {err}", dir.display())
            })?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
                .start()
        }
        None => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::detailed_format)
            .start(),
    }
    .map_err(|err| format!("failed to start logger: {err}"))?;

    info!(
        "event=logging_init module=core status=ok level={} target={} version={}",
        level,
        describe_target(log_dir.as_deref()),
        env!("CARGO_PKG_VERSION")
    );

    Ok(LoggingState {
        level,
        log_dir,
        _logger: handle,
    })
}

fn ensure_same_config(
    state: &LoggingState,
    level: &'static str,
    log_dir: Option<&Path>,
) -> Result<(), String> {
    if state.log_dir.as_deref() != log_dir {
        return Err(format!(
            "logging already writes to `{}`; refusing to switch to `{}`",
            describe_target(state.log_dir.as_deref()),
            describe_target(log_dir)
        ));
    }
    if state.level != level {
        return Err(format!(
            "logging already runs at `{}`; refusing to switch to `{}`",
            state.level, level
        ));
    }
    Ok(())
}

fn describe_target(log_dir: Option<&Path>) -> String {
    log_dir
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|| "stderr".to_string())
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn normalize_log_dir(log_dir: &str) -> Result<PathBuf, String> {
    let path = Path::new(log_dir.trim());
    if path.as_os_str().is_empty() || !path.is_absolute() {
        return Err(format!("log_dir must be an absolute path, got `{log_dir}`"));
    }
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::{describe_target, init_logging, logging_status, normalize_level, normalize_log_dir};

    #[test]
    fn levels_are_case_insensitive_and_accept_warning() {
        assert_eq!(normalize_level("INFO").unwrap(), "info");
        assert_eq!(normalize_level(" warning ").unwrap(), "warn");
        assert!(normalize_level("verbose").is_err());
    }

    #[test]
    fn log_dir_must_be_absolute() {
        assert!(normalize_log_dir("logs/dev").unwrap_err().contains("absolute"));
        assert!(normalize_log_dir("  ").is_err());
        assert_eq!(describe_target(None), "stderr");
    }

    #[test]
    fn second_init_must_match_first() {
        let log_dir = tempfile::tempdir().unwrap();
        let log_dir_str = log_dir.path().to_str().unwrap().to_string();

        init_logging("info", Some(&log_dir_str)).unwrap();
        init_logging("INFO", Some(&log_dir_str)).unwrap();

        let err = init_logging("debug", Some(&log_dir_str)).unwrap_err();
        assert!(err.contains("refusing to switch"));
        let err = init_logging("info", None).unwrap_err();
        assert!(err.contains("refusing to switch"));

        let (level, dir) = logging_status().unwrap();
        assert_eq!(level, "info");
        assert_eq!(dir.as_deref(), Some(log_dir.path()));
    }
}
