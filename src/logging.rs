// dbbackup/src/logging.rs
//! Log file setup.
//!
//! Every tracing event from this crate is appended to a single file as
//! `YYYY/MM/DD HH:MM:SS [LEVEL] message key=value ...`. The file is rotated
//! once at startup if it has grown past [`MAX_LOG_BYTES`]; it is never
//! rotated while the process runs.

use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::errors::{BackupError, Result};

pub const DEFAULT_LOG_FILE: &str = "backup.log";

/// Size above which the log file is rotated at startup (5 MiB).
pub const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;

/// One line per event, local time, bracketed level.
struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "{} [{}] ",
            Local::now().format("%Y/%m/%d %H:%M:%S"),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Renames `path` to `<path>.<YYYYMMDD-HHMMSS>` if it is larger than
/// [`MAX_LOG_BYTES`]. Returns the new name when a rotation happened.
pub fn rotate_if_oversized(path: &Path, now: NaiveDateTime) -> Result<Option<PathBuf>> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(BackupError::io(
                format!("stat log file {}", path.display()),
                e,
            ));
        }
    };
    if size <= MAX_LOG_BYTES {
        return Ok(None);
    }

    let mut rotated = path.as_os_str().to_owned();
    rotated.push(format!(".{}", now.format("%Y%m%d-%H%M%S")));
    let rotated = PathBuf::from(rotated);

    fs::rename(path, &rotated).map_err(|e| {
        BackupError::io(
            format!("rotate log file {} to {}", path.display(), rotated.display()),
            e,
        )
    })?;
    Ok(Some(rotated))
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(BackupError::Config(format!(
            "invalid log level {other:?} (expected trace, debug, info, warn or error)"
        ))),
    }
}

/// The open log file. Keep it alive until the process is done logging;
/// dropping it flushes buffered lines.
pub struct LogSession {
    path: PathBuf,
    _guard: WorkerGuard,
}

impl LogSession {
    /// Rotates the file if needed, opens it for appending and installs the
    /// global subscriber. `RUST_LOG` overrides `level` when set.
    pub fn open(path: &Path, level: &str) -> Result<Self> {
        let level = parse_log_level(level)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                BackupError::io(format!("create log directory {}", parent.display()), e)
            })?;
        }
        let rotated = rotate_if_oversized(path, Local::now().naive_local())?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| BackupError::io(format!("open log file {}", path.display()), e))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_CRATE_NAME"),
                level.as_str().to_ascii_lowercase()
            ))
        });

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .event_format(LineFormat)
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_filter(filter),
            )
            .try_init()
            .map_err(|e| BackupError::Config(format!("initialize logging: {e}")))?;

        if let Some(rotated) = rotated {
            tracing::info!(rotated_to = %rotated.display(), "Rotated oversized log file");
        }

        Ok(LogSession {
            path: path.to_path_buf(),
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_missing_log_file_is_not_rotated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.log");
        assert_eq!(rotate_if_oversized(&path, noon()).unwrap(), None);
    }

    #[test]
    fn test_log_file_at_limit_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.log");
        fs::write(&path, vec![b'x'; MAX_LOG_BYTES as usize]).unwrap();

        assert_eq!(rotate_if_oversized(&path, noon()).unwrap(), None);
        assert!(path.exists());
    }

    #[test]
    fn test_oversized_log_file_is_renamed_with_timestamp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.log");
        fs::write(&path, vec![b'x'; MAX_LOG_BYTES as usize + 1]).unwrap();

        let rotated = rotate_if_oversized(&path, noon()).unwrap().unwrap();

        assert_eq!(rotated, dir.path().join("backup.log.20240305-120000"));
        assert!(!path.exists());
        assert_eq!(fs::metadata(&rotated).unwrap().len(), MAX_LOG_BYTES + 1);
    }

    #[test]
    fn test_log_level_names() {
        assert_eq!(parse_log_level("INFO").unwrap(), Level::INFO);
        assert_eq!(parse_log_level("warning").unwrap(), Level::WARN);
        assert!(matches!(parse_log_level("loud"), Err(BackupError::Config(_))));
    }

    #[test]
    fn test_line_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.log");
        let file = fs::File::create(&path).unwrap();

        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .event_format(LineFormat)
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        );
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Backup completed successfully");
            tracing::error!(code = 2, "Dump failed");
        });

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" [INFO] Backup completed successfully"), "{}", lines[0]);
        assert!(lines[1].ends_with(" [ERROR] Dump failed code=2"), "{}", lines[1]);
        // "YYYY/MM/DD HH:MM:SS" prefix
        assert_eq!(lines[0].find(" [INFO]"), Some(19));
    }
}
