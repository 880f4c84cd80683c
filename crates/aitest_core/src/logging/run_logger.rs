//! Run logger with file and console output.
//!
//! A single logger is created at startup and shared by every component:
//! - Writes timestamped lines to the configured log file
//! - Mirrors every line to the `tracing` console subscriber
//! - Supports a runtime level override

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogLevel, MessagePrefix};

/// Shared logger for one automation run.
pub struct RunLogger {
    log_path: Option<PathBuf>,
    /// `None` for console-only loggers and after [`RunLogger::close`].
    file_writer: Mutex<Option<BufWriter<File>>>,
    level: Mutex<LogLevel>,
}

impl RunLogger {
    /// Create a logger writing to `log_file`.
    ///
    /// Parent directories are created as needed and an existing file is
    /// appended to.
    pub fn new(log_file: impl AsRef<Path>, level: LogLevel) -> std::io::Result<Self> {
        let log_path = log_file.as_ref().to_path_buf();

        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            log_path: Some(log_path),
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            level: Mutex::new(level),
        })
    }

    /// Create a logger that only mirrors to the console.
    pub fn console(level: LogLevel) -> Self {
        Self {
            log_path: None,
            file_writer: Mutex::new(None),
            level: Mutex::new(level),
        }
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Current minimum level.
    pub fn level(&self) -> LogLevel {
        *self.level.lock()
    }

    /// Change the minimum level at runtime.
    pub fn set_level(&self, level: LogLevel) {
        *self.level.lock() = level;
        self.debug(&format!("Logger level updated to {}", level));
    }

    /// Emit `message` to the console and, when attached, the log file.
    ///
    /// File lines read `[%Y-%m-%d %H:%M:%S] [LEVEL] message`.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.level() {
            return;
        }

        match level {
            LogLevel::Trace => tracing::trace!("{}", message),
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }

        if let Some(ref mut writer) = *self.file_writer.lock() {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            let _ = writeln!(writer, "[{}] [{}] {}", timestamp, level, message);
        }
    }

    pub fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// `$ <command line>` for a launched process.
    pub fn command(&self, command: &str) {
        self.info(&MessagePrefix::Command.format(command));
    }

    /// Step marker: `=== <step> ===`.
    pub fn phase(&self, phase_name: &str) {
        self.info(&MessagePrefix::Phase.format(phase_name));
    }

    pub fn success(&self, message: &str) {
        self.info(&MessagePrefix::Success.format(message));
    }

    /// Flush the log file.
    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Flush and detach the log file; later messages go to the console only.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("nested").join("run.log");
        let logger = RunLogger::new(&path, LogLevel::Info).unwrap();

        assert!(path.exists());
        assert_eq!(logger.log_path(), Some(path.as_path()));
    }

    #[test]
    fn writes_level_and_timestamp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.log");
        let logger = RunLogger::new(&path, LogLevel::Info).unwrap();

        logger.warn("camera missing");
        logger.flush();

        let content = fs::read_to_string(&path).unwrap();
        let line = content.lines().next().unwrap();
        assert!(line.starts_with('['));
        assert!(line.contains("[WARNING] camera missing"));
    }

    #[test]
    fn filters_below_level_and_honours_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.log");
        let logger = RunLogger::new(&path, LogLevel::Info).unwrap();

        logger.debug("hidden");
        logger.set_level(LogLevel::Debug);
        logger.debug("visible");
        logger.close();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("hidden"));
        assert!(content.contains("visible"));
    }

    #[test]
    fn close_stops_file_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.log");
        let logger = RunLogger::new(&path, LogLevel::Info).unwrap();

        logger.info("before");
        logger.close();
        logger.info("after");

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("before"));
        assert!(!content.contains("after"));
    }

    #[test]
    fn console_logger_has_no_file() {
        let logger = RunLogger::console(LogLevel::Debug);
        logger.info("console only");
        assert!(logger.log_path().is_none());
    }
}
