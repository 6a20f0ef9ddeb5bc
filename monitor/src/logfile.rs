//! Append-only session log file
//!
//! Distinct from the tracing diagnostics: this is the user-facing
//! `--log-file` sink receiving timestamped startup info, per-tick data
//! lines, errors and the shutdown summary.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Utc;

use crate::error::Result;
use crate::sample::format_time;

/// Severity tag for a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
    /// Serialized sample records
    Data,
}

impl LogLevel {
    fn tag(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Error => "ERROR",
            LogLevel::Data => "DATA",
        }
    }
}

/// Append-only log file, flushed per write
#[derive(Debug)]
pub struct LogFile {
    file: File,
}

impl LogFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    pub fn write(&mut self, level: LogLevel, message: &str) {
        let line = format!("[{}] [{}] {}\n", format_time(Utc::now()), level.tag(), message);
        // Log writes are best-effort; a full disk must not kill a tick.
        if let Err(e) = self.file.write_all(line.as_bytes()).and_then(|_| self.file.flush()) {
            tracing::error!("log file write failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lines_carry_timestamp_and_level() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memwatch.log");

        let mut log = LogFile::open(&path).unwrap();
        log.write(LogLevel::Info, "monitoring started");
        log.write(LogLevel::Error, "disk check failed: no disks");
        log.write(LogLevel::Data, "{\"pid\":1}");

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("[INFO] monitoring started"));
        assert!(lines[1].contains("[ERROR] disk check failed"));
        assert!(lines[2].contains("[DATA] {\"pid\":1}"));
        // Bracketed timestamp prefix
        assert!(lines[0].starts_with('['));
    }

    #[test]
    fn open_appends_to_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memwatch.log");

        LogFile::open(&path).unwrap().write(LogLevel::Info, "first");
        LogFile::open(&path).unwrap().write(LogLevel::Info, "second");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
