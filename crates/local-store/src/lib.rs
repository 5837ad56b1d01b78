//! File-backed event log.
//!
//! One record per line, `[YYYY-MM-DD HH:MM:SS] [LEVEL] message`, appended to a
//! single file. This is the operator-facing history of pushes; diagnostic
//! output goes through `tracing`.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Default log file name inside the data directory.
pub const LOG_FILE_NAME: &str = "autopush.log";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(.*?)\] \[(.*?)\] (.*)$").expect("valid log line regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogStoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(LogStoreError::UnknownLevel(s.to_string())),
        }
    }
}

/// One parsed log line. Lines with an unknown level do not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

impl LogRecord {
    fn parse(line: &str) -> Option<Self> {
        let caps = LINE_RE.captures(line)?;
        Some(Self {
            timestamp: caps[1].to_string(),
            level: caps[2].parse().ok()?,
            message: caps[3].to_string(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogStoreError {
    #[error("log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown log level: {0}")]
    UnknownLevel(String),
}

pub type Result<T> = std::result::Result<T, LogStoreError>;

/// Append-only log file with "last N" and "clear" views.
#[derive(Debug, Clone)]
pub struct LogStore {
    path: PathBuf,
    enabled: bool,
}

impl LogStore {
    pub fn new(path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            path: path.into(),
            enabled,
        }
    }

    /// Store at `<dir>/autopush.log`.
    pub fn in_dir(dir: &Path, enabled: bool) -> Self {
        Self::new(dir.join(LOG_FILE_NAME), enabled)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn io_err(&self) -> impl FnOnce(std::io::Error) -> LogStoreError + '_ {
        move |source| LogStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Append one record stamped with the local time. No-op when disabled.
    pub fn log(&self, level: LogLevel, message: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(self.io_err())?;
        }

        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT);
        // Keep one record per line.
        let message = message.replace(['\r', '\n'], " ");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(self.io_err())?;
        writeln!(file, "[{timestamp}] [{level}] {message}").map_err(self.io_err())
    }

    /// The newest `limit` records, newest first. Unparsable lines are skipped.
    pub fn last(&self, limit: usize) -> Result<Vec<LogRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(self.io_err())?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .rev()
            .filter_map(LogRecord::parse)
            .take(limit)
            .collect())
    }

    /// Truncate the log, then record that it was cleared.
    ///
    /// Returns `false` when there was no log file to clear.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::write(&self.path, "").map_err(self.io_err())?;
        self.log(LogLevel::Info, "Log file cleared")?;
        Ok(true)
    }
}
