/// Structured logging for the plot monitoring service
///
/// Provides context-rich logging with service and plot identifiers,
/// timestamps, and severity levels. Supports both console output
/// and file-based logging for long-running use.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

use crate::model::PlotError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Service Tags
// ---------------------------------------------------------------------------

/// Which part of the service a log line concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Analytics,
    AiHistory,
    AiSummary,
    Inventory,
    Store,
    System,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Analytics => write!(f, "ANALYTICS"),
            Service::AiHistory => write!(f, "AI-HISTORY"),
            Service::AiSummary => write!(f, "AI-SUMMARY"),
            Service::Inventory => write!(f, "INVENTORY"),
            Service::Store => write!(f, "STORE"),
            Service::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - no plot selected, or the plot simply has no data yet
    Expected,
    /// Unexpected failure - indicates service degradation or a payload change
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn format_entry(level: LogLevel, service: Service, plot_id: Option<&str>, message: &str) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let plot_part = plot_id.map(|p| format!(" [plot {}]", p)).unwrap_or_default();
        format!("{} {} {}{}: {}", timestamp, level, service, plot_part, message)
    }

    fn log(&self, level: LogLevel, service: Service, plot_id: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = Self::format_entry(level, service, plot_id, message);
        let plot_part = plot_id.map(|p| format!(" [plot {}]", p)).unwrap_or_default();

        // Diagnostics go to stderr so stdout stays clean for JSON output.
        if self.console_timestamps {
            eprintln!("{}", log_entry);
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", service, plot_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", service, plot_part, message),
                LogLevel::Info => eprintln!("   {}", message),
                LogLevel::Debug => eprintln!("   [DEBUG] {}{}: {}", service, plot_part, message),
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn log_at(level: LogLevel, service: Service, plot_id: Option<&str>, message: &str) {
    // A poisoned lock or an uninitialized logger silently drops the line.
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, service, plot_id, message);
        }
    }
}

/// Log a general informational message
pub fn info(service: Service, plot_id: Option<&str>, message: &str) {
    log_at(LogLevel::Info, service, plot_id, message);
}

/// Log a warning message
pub fn warn(service: Service, plot_id: Option<&str>, message: &str) {
    log_at(LogLevel::Warning, service, plot_id, message);
}

/// Log an error message
pub fn error(service: Service, plot_id: Option<&str>, message: &str) {
    log_at(LogLevel::Error, service, plot_id, message);
}

/// Log a debug message
pub fn debug(service: Service, plot_id: Option<&str>, message: &str) {
    log_at(LogLevel::Debug, service, plot_id, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a fetch or decode failure.
pub fn classify_fetch_failure(err: &PlotError) -> FailureType {
    match err {
        PlotError::NoPlotSelected => FailureType::Expected,
        // 404 is how the service reports a plot without analyses yet.
        PlotError::HttpError(404) => FailureType::Expected,
        PlotError::HttpError(code) if *code >= 500 => FailureType::Unexpected,
        PlotError::HttpError(_) => FailureType::Unknown,
        // Parse errors suggest a payload change or a bug
        PlotError::ParseError(_) | PlotError::InvalidUrl(_) => FailureType::Unexpected,
        PlotError::Transport(msg) if msg.contains("timed out") => FailureType::Unexpected,
        PlotError::Transport(_) => FailureType::Unknown,
        PlotError::InvalidWindow { .. } | PlotError::InvalidRange(_) => FailureType::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a fetch failure with automatic classification
pub fn log_fetch_failure(service: Service, plot_id: Option<&str>, operation: &str, err: &PlotError) {
    let failure_type = classify_fetch_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(service, plot_id, &message),
        FailureType::Unexpected => error(service, plot_id, &message),
        FailureType::Unknown => warn(service, plot_id, &message),
    }
}

// ---------------------------------------------------------------------------
// Refresh Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one plot refresh
pub fn log_refresh_summary(plot_id: &str, total: usize, applied: usize, failed: usize) {
    let message = format!(
        "Refresh complete: {}/{} applied, {} failed",
        applied, total, failed
    );

    if failed == 0 {
        info(Service::Store, Some(plot_id), &message);
    } else if applied == 0 {
        error(Service::Store, Some(plot_id), &message);
    } else {
        warn(Service::Store, Some(plot_id), &message);
    }
}
