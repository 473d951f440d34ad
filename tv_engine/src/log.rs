//! Engine logging
//!
//! Every message goes through `Engine::log` / `Engine::log_detailed` to the
//! installed [`Logger`] ([`DefaultLogger`] unless replaced). Error messages
//! carry the file and line they were raised at. `engine_err!` and
//! `engine_bail!` log an error and build the matching `Error` value in one
//! step, so failures are reported where they happen.

use colored::*;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Destination for log entries
///
/// ```no_run
/// use tv_engine::tv::log::{Logger, LogEntry};
///
/// struct StderrOnly;
///
/// impl Logger for StderrOnly {
///     fn log(&self, entry: &LogEntry) {
///         eprintln!("{} {}", entry.source, entry.message);
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

/// One log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub timestamp: SystemTime,
    /// Emitting subsystem, e.g. "tv::pipeline" or "tv::vulkan"
    pub source: String,
    pub message: String,
    /// Set for errors raised through `engine_error!` / `engine_err!`
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl LogEntry {
    /// Entry stamped with the current time and no location
    pub fn new(severity: LogSeverity, source: &str, message: String) -> Self {
        Self {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_owned(),
            message,
            file: None,
            line: None,
        }
    }

    pub fn with_location(mut self, file: &'static str, line: u32) -> Self {
        self.file = Some(file);
        self.line = Some(line);
        self
    }
}

/// Severity, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogSeverity {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogSeverity {
    const ALL: [LogSeverity; 5] = [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ];

    /// Inverse of `as u8`; out-of-range values saturate to `Error`
    pub(crate) fn from_u8(value: u8) -> Self {
        Self::ALL.get(value as usize).copied().unwrap_or(LogSeverity::Error)
    }

    /// Case-insensitive severity name; "warning" is accepted for `Warn`
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("warning") {
            return Some(LogSeverity::Warn);
        }
        Self::ALL.into_iter().find(|severity| severity.label().eq_ignore_ascii_case(name))
    }

    /// Upper-case name as printed by the default logger
    pub fn label(self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO",
            LogSeverity::Warn => "WARN",
            LogSeverity::Error => "ERROR",
        }
    }

    fn colored_label(self) -> ColoredString {
        let padded = format!("{:<5}", self.label());
        match self {
            LogSeverity::Trace => padded.bright_black(),
            LogSeverity::Debug => padded.cyan(),
            LogSeverity::Info => padded.green(),
            LogSeverity::Warn => padded.yellow(),
            LogSeverity::Error => padded.red().bold(),
        }
    }
}

/// Colored console logger
///
/// `[YYYY-MM-DD HH:MM:SS.mmm] [SEVERITY] [source] message (file:line)`.
/// Warnings and errors go to stderr, everything else to stdout.
pub struct DefaultLogger;

impl DefaultLogger {
    fn location_suffix(entry: &LogEntry) -> String {
        match (entry.file, entry.line) {
            (Some(file), Some(line)) => format!(" ({}:{})", file, line),
            _ => String::new(),
        }
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let local: DateTime<Local> = entry.timestamp.into();
        let line = format!(
            "[{}] [{}] [{}] {}{}",
            local.format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.severity.colored_label(),
            entry.source.bright_blue(),
            entry.message,
            Self::location_suffix(entry)
        );

        if entry.severity >= LogSeverity::Warn {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

// ===== LOGGING MACROS =====

#[doc(hidden)]
#[macro_export]
macro_rules! __engine_log {
    ($severity:ident, $source:expr, $($arg:tt)*) => {
        $crate::tv::Engine::log(
            $crate::tv::log::LogSeverity::$severity,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log at TRACE
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Trace, $source, $($arg)*) };
}

/// Log at DEBUG
///
/// ```no_run
/// tv_engine::engine_debug!("tv::frame", "Recorded {} command buffers", 3);
/// ```
#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Debug, $source, $($arg)*) };
}

/// Log at INFO
#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Info, $source, $($arg)*) };
}

/// Log at WARN
#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Warn, $source, $($arg)*) };
}

/// Log at ERROR with the caller's file and line
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::tv::Engine::log_detailed(
            $crate::tv::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an ERROR and evaluate to the matching `Error` variant
///
/// The second argument names a message-carrying `Error` variant.
///
/// ```no_run
/// # fn f() -> tv_engine::tv::Result<()> {
/// let code = -3;
/// return Err(tv_engine::engine_err!("tv::vulkan", PipelineCreationFailed, "vkCreateGraphicsPipelines: {}", code));
/// # }
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $variant:ident, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::tv::Engine::log_detailed(
            $crate::tv::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::tv::Error::$variant(message)
    }};
}

/// Log an ERROR and return early with the matching `Error` variant
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $variant:ident, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $variant, $($arg)*))
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
