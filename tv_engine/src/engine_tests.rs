//! Unit tests for the Engine logging facade
//!
//! IMPORTANT: LOGGER and MIN_SEVERITY are process-wide.
//! All tests are marked with #[serial] and restore the defaults on exit.

use crate::tv::{Engine, Error};
use crate::tv::log::{Logger, LogEntry, LogSeverity};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Test logger that captures log entries for verification
///
/// Only entries from the "tv::test" source are kept: unrelated tests running
/// on other threads may log while this logger is installed.
#[derive(Clone)]
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CaptureLogger {
    fn install() -> Self {
        let logger = Self { entries: Arc::new(Mutex::new(Vec::new())) };
        Engine::set_logger(logger.clone());
        Engine::set_min_severity(LogSeverity::Trace);
        logger
    }

    fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        if entry.source != "tv::test" {
            return;
        }
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn teardown() {
    Engine::reset_logger();
    Engine::reset_min_severity();
}

// ============================================================================
// LOGGER REGISTRATION
// ============================================================================

#[test]
#[serial]
fn test_default_logger_logs_without_panic() {
    Engine::reset_logger();
    Engine::log(LogSeverity::Info, "tv::test", "default logger".to_string());
    teardown();
}

#[test]
#[serial]
fn test_custom_logger_receives_logs() {
    let logger = CaptureLogger::install();

    Engine::log(LogSeverity::Info, "tv::test", "hello".to_string());

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Info);
    assert_eq!(entries[0].source, "tv::test");
    assert_eq!(entries[0].message, "hello");
    assert!(entries[0].file.is_none());
    teardown();
}

#[test]
#[serial]
fn test_reset_logger_detaches_custom_logger() {
    let logger = CaptureLogger::install();
    Engine::reset_logger();

    Engine::log(LogSeverity::Info, "tv::test", "not captured".to_string());

    assert!(logger.entries().is_empty());
    teardown();
}

#[test]
#[serial]
fn test_log_detailed_with_file_line() {
    let logger = CaptureLogger::install();

    Engine::log_detailed(LogSeverity::Error, "tv::test", "boom".to_string(), "frame.rs", 7);

    let entries = logger.entries();
    assert_eq!(entries[0].file, Some("frame.rs"));
    assert_eq!(entries[0].line, Some(7));
    teardown();
}

// ============================================================================
// SEVERITY FILTER
// ============================================================================

#[test]
#[serial]
fn test_min_severity_filters_lower_entries() {
    let logger = CaptureLogger::install();
    Engine::set_min_severity(LogSeverity::Warn);

    Engine::log(LogSeverity::Debug, "tv::test", "dropped".to_string());
    Engine::log(LogSeverity::Info, "tv::test", "dropped".to_string());
    Engine::log(LogSeverity::Warn, "tv::test", "kept".to_string());
    Engine::log_detailed(LogSeverity::Error, "tv::test", "kept".to_string(), "x.rs", 1);

    let entries = logger.entries();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.message == "kept"));
    teardown();
}

#[test]
#[serial]
fn test_min_severity_round_trip() {
    Engine::set_min_severity(LogSeverity::Error);
    assert_eq!(Engine::min_severity(), LogSeverity::Error);
    Engine::reset_min_severity();
    assert!(Engine::min_severity() <= LogSeverity::Info);
}

// ============================================================================
// MACROS
// ============================================================================

#[test]
#[serial]
fn test_level_macros_route_to_logger() {
    let logger = CaptureLogger::install();

    crate::engine_trace!("tv::test", "t{}", 1);
    crate::engine_debug!("tv::test", "d{}", 2);
    crate::engine_info!("tv::test", "i{}", 3);
    crate::engine_warn!("tv::test", "w{}", 4);
    crate::engine_error!("tv::test", "e{}", 5);

    let entries = logger.entries();
    let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["t1", "d2", "i3", "w4", "e5"]);
    assert!(entries[4].file.is_some());
    assert!(entries[4].line.is_some());
    teardown();
}

#[test]
#[serial]
fn test_engine_err_logs_and_builds_variant() {
    let logger = CaptureLogger::install();

    let err = crate::engine_err!("tv::test", PipelineCreationFailed, "code {}", -3);

    match err {
        Error::PipelineCreationFailed(msg) => assert_eq!(msg, "code -3"),
        other => panic!("unexpected error: {:?}", other),
    }
    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Error);
    assert_eq!(entries[0].message, "code -3");
    teardown();
}

#[test]
#[serial]
fn test_engine_bail_returns_early() {
    let logger = CaptureLogger::install();

    fn fails(reached: &mut bool) -> crate::tv::Result<()> {
        crate::engine_bail!("tv::test", FrameProtocol, "image index {} out of range", 9);
        #[allow(unreachable_code)]
        {
            *reached = true;
            Ok(())
        }
    }

    let mut reached = false;
    let result = fails(&mut reached);

    assert!(matches!(result, Err(Error::FrameProtocol(_))));
    assert!(!reached);
    assert_eq!(logger.entries().len(), 1);
    teardown();
}
