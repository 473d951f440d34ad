//! Integration tests for the Engine logging system
//!
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use tv_engine::tv::{Engine, Error};
use tv_engine::tv::log::{Logger, LogEntry, LogSeverity};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn teardown() {
    Engine::reset_logger();
    Engine::reset_min_severity();
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);
    Engine::set_min_severity(LogSeverity::Trace);

    Engine::log(LogSeverity::Info, "test::module", "Test info message".to_string());
    Engine::log(LogSeverity::Warn, "test::module", "Test warning message".to_string());

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].severity, LogSeverity::Info);
        assert_eq!(captured[0].message, "Test info message");
        assert_eq!(captured[1].severity, LogSeverity::Warn);
        assert!(captured[1].file.is_none());
    }

    teardown();
}

#[test]
#[serial]
fn test_integration_min_severity_filters_entries() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);
    Engine::set_min_severity(LogSeverity::Warn);

    tv_engine::engine_debug!("test::filter", "dropped");
    tv_engine::engine_info!("test::filter", "dropped too");
    tv_engine::engine_warn!("test::filter", "kept");

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].message, "kept");
    }

    teardown();
}

#[test]
#[serial]
fn test_integration_engine_err_logs_and_builds_error() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    let err = tv_engine::engine_err!("test::error", PipelineCreationFailed, "vkCreateGraphicsPipelines: {}", -3);

    match err {
        Error::PipelineCreationFailed(msg) => assert_eq!(msg, "vkCreateGraphicsPipelines: -3"),
        other => panic!("unexpected error: {:?}", other),
    }

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].severity, LogSeverity::Error);
        assert_eq!(captured[0].source, "test::error");
        assert!(captured[0].file.is_some());
        assert!(captured[0].line.is_some());
    }

    teardown();
}

#[test]
#[serial]
fn test_integration_engine_bail_returns_early() {
    let (test_logger, entries) = TestLogger::new();
    Engine::set_logger(test_logger);

    fn acquire(index: u32, count: u32) -> tv_engine::tv::Result<u32> {
        if index >= count {
            tv_engine::engine_bail!("test::bail", FrameProtocol, "index {} out of range", index);
        }
        Ok(index)
    }

    assert_eq!(acquire(1, 2).unwrap(), 1);
    assert!(matches!(acquire(2, 2), Err(Error::FrameProtocol(_))));
    assert_eq!(entries.lock().unwrap().len(), 1);

    teardown();
}
