/// Validation layer messages routed into the engine logger
///
/// Messages are filtered by severity and category, counted per level and
/// per text, then logged under `tv::validation` and/or appended to a file.

use ash::vk;
use colored::*;
use tv_engine::tv::{DebugMessageFilter, DebugOutput, DebugSeverity, Engine, ValidationStats};
use tv_engine::tv::log::LogSeverity;
use std::collections::HashMap;
use std::ffi::{c_char, CStr};
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

const LOG_SOURCE: &str = "tv::validation";

/// Messenger settings, installed while a device is alive
static MESSENGER_CONFIG: Mutex<Option<Config>> = Mutex::new(None);

/// Counters indexed by `MessageLevel`
static LEVEL_COUNTS: [AtomicU32; 4] = [
    AtomicU32::new(0),
    AtomicU32::new(0),
    AtomicU32::new(0),
    AtomicU32::new(0),
];

/// Occurrences per message text
static REPEATS: Mutex<Option<HashMap<String, u32>>> = Mutex::new(None);

#[derive(Clone)]
pub(crate) struct Config {
    pub severity: DebugSeverity,
    pub output: DebugOutput,
    pub message_filter: DebugMessageFilter,
    pub panic_on_error: bool,
    pub enable_stats: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Verbose = 3,
}

impl MessageLevel {
    /// Highest level present in `flags`
    fn from_flags(flags: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            Self::Error
        } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            Self::Warning
        } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            Self::Info
        } else {
            Self::Verbose
        }
    }

    fn log_severity(self) -> LogSeverity {
        match self {
            Self::Error => LogSeverity::Error,
            Self::Warning => LogSeverity::Warn,
            Self::Info => LogSeverity::Info,
            Self::Verbose => LogSeverity::Trace,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Verbose => "VERBOSE",
        }
    }

    fn counter(self) -> &'static AtomicU32 {
        &LEVEL_COUNTS[self as usize]
    }
}

/// Install the messenger settings and clear every counter
pub(crate) fn init_debug_config(config: Config) {
    for counter in &LEVEL_COUNTS {
        counter.store(0, Ordering::Relaxed);
    }
    if let Ok(mut repeats) = REPEATS.lock() {
        *repeats = Some(HashMap::new());
    }
    if let Ok(mut installed) = MESSENGER_CONFIG.lock() {
        *installed = Some(config);
    }
}

/// Drop the messenger settings; later messages are ignored
pub(crate) fn cleanup_debug_config() {
    if let Ok(mut installed) = MESSENGER_CONFIG.lock() {
        *installed = None;
    }
}

/// Severity flags the messenger subscribes to
pub(crate) fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    let errors = vk::DebugUtilsMessageSeverityFlagsEXT::ERROR;
    let warnings = errors | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING;
    match severity {
        DebugSeverity::ErrorsOnly => errors,
        DebugSeverity::ErrorsAndWarnings => warnings,
        DebugSeverity::All => {
            warnings
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

/// Counts of validation messages received since the device was created
pub fn get_validation_stats() -> ValidationStats {
    let count = |level: MessageLevel| level.counter().load(Ordering::Relaxed);
    ValidationStats {
        errors: count(MessageLevel::Error),
        warnings: count(MessageLevel::Warning),
        info: count(MessageLevel::Info),
        verbose: count(MessageLevel::Verbose),
    }
}

/// Print the validation counters to stdout
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();
    if stats.total() == 0 {
        println!("{}", "Validation: no messages".green().bold());
        return;
    }

    let repeated = REPEATS
        .lock()
        .ok()
        .and_then(|repeats| repeats.as_ref().map(|map| map.values().filter(|&&n| n > 1).count()))
        .unwrap_or(0);

    println!("{}", "Validation report".bright_blue().bold());
    let rows = [
        (stats.errors, "errors:".red().bold()),
        (stats.warnings, "warnings:".yellow().bold()),
        (stats.info, "info:".cyan()),
        (stats.verbose, "verbose:".bright_black()),
    ];
    for (count, label) in rows.iter().filter(|(count, _)| *count > 0) {
        println!("  {} {}", label, count);
    }
    println!("  {} {}", "total:".bold(), stats.total());
    if repeated > 0 {
        println!("  {} distinct message(s) repeated", repeated);
    }
}

fn severity_selected(severity: DebugSeverity, message_severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> bool {
    message_severity.intersects(severity_flags(severity))
}

fn category_label(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "performance"
    } else {
        "general"
    }
}

fn category_selected(filter: &DebugMessageFilter, message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> bool {
    match category_label(message_type) {
        "validation" => filter.show_validation,
        "performance" => filter.show_performance,
        _ => filter.show_general,
    }
}

/// Number of times `message` has been seen, this one included
fn record_repeat(message: &str) -> u32 {
    let Ok(mut repeats) = REPEATS.lock() else {
        return 1;
    };
    let count = repeats
        .get_or_insert_with(HashMap::new)
        .entry(message.to_owned())
        .or_insert(0);
    *count += 1;
    *count
}

fn format_message(category: &str, message_id: &str, message: &str, occurrences: u32) -> String {
    if occurrences > 1 {
        format!("[{}] {} (seen {} times): {}", category, message_id, occurrences, message)
    } else {
        format!("[{}] {}: {}", category, message_id, message)
    }
}

/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn c_str_or<'a>(ptr: *const c_char, fallback: &'a str) -> &'a str {
    if ptr.is_null() {
        fallback
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap_or("<invalid utf-8>")
    }
}

/// Debug-utils messenger callback
///
/// # Safety
///
/// Called by the Vulkan loader with a valid callback data pointer.
pub(crate) unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    let Some(config) = MESSENGER_CONFIG.lock().ok().and_then(|installed| installed.clone()) else {
        return vk::FALSE;
    };
    if p_callback_data.is_null()
        || !severity_selected(config.severity, message_severity)
        || !category_selected(&config.message_filter, message_type)
    {
        return vk::FALSE;
    }

    let data = unsafe { &*p_callback_data };
    let message_id = unsafe { c_str_or(data.p_message_id_name, "unnamed") };
    let message = unsafe { c_str_or(data.p_message, "") };

    let level = MessageLevel::from_flags(message_severity);
    let occurrences = if config.enable_stats {
        level.counter().fetch_add(1, Ordering::Relaxed);
        record_repeat(message)
    } else {
        1
    };

    let line = format_message(category_label(message_type), message_id, message, occurrences);
    match &config.output {
        DebugOutput::Console => Engine::log(level.log_severity(), LOG_SOURCE, line.clone()),
        DebugOutput::File(path) => append_to_file(path, level, &line),
        DebugOutput::Both(path) => {
            Engine::log(level.log_severity(), LOG_SOURCE, line.clone());
            append_to_file(path, level, &line);
        }
    }

    if config.panic_on_error && level == MessageLevel::Error {
        panic!("Vulkan validation error: {}", line);
    }

    vk::FALSE
}

fn append_to_file(path: &str, level: MessageLevel, line: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "[{}] {}", level.label(), line);
    }
}
