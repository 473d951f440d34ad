/// Application settings with environment overrides

use tv_engine::tv::log::LogSeverity;
use tv_engine::engine_warn;

/// Environment variable overriding the vertex shader path
pub const ENV_VERT_SHADER: &str = "TV_VERT_SHADER";
/// Environment variable overriding the fragment shader path
pub const ENV_FRAG_SHADER: &str = "TV_FRAG_SHADER";
/// Environment variable overriding the minimum log severity
pub const ENV_LOG_LEVEL: &str = "TV_LOG_LEVEL";
/// Environment variable enabling/disabling the validation layer
pub const ENV_VALIDATION: &str = "TV_VALIDATION";

#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vertex_shader: String,
    pub fragment_shader: String,
    /// None keeps the engine's build-dependent default
    pub log_level: Option<LogSeverity>,
    /// None keeps the renderer config default (on in debug builds)
    pub validation: Option<bool>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            title: "Hello Vulkan".to_string(),
            width: 800,
            height: 600,
            vertex_shader: "shaders/simple_shader.vert.spv".to_string(),
            fragment_shader: "shaders/simple_shader.frag.spv".to_string(),
            log_level: None,
            validation: None,
        }
    }
}

impl AppSettings {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`; unparsable values are ignored with a warning
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(path) = lookup(ENV_VERT_SHADER) {
            settings.vertex_shader = path;
        }
        if let Some(path) = lookup(ENV_FRAG_SHADER) {
            settings.fragment_shader = path;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            settings.log_level = LogSeverity::parse(&level);
            if settings.log_level.is_none() {
                engine_warn!("tv::demo", "Ignoring {}={:?}: unknown severity", ENV_LOG_LEVEL, level);
            }
        }
        if let Some(flag) = lookup(ENV_VALIDATION) {
            settings.validation = parse_flag(&flag);
            if settings.validation.is_none() {
                engine_warn!("tv::demo", "Ignoring {}={:?}: expected on/off", ENV_VALIDATION, flag);
            }
        }

        settings
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
