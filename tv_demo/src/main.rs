//! Hello Vulkan: one hardcoded triangle drawn through tv_engine
//!
//! Shader binaries are compiled from `shaders/*.vert` / `shaders/*.frag`
//! with `glslc` (see `shaders/compile.sh`). Paths can be overridden with
//! `TV_VERT_SHADER` / `TV_FRAG_SHADER`.

mod app;
mod settings;

use tv_engine::tv::Engine;
use tv_engine::{engine_error, engine_info};

use app::FirstApp;
use settings::AppSettings;

fn main() {
    let settings = AppSettings::from_env();
    if let Some(severity) = settings.log_level {
        Engine::set_min_severity(severity);
    }

    match FirstApp::new(&settings).and_then(|mut app| app.run()) {
        Ok(frames) => {
            engine_info!("tv::demo", "Exited cleanly after {} frames", frames);
            if settings.validation.unwrap_or(cfg!(debug_assertions)) {
                tv_engine_renderer_vulkan::print_validation_stats_report();
            }
        }
        Err(e) => {
            engine_error!("tv::demo", "Fatal error: {}", e);
            std::process::exit(1);
        }
    }
}
