/*!
# TV Engine

Backend-agnostic core of a minimal real-time renderer.

The crate describes how fixed-function and programmable GPU state is
assembled into an immutable pipeline object, and how each frame's image is
acquired, recorded into, submitted and presented. The GPU itself is reached
through collaborator traits implemented by a backend crate
(e.g. `tv_engine_renderer_vulkan`).

## Architecture

- **GraphicsDevice**: device/queue collaborator (shader modules, pipelines, command buffers)
- **Swapchain**: presentable images, render pass, frame synchronization
- **WindowProvider**: window collaborator (`Window` is the winit implementation)
- **PipelineConfig**: plain description of every fixed-function stage
- **GraphicsPipeline**: pipeline + shader modules, destroyed together
- **FrameRenderer**: pre-recorded command buffers and the per-frame protocol
*/

// Internal modules
mod error;
mod engine;
mod config;
pub mod log;
pub mod graphics_device;
pub mod pipeline;
pub mod frame;
pub mod window;

// Main tv namespace module
pub mod tv {
    // Error types
    pub use crate::error::{Error, ErrorCategory, Result};

    // Engine services (logging)
    pub use crate::engine::Engine;

    // Configuration
    pub use crate::config::{Config, DebugSeverity, DebugOutput, DebugMessageFilter, ValidationStats};

    // Logging sub-module (types only; the engine_* macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Device, swapchain and recording types
    pub mod render {
        pub use crate::graphics_device::*;
    }

    // Pipeline configuration and objects
    pub mod pipeline {
        pub use crate::pipeline::*;
    }

    // Frame protocol
    pub mod frame {
        pub use crate::frame::*;
    }

    // Window collaborator
    pub mod window {
        pub use crate::window::*;
    }
}
