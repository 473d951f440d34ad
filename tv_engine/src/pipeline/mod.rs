/// Pipeline module - fixed-function state, shader loading and pipeline objects

pub mod pipeline_state;
pub mod pipeline_config;
pub mod shader;
pub mod pipeline_layout;
pub mod graphics_pipeline;

pub use pipeline_state::*;
pub use pipeline_config::*;
pub use shader::*;
pub use pipeline_layout::*;
pub use graphics_pipeline::*;
