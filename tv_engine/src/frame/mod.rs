/// Frame module - pre-recorded command buffers and the per-frame protocol

pub mod frame_renderer;
pub mod frame_loop;

pub use frame_renderer::*;
pub use frame_loop::*;
