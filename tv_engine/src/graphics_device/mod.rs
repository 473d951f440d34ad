/// Graphics device module - collaborator traits and the types they exchange

pub mod handles;
pub mod types;
pub mod graphics_device;
pub mod swapchain;
pub mod command_recording;

pub use handles::*;
pub use types::*;
pub use graphics_device::*;
pub use swapchain::*;
pub use command_recording::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
