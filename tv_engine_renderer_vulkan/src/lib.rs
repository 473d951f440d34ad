/*!
# TV Engine - Vulkan Backend

Vulkan implementation of the `tv_engine` collaborator traits, built on `ash`
with `gpu-allocator` for depth attachment memory.

- [`VulkanGraphicsDevice`] implements `GraphicsDevice` (instance, surface,
  device, queues, command pool)
- [`VulkanSwapchain`] implements `Swapchain` (images, depth attachments,
  render pass, framebuffers, frame synchronization)

# Example

```no_run
use std::sync::Arc;
use tv_engine::tv::Config;
use tv_engine::tv::window::{Window, WindowDesc, WindowProvider};
use tv_engine_renderer_vulkan::{VulkanGraphicsDevice, VulkanSwapchain};

# fn main() -> tv_engine::tv::Result<()> {
let window = Window::new(&WindowDesc::default())?;
let device = Arc::new(VulkanGraphicsDevice::new(&window, &Config::default())?);
let swapchain = VulkanSwapchain::new(Arc::clone(&device), window.extent())?;
# Ok(())
# }
```
*/

mod debug;
mod vulkan_format;
mod vulkan_graphics_device;
mod vulkan_swapchain;

pub use vulkan_graphics_device::VulkanGraphicsDevice;
pub use vulkan_swapchain::{VulkanSwapchain, MAX_FRAMES_IN_FLIGHT};

// Re-export debug utilities
pub use debug::{get_validation_stats, print_validation_stats_report};
