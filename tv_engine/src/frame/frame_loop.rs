/// Frame loop driver

use crate::error::Result;
use crate::frame::FrameRenderer;
use crate::graphics_device::Swapchain;
use crate::window::WindowProvider;

/// Poll input and draw one frame per iteration until the window asks to close
///
/// Returns the number of frames drawn. The first error ends the loop.
pub fn run_frame_loop(
    window: &mut dyn WindowProvider,
    swapchain: &mut dyn Swapchain,
    renderer: &mut FrameRenderer,
) -> Result<u64> {
    let mut frames = 0u64;
    while !window.should_close() {
        window.poll_events();
        renderer.draw_frame(swapchain)?;
        frames += 1;
    }
    crate::engine_info!("tv::frame_loop", "Window closed after {} frames", frames);
    Ok(frames)
}

#[cfg(test)]
#[path = "frame_loop_tests.rs"]
mod tests;
