/// FrameRenderer - acquire, submit and present with pre-recorded command buffers
///
/// One primary command buffer per swapchain image is allocated and recorded
/// exactly once at construction:
///
/// ```text
/// begin -> begin render pass (framebuffer i, full extent, clears)
///       -> bind pipeline -> draw(3, 1, 0, 0) -> end render pass -> end
/// ```
///
/// Each frame then re-submits the buffer matching the acquired image index.
/// The swapchain owns all semaphores and fences.

use std::sync::{Arc, Weak};
use crate::error::Result;
use crate::graphics_device::{
    ClearValue, CommandBufferHandle, CommandRecording, GraphicsDevice, Rect2D, RenderPassBeginInfo,
    Swapchain,
};
use crate::pipeline::GraphicsPipeline;

/// Color attachment clear value
pub const CLEAR_COLOR: [f32; 4] = [0.1, 0.1, 0.1, 1.0];

/// Depth/stencil attachment clear value
pub const CLEAR_DEPTH_STENCIL: ClearValue = ClearValue::DepthStencil { depth: 1.0, stencil: 0 };

/// Vertices of the hardcoded triangle (generated in the vertex shader)
pub const TRIANGLE_VERTEX_COUNT: u32 = 3;

pub struct FrameRenderer {
    device: Weak<dyn GraphicsDevice>,
    command_buffers: Vec<CommandBufferHandle>,
    frames_drawn: u64,
    suboptimal_reported: bool,
}

impl FrameRenderer {
    /// Allocate and record one command buffer per swapchain image
    ///
    /// # Errors
    ///
    /// `CommandBufferAllocationFailed`, or `CommandRecordingFailed` after
    /// which every allocated buffer has been freed.
    pub fn new(
        device: &Arc<dyn GraphicsDevice>,
        swapchain: &dyn Swapchain,
        pipeline: &GraphicsPipeline,
    ) -> Result<Self> {
        let image_count = swapchain.image_count();
        let command_buffers = device.allocate_command_buffers(image_count as u32)?;

        // From here on Drop frees the buffers if recording fails
        let renderer = Self {
            device: Arc::downgrade(device),
            command_buffers,
            frames_drawn: 0,
            suboptimal_reported: false,
        };

        for (index, &command_buffer) in renderer.command_buffers.iter().enumerate() {
            record_frame(device.as_ref(), swapchain, pipeline, command_buffer, index)?;
        }

        crate::engine_debug!("tv::FrameRenderer", "Recorded {} command buffers", image_count);

        Ok(renderer)
    }

    /// Run one frame: acquire, submit the matching buffer, present
    ///
    /// Returns the image index that was drawn. A suboptimal acquire is drawn
    /// like a ready one and reported once.
    ///
    /// # Errors
    ///
    /// `SwapchainOutOfDate`, `AcquireFailed`, `SubmissionFailed`, or
    /// `FrameProtocol` when the swapchain returns an index without a buffer.
    pub fn draw_frame(&mut self, swapchain: &mut dyn Swapchain) -> Result<u32> {
        let acquired = swapchain.acquire_next_image()?;
        if acquired.is_suboptimal() && !self.suboptimal_reported {
            crate::engine_warn!("tv::FrameRenderer", "Swapchain is suboptimal for the surface; drawing anyway");
            self.suboptimal_reported = true;
        }

        let image_index = acquired.index();
        let command_buffer = self.command_buffer(image_index as usize).ok_or_else(|| {
            crate::engine_err!(
                "tv::FrameRenderer",
                FrameProtocol,
                "Acquired image index {} but only {} command buffers were recorded",
                image_index,
                self.command_buffers.len()
            )
        })?;

        swapchain.submit_and_present(command_buffer, image_index)?;
        self.frames_drawn += 1;

        Ok(image_index)
    }

    /// Pre-recorded buffer for image `index`
    pub fn command_buffer(&self, index: usize) -> Option<CommandBufferHandle> {
        self.command_buffers.get(index).copied()
    }

    pub fn command_buffer_count(&self) -> usize {
        self.command_buffers.len()
    }

    /// Frames successfully submitted and presented
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }
}

impl Drop for FrameRenderer {
    fn drop(&mut self) {
        match self.device.upgrade() {
            Some(device) => device.free_command_buffers(&self.command_buffers),
            None => crate::engine_error!(
                "tv::FrameRenderer",
                "Device destroyed before {} command buffers were freed; buffers leaked",
                self.command_buffers.len()
            ),
        }
    }
}

fn record_frame(
    device: &dyn GraphicsDevice,
    swapchain: &dyn Swapchain,
    pipeline: &GraphicsPipeline,
    command_buffer: CommandBufferHandle,
    index: usize,
) -> Result<()> {
    let clear_values = [ClearValue::Color(CLEAR_COLOR), CLEAR_DEPTH_STENCIL];
    let begin_info = RenderPassBeginInfo {
        render_pass: swapchain.render_pass(),
        framebuffer: swapchain.framebuffer(index)?,
        render_area: Rect2D::from_extent(swapchain.extent()),
        clear_values: &clear_values,
    };

    let mut recording = CommandRecording::begin(device, command_buffer)?;
    {
        let mut pass = recording.begin_render_pass(&begin_info);
        pipeline.bind(&mut pass);
        pass.draw(TRIANGLE_VERTEX_COUNT, 1, 0, 0);
    }
    recording.end()
}

#[cfg(test)]
#[path = "frame_renderer_tests.rs"]
mod tests;
