/// Swapchain trait - presentable images and the frame synchronization that guards them

use crate::error::Result;
use crate::graphics_device::{CommandBufferHandle, Extent2D, FramebufferHandle, RenderPassHandle};

/// Outcome of a successful image acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquiredImage {
    /// Image is ready and the swapchain matches the surface
    Ready(u32),
    /// Image is usable but the swapchain no longer matches the surface exactly
    Suboptimal(u32),
}

impl AcquiredImage {
    /// Index of the acquired image
    pub fn index(self) -> u32 {
        match self {
            AcquiredImage::Ready(index) | AcquiredImage::Suboptimal(index) => index,
        }
    }

    pub fn is_suboptimal(self) -> bool {
        matches!(self, AcquiredImage::Suboptimal(_))
    }
}

/// Swapchain for presenting rendered images to a window
///
/// Created once with a fixed extent and image count. The swapchain is the
/// only synchronization authority of the frame protocol: `acquire_next_image`
/// blocks until a frame slot is free, and `submit_and_present` signals and
/// waits on the per-frame semaphores and fences.
pub trait Swapchain: Send + Sync {
    /// Number of presentable images (N >= 2)
    fn image_count(&self) -> usize;

    /// Framebuffer attached to image `index`
    ///
    /// # Errors
    ///
    /// `Error::FrameProtocol` when `index >= image_count()`.
    fn framebuffer(&self, index: usize) -> Result<FramebufferHandle>;

    /// Render pass compatible with every framebuffer
    fn render_pass(&self) -> RenderPassHandle;

    /// Fixed image extent
    fn extent(&self) -> Extent2D;

    /// Acquire the next image to render into
    ///
    /// # Errors
    ///
    /// `Error::SwapchainOutOfDate` when the surface changed incompatibly,
    /// `Error::AcquireFailed` for any other failure.
    fn acquire_next_image(&mut self) -> Result<AcquiredImage>;

    /// Submit `command_buffer` for image `image_index` and queue the image for presentation
    ///
    /// # Errors
    ///
    /// `Error::SubmissionFailed` when submission or presentation fails,
    /// `Error::SwapchainOutOfDate` when presentation reports out-of-date.
    fn submit_and_present(&mut self, command_buffer: CommandBufferHandle, image_index: u32) -> Result<()>;
}
