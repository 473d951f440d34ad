/// VulkanSwapchain - Vulkan implementation of the Swapchain trait
///
/// Owns the presentable images and their views, one depth image per
/// swapchain image, the render pass, one framebuffer per image and the
/// synchronization objects of two frames in flight.

use ash::prelude::VkResult;
use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::Allocation;
use std::sync::Arc;
use tv_engine::tv::{Error, Result};
use tv_engine::tv::render::{
    AcquiredImage, CommandBufferHandle, Extent2D, FramebufferHandle, RenderPassHandle, Swapchain,
};
use tv_engine::{engine_bail, engine_debug, engine_err, engine_error, engine_info, engine_warn};

use crate::vulkan_format::extent_to_vk;
use crate::VulkanGraphicsDevice;

/// Frames the CPU may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Depth formats tried in order
const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Depth attachment of one swapchain image
struct DepthImage {
    image: vk::Image,
    view: vk::ImageView,
    allocation: Option<Allocation>,
}

/// Vulkan swapchain implementation
pub struct VulkanSwapchain {
    device: Arc<VulkanGraphicsDevice>,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,

    image_format: vk::Format,
    depth_format: vk::Format,
    extent: vk::Extent2D,

    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    depth_images: Vec<DepthImage>,
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,

    /// One per frame in flight, signaled by acquire
    image_available_semaphores: Vec<vk::Semaphore>,
    /// One per swapchain image, waited on by present
    render_finished_semaphores: Vec<vk::Semaphore>,
    /// One per frame in flight, signaled when the frame's submission completes
    in_flight_fences: Vec<vk::Fence>,
    /// Fence of the frame currently using each image (null when unused)
    images_in_flight: Vec<vk::Fence>,

    current_frame: usize,
}

impl VulkanSwapchain {
    /// Create a swapchain for the device's surface
    ///
    /// `window_extent` is used only when the surface leaves the extent to the
    /// application. Resources are created in order; on failure everything
    /// created so far is released by `Drop`.
    pub fn new(device: Arc<VulkanGraphicsDevice>, window_extent: Extent2D) -> Result<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(device.instance(), device.device());

        let mut swapchain = Self {
            device,
            swapchain_loader,
            swapchain: vk::SwapchainKHR::null(),
            image_format: vk::Format::UNDEFINED,
            depth_format: vk::Format::UNDEFINED,
            extent: extent_to_vk(window_extent),
            images: Vec::new(),
            image_views: Vec::new(),
            depth_images: Vec::new(),
            render_pass: vk::RenderPass::null(),
            framebuffers: Vec::new(),
            image_available_semaphores: Vec::new(),
            render_finished_semaphores: Vec::new(),
            in_flight_fences: Vec::new(),
            images_in_flight: Vec::new(),
            current_frame: 0,
        };

        swapchain.create_swapchain(window_extent)?;
        swapchain.create_image_views()?;
        swapchain.create_depth_resources()?;
        swapchain.create_render_pass()?;
        swapchain.create_framebuffers()?;
        swapchain.create_sync_objects()?;

        engine_info!(
            "tv::vulkan",
            "Swapchain created: {} images, {}x{}, {:?}",
            swapchain.images.len(),
            swapchain.extent.width,
            swapchain.extent.height,
            swapchain.image_format
        );
        Ok(swapchain)
    }

    fn create_swapchain(&mut self, window_extent: Extent2D) -> Result<()> {
        let device = Arc::clone(&self.device);
        let surface_loader = device.surface_loader();
        let surface = device.surface();
        let physical_device = device.physical_device();

        unsafe {
            let capabilities = surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
                .map_err(|e| {
                    engine_err!("tv::vulkan", InitializationFailed, "Failed to get surface capabilities: {:?}", e)
                })?;
            let formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(|e| {
                    engine_err!("tv::vulkan", InitializationFailed, "Failed to get surface formats: {:?}", e)
                })?;
            let present_modes = surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .map_err(|e| {
                    engine_err!("tv::vulkan", InitializationFailed, "Failed to get present modes: {:?}", e)
                })?;

            let surface_format = choose_surface_format(&formats).ok_or_else(|| {
                engine_err!("tv::vulkan", InitializationFailed, "Surface reports no formats")
            })?;
            let present_mode = choose_present_mode(&present_modes);
            let extent = choose_extent(&capabilities, window_extent);
            let image_count = choose_image_count(&capabilities);

            let (graphics_family, present_family) = device.queue_families();
            let queue_family_indices = [graphics_family, present_family];

            let mut create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(surface)
                .min_image_count(image_count)
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode)
                .clipped(true);
            create_info = if graphics_family != present_family {
                create_info
                    .image_sharing_mode(vk::SharingMode::CONCURRENT)
                    .queue_family_indices(&queue_family_indices)
            } else {
                create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            };

            self.swapchain = self
                .swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| engine_err!("tv::vulkan", InitializationFailed, "Failed to create swapchain: {:?}", e))?;

            self.images = self
                .swapchain_loader
                .get_swapchain_images(self.swapchain)
                .map_err(|e| engine_err!("tv::vulkan", InitializationFailed, "Failed to get swapchain images: {:?}", e))?;

            self.image_format = surface_format.format;
            self.extent = extent;
            engine_debug!("tv::vulkan", "Present mode: {:?}", present_mode);
        }
        Ok(())
    }

    fn create_image_views(&mut self) -> Result<()> {
        for &image in &self.images {
            let view = create_image_view(self.device.device(), image, self.image_format, vk::ImageAspectFlags::COLOR)?;
            self.image_views.push(view);
        }
        Ok(())
    }

    fn create_depth_resources(&mut self) -> Result<()> {
        self.depth_format = self.find_depth_format()?;

        for _ in 0..self.images.len() {
            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(self.depth_format)
                .extent(vk::Extent3D {
                    width: self.extent.width,
                    height: self.extent.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = unsafe { self.device.device().create_image(&image_create_info, None) }
                .map_err(|e| engine_err!("tv::vulkan", InitializationFailed, "Failed to create depth image: {:?}", e))?;

            // Registered before the next fallible step so Drop releases it
            self.depth_images.push(DepthImage {
                image,
                view: vk::ImageView::null(),
                allocation: None,
            });
            let allocation = self.device.allocate_image_memory(image, "depth attachment")?;
            let view = create_image_view(self.device.device(), image, self.depth_format, vk::ImageAspectFlags::DEPTH);

            if let Some(depth) = self.depth_images.last_mut() {
                depth.allocation = Some(allocation);
                depth.view = view?;
            }
        }
        Ok(())
    }

    fn find_depth_format(&self) -> Result<vk::Format> {
        let instance = self.device.instance();
        DEPTH_FORMAT_CANDIDATES
            .iter()
            .copied()
            .find(|&format| {
                let properties = unsafe {
                    instance.get_physical_device_format_properties(self.device.physical_device(), format)
                };
                properties
                    .optimal_tiling_features
                    .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
            })
            .ok_or_else(|| engine_err!("tv::vulkan", InitializationFailed, "No supported depth format"))
    }

    fn create_render_pass(&mut self) -> Result<()> {
        let attachments = [
            vk::AttachmentDescription::default()
                .format(self.image_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
            vk::AttachmentDescription::default()
                .format(self.depth_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        ];

        let color_refs = [vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];
        let depth_ref = vk::AttachmentReference {
            attachment: 1,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        };

        let subpasses = [vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .depth_stencil_attachment(&depth_ref)];

        let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
        let dependencies = [vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stages)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(stages)
            .dst_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        self.render_pass = unsafe { self.device.device().create_render_pass(&create_info, None) }
            .map_err(|e| engine_err!("tv::vulkan", InitializationFailed, "Failed to create render pass: {:?}", e))?;
        Ok(())
    }

    fn create_framebuffers(&mut self) -> Result<()> {
        for (color_view, depth) in self.image_views.iter().zip(&self.depth_images) {
            let attachments = [*color_view, depth.view];
            let create_info = vk::FramebufferCreateInfo::default()
                .render_pass(self.render_pass)
                .attachments(&attachments)
                .width(self.extent.width)
                .height(self.extent.height)
                .layers(1);

            let framebuffer = unsafe { self.device.device().create_framebuffer(&create_info, None) }
                .map_err(|e| engine_err!("tv::vulkan", InitializationFailed, "Failed to create framebuffer: {:?}", e))?;
            self.framebuffers.push(framebuffer);
        }
        Ok(())
    }

    fn create_sync_objects(&mut self) -> Result<()> {
        let device = self.device.device();
        let semaphore_create_info = vk::SemaphoreCreateInfo::default();
        let fence_create_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);

        unsafe {
            for _ in 0..MAX_FRAMES_IN_FLIGHT {
                self.image_available_semaphores.push(
                    device.create_semaphore(&semaphore_create_info, None).map_err(|e| {
                        engine_err!("tv::vulkan", InitializationFailed, "Failed to create semaphore: {:?}", e)
                    })?,
                );
                self.in_flight_fences.push(
                    device.create_fence(&fence_create_info, None).map_err(|e| {
                        engine_err!("tv::vulkan", InitializationFailed, "Failed to create fence: {:?}", e)
                    })?,
                );
            }
            for _ in 0..self.images.len() {
                self.render_finished_semaphores.push(
                    device.create_semaphore(&semaphore_create_info, None).map_err(|e| {
                        engine_err!("tv::vulkan", InitializationFailed, "Failed to create semaphore: {:?}", e)
                    })?,
                );
            }
        }

        self.images_in_flight = vec![vk::Fence::null(); self.images.len()];
        Ok(())
    }

    /// Depth attachment format in use
    pub fn depth_format(&self) -> vk::Format {
        self.depth_format
    }

    /// Color attachment format in use
    pub fn image_format(&self) -> vk::Format {
        self.image_format
    }
}

impl Swapchain for VulkanSwapchain {
    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn framebuffer(&self, index: usize) -> Result<FramebufferHandle> {
        match self.framebuffers.get(index) {
            Some(framebuffer) => Ok(FramebufferHandle::from_raw(framebuffer.as_raw())),
            None => Err(engine_err!(
                "tv::vulkan",
                FrameProtocol,
                "Framebuffer index {} out of range (image count: {})",
                index,
                self.framebuffers.len()
            )),
        }
    }

    fn render_pass(&self) -> RenderPassHandle {
        RenderPassHandle::from_raw(self.render_pass.as_raw())
    }

    fn extent(&self) -> Extent2D {
        Extent2D::new(self.extent.width, self.extent.height)
    }

    fn acquire_next_image(&mut self) -> Result<AcquiredImage> {
        let device = self.device.device();
        unsafe {
            device
                .wait_for_fences(&[self.in_flight_fences[self.current_frame]], true, u64::MAX)
                .map_err(|e| engine_err!("tv::vulkan", AcquireFailed, "Failed to wait for frame fence: {:?}", e))?;

            let acquired = self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                self.image_available_semaphores[self.current_frame],
                vk::Fence::null(),
            );

            match acquired {
                Ok((index, false)) => Ok(AcquiredImage::Ready(index)),
                Ok((index, true)) => Ok(AcquiredImage::Suboptimal(index)),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(out_of_date("acquire")),
                Err(e) => Err(engine_err!("tv::vulkan", AcquireFailed, "vkAcquireNextImageKHR: {:?}", e)),
            }
        }
    }

    fn submit_and_present(&mut self, command_buffer: CommandBufferHandle, image_index: u32) -> Result<()> {
        let image = image_index as usize;
        if image >= self.images.len() {
            engine_bail!(
                "tv::vulkan",
                FrameProtocol,
                "Image index {} out of range (image count: {})",
                image_index,
                self.images.len()
            );
        }

        let device = self.device.device();
        let frame_fence = self.in_flight_fences[self.current_frame];

        unsafe {
            // The image may still be used by an older frame
            let image_fence = self.images_in_flight[image];
            if image_fence != vk::Fence::null() {
                device
                    .wait_for_fences(&[image_fence], true, u64::MAX)
                    .map_err(|e| engine_err!("tv::vulkan", SubmissionFailed, "Failed to wait for image fence: {:?}", e))?;
            }
            self.images_in_flight[image] = frame_fence;

            let wait_semaphores = [self.image_available_semaphores[self.current_frame]];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let signal_semaphores = [self.render_finished_semaphores[image]];
            let command_buffers = [vk::CommandBuffer::from_raw(command_buffer.as_raw())];

            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);

            let queue = self.device.graphics_queue();
            submit_guarding_fence(
                || device.reset_fences(&[frame_fence]),
                || device.queue_submit(queue, &[submit_info], frame_fence),
                || device.queue_submit(queue, &[], frame_fence),
            )?;

            let swapchains = [self.swapchain];
            let image_indices = [image_index];
            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&signal_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            let presented = self.swapchain_loader.queue_present(self.device.present_queue(), &present_info);
            self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;

            match presented {
                Ok(false) => Ok(()),
                Ok(true) => {
                    engine_debug!("tv::vulkan", "Present reported a suboptimal swapchain");
                    Ok(())
                }
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(out_of_date("present")),
                Err(e) => Err(engine_err!("tv::vulkan", SubmissionFailed, "vkQueuePresentKHR: {:?}", e)),
            }
        }
    }
}

/// Reset the frame fence, then submit
///
/// A failed submit leaves the fence unsignaled, and the next acquire on that
/// frame slot would wait on it forever. `rearm` signals it again with an
/// empty batch before the error is returned.
pub(crate) fn submit_guarding_fence(
    reset: impl FnOnce() -> VkResult<()>,
    submit: impl FnOnce() -> VkResult<()>,
    rearm: impl FnOnce() -> VkResult<()>,
) -> Result<()> {
    reset().map_err(|e| engine_err!("tv::vulkan", SubmissionFailed, "Failed to reset frame fence: {:?}", e))?;
    if let Err(e) = submit() {
        if let Err(rearm_error) = rearm() {
            engine_warn!("tv::vulkan", "Frame fence left unsignaled after failed submit: {:?}", rearm_error);
        }
        engine_bail!("tv::vulkan", SubmissionFailed, "Failed to submit draw command buffer: {:?}", e);
    }
    Ok(())
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        let device = self.device.device();
        unsafe {
            device.device_wait_idle().ok();

            for &semaphore in self.image_available_semaphores.iter().chain(&self.render_finished_semaphores) {
                device.destroy_semaphore(semaphore, None);
            }
            for &fence in &self.in_flight_fences {
                device.destroy_fence(fence, None);
            }
            for &framebuffer in &self.framebuffers {
                device.destroy_framebuffer(framebuffer, None);
            }
            device.destroy_render_pass(self.render_pass, None);

            for depth in self.depth_images.drain(..) {
                device.destroy_image_view(depth.view, None);
                device.destroy_image(depth.image, None);
                if let Some(allocation) = depth.allocation {
                    self.device.free_memory(allocation);
                }
            }
            for &view in &self.image_views {
                device.destroy_image_view(view, None);
            }

            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
        engine_debug!("tv::vulkan", "Swapchain destroyed");
    }
}

/// Log an out-of-date swapchain and build the matching error
fn out_of_date(operation: &str) -> Error {
    engine_error!("tv::vulkan", "Swapchain out of date during {}", operation);
    Error::SwapchainOutOfDate
}

fn create_image_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
) -> Result<vk::ImageView> {
    let create_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    unsafe { device.create_image_view(&create_info, None) }
        .map_err(|e| engine_err!("tv::vulkan", InitializationFailed, "Failed to create image view: {:?}", e))
}

// ===== Surface property selection =====

/// B8G8R8A8_SRGB with sRGB non-linear color space, else the first reported format
pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| f.format == vk::Format::B8G8R8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| formats.first())
        .copied()
}

/// Mailbox when available, else FIFO (always supported)
pub(crate) fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Surface extent, or the window extent clamped to the surface limits
pub(crate) fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, window_extent: Extent2D) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: window_extent.width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: window_extent.height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One more than the minimum, capped by the maximum (0 = no maximum)
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        image_count.min(capabilities.max_image_count)
    } else {
        image_count
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
