/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Owns the instance, the window surface, the logical device with its
/// graphics and present queues, one command pool and the GPU memory
/// allocator. Swapchains borrow all of these through an `Arc`.

use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use gpu_allocator::MemoryLocation;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{CStr, CString};
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};
use tv_engine::tv::{Config, Result};
use tv_engine::tv::render::{
    CommandBufferHandle, GraphicsDevice, GraphicsPipelineDesc, PipelineHandle, PipelineLayoutDesc,
    PipelineLayoutHandle, RenderPassBeginInfo, ShaderModuleHandle, ShaderStage,
};
use tv_engine::{engine_bail, engine_debug, engine_err, engine_error, engine_info, engine_warn};

use crate::vulkan_format::*;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Vulkan device implementation
pub struct VulkanGraphicsDevice {
    /// Keeps the Vulkan library loaded
    _entry: ash::Entry,
    instance: ash::Instance,
    debug_utils: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,

    surface_loader: ash::khr::surface::Instance,
    /// Window surface (the swapchain presents to it)
    surface: vk::SurfaceKHR,

    physical_device: vk::PhysicalDevice,
    device: ash::Device,

    graphics_queue: vk::Queue,
    graphics_queue_family: u32,
    present_queue: vk::Queue,
    present_queue_family: u32,

    /// Pool every command buffer is allocated from
    command_pool: Mutex<vk::CommandPool>,

    /// Dropped before the device is destroyed
    allocator: ManuallyDrop<Mutex<Allocator>>,
}

/// Queue family indices of a physical device
struct QueueFamilies {
    graphics: u32,
    present: u32,
}

impl VulkanGraphicsDevice {
    /// Create a Vulkan device for `window`
    ///
    /// Loads Vulkan, creates the instance (with the validation layer and
    /// debug messenger when `config.enable_validation` is set), the window
    /// surface, picks the first GPU with graphics + present queues and
    /// swapchain support, then creates the device, command pool and allocator.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: &Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_err!("tv::vulkan", InitializationFailed, "Failed to load Vulkan library: {:?}", e)
            })?;

            let enable_validation = config.enable_validation && Self::validation_layer_available(&entry);

            let app_name = CString::new(config.app_name.as_str()).map_err(|e| {
                engine_err!("tv::vulkan", InitializationFailed, "Invalid application name: {}", e)
            })?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"TV Engine")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_0);

            let display_handle = window.display_handle().map_err(|e| {
                engine_err!("tv::vulkan", InitializationFailed, "Failed to get display handle: {}", e)
            })?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_err!("tv::vulkan", InitializationFailed, "Failed to get required extensions: {}", e)
                })?
                .to_vec();
            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let layer_names = if enable_validation {
                vec![VALIDATION_LAYER.as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                engine_err!("tv::vulkan", InitializationFailed, "Failed to create instance: {:?}", e)
            })?;

            let debug_utils = if enable_validation {
                match Self::create_debug_messenger(&entry, &instance, config) {
                    Ok(debug_utils) => Some(debug_utils),
                    Err(e) => {
                        instance.destroy_instance(None);
                        return Err(e);
                    }
                }
            } else {
                None
            };

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
            let surface = match Self::create_surface(&entry, &instance, window) {
                Ok(surface) => surface,
                Err(e) => {
                    Self::destroy_instance(&instance, &debug_utils);
                    return Err(e);
                }
            };

            let picked = Self::pick_physical_device(&instance, &surface_loader, surface);
            let (physical_device, families) = match picked {
                Ok(picked) => picked,
                Err(e) => {
                    surface_loader.destroy_surface(surface, None);
                    Self::destroy_instance(&instance, &debug_utils);
                    return Err(e);
                }
            };

            let device = match Self::create_logical_device(&instance, physical_device, &families) {
                Ok(device) => device,
                Err(e) => {
                    surface_loader.destroy_surface(surface, None);
                    Self::destroy_instance(&instance, &debug_utils);
                    return Err(e);
                }
            };

            let graphics_queue = device.get_device_queue(families.graphics, 0);
            let present_queue = device.get_device_queue(families.present, 0);

            let pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(families.graphics)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let command_pool = device.create_command_pool(&pool_create_info, None).map_err(|e| {
                engine_err!("tv::vulkan", InitializationFailed, "Failed to create command pool: {:?}", e)
            });

            let allocator = command_pool.and_then(|pool| {
                Allocator::new(&AllocatorCreateDesc {
                    instance: instance.clone(),
                    device: device.clone(),
                    physical_device,
                    debug_settings: Default::default(),
                    buffer_device_address: false,
                    allocation_sizes: Default::default(),
                })
                .map(|allocator| (pool, allocator))
                .map_err(|e| {
                    device.destroy_command_pool(pool, None);
                    engine_err!("tv::vulkan", InitializationFailed, "Failed to create allocator: {:?}", e)
                })
            });

            let (command_pool, allocator) = match allocator {
                Ok(created) => created,
                Err(e) => {
                    device.destroy_device(None);
                    surface_loader.destroy_surface(surface, None);
                    Self::destroy_instance(&instance, &debug_utils);
                    return Err(e);
                }
            };

            engine_info!(
                "tv::vulkan",
                "Vulkan device ready (graphics family {}, present family {}, validation {})",
                families.graphics,
                families.present,
                if enable_validation { "on" } else { "off" }
            );

            Ok(Self {
                _entry: entry,
                instance,
                debug_utils,
                surface_loader,
                surface,
                physical_device,
                device,
                graphics_queue,
                graphics_queue_family: families.graphics,
                present_queue,
                present_queue_family: families.present,
                command_pool: Mutex::new(command_pool),
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
            })
        }
    }

    fn validation_layer_available(entry: &ash::Entry) -> bool {
        let layers = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
        let available = layers
            .iter()
            .any(|layer| layer.layer_name_as_c_str().map_or(false, |name| name == VALIDATION_LAYER));
        if !available {
            engine_warn!("tv::vulkan", "Validation requested but VK_LAYER_KHRONOS_validation is not installed, continuing without it");
        }
        available
    }

    unsafe fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
        config: &Config,
    ) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

        crate::debug::init_debug_config(crate::debug::Config {
            severity: config.debug_severity,
            output: config.debug_output.clone(),
            message_filter: config.debug_message_filter,
            panic_on_error: config.panic_on_error,
            enable_stats: config.enable_validation_stats,
        });

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(crate::debug::severity_flags(config.debug_severity))
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

        let messenger = debug_utils
            .create_debug_utils_messenger(&debug_info, None)
            .map_err(|e| {
                crate::debug::cleanup_debug_config();
                engine_err!("tv::vulkan", InitializationFailed, "Failed to create debug messenger: {:?}", e)
            })?;

        Ok((debug_utils, messenger))
    }

    unsafe fn create_surface<W: HasDisplayHandle + HasWindowHandle>(
        entry: &ash::Entry,
        instance: &ash::Instance,
        window: &W,
    ) -> Result<vk::SurfaceKHR> {
        let display_handle = window.display_handle().map_err(|e| {
            engine_err!("tv::vulkan", SurfaceCreationFailed, "Failed to get display handle: {}", e)
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            engine_err!("tv::vulkan", SurfaceCreationFailed, "Failed to get window handle: {}", e)
        })?;

        ash_window::create_surface(entry, instance, display_handle.as_raw(), window_handle.as_raw(), None)
            .map_err(|e| engine_err!("tv::vulkan", SurfaceCreationFailed, "Failed to create window surface: {:?}", e))
    }

    /// First GPU with a graphics queue, a present queue and the swapchain extension
    unsafe fn pick_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
        let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
            engine_err!("tv::vulkan", InitializationFailed, "Failed to enumerate physical devices: {:?}", e)
        })?;
        if physical_devices.is_empty() {
            engine_bail!("tv::vulkan", InitializationFailed, "No Vulkan-capable GPU found");
        }

        for physical_device in physical_devices {
            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);

            let graphics = queue_families
                .iter()
                .position(|qf| qf.queue_count > 0 && qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                .map(|i| i as u32);
            let present = (0..queue_families.len() as u32).find(|&i| {
                surface_loader
                    .get_physical_device_surface_support(physical_device, i, surface)
                    .unwrap_or(false)
            });

            let has_swapchain = instance
                .enumerate_device_extension_properties(physical_device)
                .unwrap_or_default()
                .iter()
                .any(|ext| ext.extension_name_as_c_str().map_or(false, |name| name == ash::khr::swapchain::NAME));

            if let (Some(graphics), Some(present), true) = (graphics, present, has_swapchain) {
                let properties = instance.get_physical_device_properties(physical_device);
                let name = properties
                    .device_name_as_c_str()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|_| "unknown".to_string());
                engine_info!("tv::vulkan", "Using physical device: {}", name);
                return Ok((physical_device, QueueFamilies { graphics, present }));
            }
        }

        Err(engine_err!(
            "tv::vulkan",
            InitializationFailed,
            "No GPU with graphics and present queues and swapchain support"
        ))
    }

    unsafe fn create_logical_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        families: &QueueFamilies,
    ) -> Result<ash::Device> {
        let queue_priorities = [1.0];
        let mut queue_create_infos = vec![vk::DeviceQueueCreateInfo::default()
            .queue_family_index(families.graphics)
            .queue_priorities(&queue_priorities)];
        if families.present != families.graphics {
            queue_create_infos.push(
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(families.present)
                    .queue_priorities(&queue_priorities),
            );
        }

        let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
        let device_features = vk::PhysicalDeviceFeatures::default();

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extension_names)
            .enabled_features(&device_features);

        instance
            .create_device(physical_device, &device_create_info, None)
            .map_err(|e| engine_err!("tv::vulkan", InitializationFailed, "Failed to create logical device: {:?}", e))
    }

    unsafe fn destroy_instance(
        instance: &ash::Instance,
        debug_utils: &Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    ) {
        if let Some((loader, messenger)) = debug_utils {
            crate::debug::cleanup_debug_config();
            loader.destroy_debug_utils_messenger(*messenger, None);
        }
        instance.destroy_instance(None);
    }

    // ===== Accessors used by the swapchain =====

    pub(crate) fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub(crate) fn device(&self) -> &ash::Device {
        &self.device
    }

    pub(crate) fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub(crate) fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    pub(crate) fn surface_loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }

    pub(crate) fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    pub(crate) fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    /// Graphics and present family indices
    pub(crate) fn queue_families(&self) -> (u32, u32) {
        (self.graphics_queue_family, self.present_queue_family)
    }

    /// Allocate and bind device-local memory for `image`
    pub(crate) fn allocate_image_memory(&self, image: vk::Image, name: &str) -> Result<Allocation> {
        unsafe {
            let requirements = self.device.get_image_memory_requirements(image);
            let allocation = self
                .lock_allocator()?
                .allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| {
                    engine_err!("tv::vulkan", InitializationFailed, "Failed to allocate memory for {}: {:?}", name, e)
                })?;

            if let Err(e) = self.device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                self.free_memory(allocation);
                engine_bail!("tv::vulkan", InitializationFailed, "Failed to bind memory for {}: {:?}", name, e);
            }
            Ok(allocation)
        }
    }

    pub(crate) fn free_memory(&self, allocation: Allocation) {
        match self.lock_allocator() {
            Ok(mut allocator) => {
                if let Err(e) = allocator.free(allocation) {
                    engine_error!("tv::vulkan", "Failed to free GPU memory: {:?}", e);
                }
            }
            Err(_) => engine_error!("tv::vulkan", "GPU allocator unavailable, memory leaked"),
        }
    }

    fn lock_allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| engine_err!("tv::vulkan", BackendError, "GPU allocator mutex poisoned"))
    }

    fn lock_command_pool(&self) -> MutexGuard<'_, vk::CommandPool> {
        self.command_pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn vk_command_buffer(handle: CommandBufferHandle) -> vk::CommandBuffer {
        vk::CommandBuffer::from_raw(handle.as_raw())
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_shader_module(&self, code: &[u8], stage: ShaderStage) -> Result<ShaderModuleHandle> {
        let words = ash::util::read_spv(&mut std::io::Cursor::new(code)).map_err(|e| {
            engine_err!("tv::vulkan", PipelineCreationFailed, "Invalid SPIR-V for {:?} shader ({} bytes): {}", stage, code.len(), e)
        })?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&words);
        let module = unsafe { self.device.create_shader_module(&create_info, None) }.map_err(|e| {
            engine_err!("tv::vulkan", PipelineCreationFailed, "Failed to create {:?} shader module: {:?}", stage, e)
        })?;

        engine_debug!("tv::vulkan", "Created {:?} shader module ({} bytes)", stage, code.len());
        Ok(ShaderModuleHandle::from_raw(module.as_raw()))
    }

    fn destroy_shader_module(&self, module: ShaderModuleHandle) {
        unsafe {
            self.device
                .destroy_shader_module(vk::ShaderModule::from_raw(module.as_raw()), None);
        }
    }

    fn create_pipeline_layout(&self, desc: &PipelineLayoutDesc) -> Result<PipelineLayoutHandle> {
        let push_constant_ranges: Vec<vk::PushConstantRange> = desc
            .push_constant_ranges
            .iter()
            .map(|range| vk::PushConstantRange {
                stage_flags: shader_stages_to_vk(&range.stages),
                offset: range.offset,
                size: range.size,
            })
            .collect();

        let create_info = vk::PipelineLayoutCreateInfo::default().push_constant_ranges(&push_constant_ranges);

        let layout = unsafe { self.device.create_pipeline_layout(&create_info, None) }.map_err(|e| {
            engine_err!("tv::vulkan", PipelineLayoutCreationFailed, "Failed to create pipeline layout: {:?}", e)
        })?;
        Ok(PipelineLayoutHandle::from_raw(layout.as_raw()))
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle) {
        unsafe {
            self.device
                .destroy_pipeline_layout(vk::PipelineLayout::from_raw(layout.as_raw()), None);
        }
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc<'_>) -> Result<PipelineHandle> {
        let config = desc.config;

        let entry_points = desc
            .stages
            .iter()
            .map(|stage| CString::new(stage.entry_point))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| engine_err!("tv::vulkan", PipelineCreationFailed, "Invalid shader entry point: {}", e))?;

        let shader_stages: Vec<vk::PipelineShaderStageCreateInfo> = desc
            .stages
            .iter()
            .zip(&entry_points)
            .map(|(stage, entry_point)| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(shader_stage_to_vk(stage.stage))
                    .module(vk::ShaderModule::from_raw(stage.module.as_raw()))
                    .name(entry_point)
            })
            .collect();

        // Vertices come from gl_VertexIndex
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default();

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(config.input_assembly.topology))
            .primitive_restart_enable(config.input_assembly.primitive_restart_enable);

        let viewport_view = config.viewport_state();
        let viewports: Vec<vk::Viewport> = viewport_view.viewports.iter().map(viewport_to_vk).collect();
        let scissors: Vec<vk::Rect2D> = viewport_view.scissors.iter().map(rect_to_vk).collect();
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        let raster = &config.rasterization;
        let mut rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(raster.depth_clamp_enable)
            .rasterizer_discard_enable(raster.rasterizer_discard_enable)
            .polygon_mode(polygon_mode_to_vk(raster.polygon_mode))
            .line_width(raster.line_width)
            .cull_mode(cull_mode_to_vk(raster.cull_mode))
            .front_face(front_face_to_vk(raster.front_face));
        rasterization_state = match raster.depth_bias {
            Some(bias) => rasterization_state
                .depth_bias_enable(true)
                .depth_bias_constant_factor(bias.constant_factor)
                .depth_bias_clamp(bias.clamp)
                .depth_bias_slope_factor(bias.slope_factor),
            None => rasterization_state.depth_bias_enable(false),
        };

        let multisample = &config.multisample;
        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(sample_count_to_vk(multisample.sample_count))
            .sample_shading_enable(multisample.sample_shading_enable)
            .min_sample_shading(multisample.min_sample_shading)
            .alpha_to_coverage_enable(multisample.alpha_to_coverage_enable)
            .alpha_to_one_enable(multisample.alpha_to_one_enable);

        let blend_view = config.color_blend_state();
        let color_blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = blend_view
            .attachments
            .iter()
            .map(|attachment| {
                vk::PipelineColorBlendAttachmentState::default()
                    .blend_enable(attachment.blend_enable)
                    .src_color_blend_factor(blend_factor_to_vk(attachment.src_color_factor))
                    .dst_color_blend_factor(blend_factor_to_vk(attachment.dst_color_factor))
                    .color_blend_op(blend_op_to_vk(attachment.color_blend_op))
                    .src_alpha_blend_factor(blend_factor_to_vk(attachment.src_alpha_factor))
                    .dst_alpha_blend_factor(blend_factor_to_vk(attachment.dst_alpha_factor))
                    .alpha_blend_op(blend_op_to_vk(attachment.alpha_blend_op))
                    .color_write_mask(color_write_mask_to_vk(&attachment.color_write_mask))
            })
            .collect();
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(blend_view.logic_op_enable)
            .logic_op(logic_op_to_vk(blend_view.logic_op))
            .attachments(&color_blend_attachments)
            .blend_constants(blend_view.blend_constants);

        let depth = &config.depth_stencil;
        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(depth.depth_test_enable)
            .depth_write_enable(depth.depth_write_enable)
            .depth_compare_op(compare_op_to_vk(depth.depth_compare_op))
            .depth_bounds_test_enable(depth.depth_bounds_test_enable)
            .min_depth_bounds(depth.min_depth_bounds)
            .max_depth_bounds(depth.max_depth_bounds)
            .stencil_test_enable(depth.stencil_test_enable)
            .front(stencil_op_state_to_vk(&depth.front))
            .back(stencil_op_state_to_vk(&depth.back));

        let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .depth_stencil_state(&depth_stencil_state)
            .layout(vk::PipelineLayout::from_raw(desc.layout.as_raw()))
            .render_pass(vk::RenderPass::from_raw(desc.render_pass.as_raw()))
            .subpass(desc.subpass)
            .base_pipeline_handle(vk::Pipeline::null())
            .base_pipeline_index(-1);

        let pipelines = unsafe {
            self.device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_create_info], None)
        }
        .map_err(|(_, e)| engine_err!("tv::vulkan", PipelineCreationFailed, "vkCreateGraphicsPipelines: {:?}", e))?;

        let pipeline = pipelines.into_iter().next().ok_or_else(|| {
            engine_err!("tv::vulkan", PipelineCreationFailed, "vkCreateGraphicsPipelines returned no pipeline")
        })?;
        Ok(PipelineHandle::from_raw(pipeline.as_raw()))
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        unsafe {
            self.device.destroy_pipeline(vk::Pipeline::from_raw(pipeline.as_raw()), None);
        }
    }

    fn allocate_command_buffers(&self, count: u32) -> Result<Vec<CommandBufferHandle>> {
        let pool = self.lock_command_pool();
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let command_buffers = unsafe { self.device.allocate_command_buffers(&allocate_info) }.map_err(|e| {
            engine_err!("tv::vulkan", CommandBufferAllocationFailed, "Failed to allocate {} command buffers: {:?}", count, e)
        })?;

        Ok(command_buffers
            .into_iter()
            .map(|cb| CommandBufferHandle::from_raw(cb.as_raw()))
            .collect())
    }

    fn free_command_buffers(&self, command_buffers: &[CommandBufferHandle]) {
        if command_buffers.is_empty() {
            return;
        }
        let vk_buffers: Vec<vk::CommandBuffer> =
            command_buffers.iter().copied().map(Self::vk_command_buffer).collect();
        let pool = self.lock_command_pool();
        unsafe {
            self.device.free_command_buffers(*pool, &vk_buffers);
        }
    }

    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let begin_info = vk::CommandBufferBeginInfo::default();
        unsafe {
            self.device
                .begin_command_buffer(Self::vk_command_buffer(command_buffer), &begin_info)
                .map_err(|e| engine_err!("tv::vulkan", CommandRecordingFailed, "Failed to begin command buffer: {:?}", e))
        }
    }

    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        unsafe {
            self.device
                .end_command_buffer(Self::vk_command_buffer(command_buffer))
                .map_err(|e| engine_err!("tv::vulkan", CommandRecordingFailed, "Failed to end command buffer: {:?}", e))
        }
    }

    fn cmd_begin_render_pass(&self, command_buffer: CommandBufferHandle, info: &RenderPassBeginInfo<'_>) {
        let clear_values: Vec<vk::ClearValue> = info.clear_values.iter().map(clear_value_to_vk).collect();
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk::RenderPass::from_raw(info.render_pass.as_raw()))
            .framebuffer(vk::Framebuffer::from_raw(info.framebuffer.as_raw()))
            .render_area(rect_to_vk(&info.render_area))
            .clear_values(&clear_values);

        unsafe {
            self.device.cmd_begin_render_pass(
                Self::vk_command_buffer(command_buffer),
                &begin_info,
                vk::SubpassContents::INLINE,
            );
        }
    }

    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle) {
        unsafe {
            self.device.cmd_end_render_pass(Self::vk_command_buffer(command_buffer));
        }
    }

    fn cmd_bind_pipeline(&self, command_buffer: CommandBufferHandle, pipeline: PipelineHandle) {
        unsafe {
            self.device.cmd_bind_pipeline(
                Self::vk_command_buffer(command_buffer),
                vk::PipelineBindPoint::GRAPHICS,
                vk::Pipeline::from_raw(pipeline.as_raw()),
            );
        }
    }

    fn cmd_draw(
        &self,
        command_buffer: CommandBufferHandle,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.cmd_draw(
                Self::vk_command_buffer(command_buffer),
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| engine_err!("tv::vulkan", BackendError, "Failed to wait idle: {:?}", e))
        }
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            let pool = *self.lock_command_pool();
            self.device.destroy_command_pool(pool, None);

            // Allocator pages must be freed before the device goes away
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            Self::destroy_instance(&self.instance, &self.debug_utils);
        }
        engine_debug!("tv::vulkan", "Vulkan device destroyed");
    }
}
