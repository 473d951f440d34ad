/// FirstApp - owns every rendering object and runs the frame loop

use std::sync::Arc;
use tv_engine::tv::{Config, Result};
use tv_engine::tv::frame::{run_frame_loop, FrameRenderer};
use tv_engine::tv::pipeline::{GraphicsPipeline, PipelineConfig, PipelineLayout};
use tv_engine::tv::render::{GraphicsDevice, Swapchain};
use tv_engine::tv::window::{Window, WindowDesc, WindowProvider};
use tv_engine::engine_info;
use tv_engine_renderer_vulkan::{VulkanGraphicsDevice, VulkanSwapchain};

use crate::settings::AppSettings;

/// Hello-triangle application
///
/// Fields drop in declaration order: command buffers, pipeline, layout,
/// swapchain, device, then the window.
pub struct FirstApp {
    frame_renderer: FrameRenderer,
    // Held for their destruction order only
    _pipeline: GraphicsPipeline,
    _pipeline_layout: PipelineLayout,
    swapchain: VulkanSwapchain,
    device: Arc<dyn GraphicsDevice>,
    window: Window,
}

impl FirstApp {
    /// Create the window, device, swapchain, pipeline and recorded command buffers
    pub fn new(settings: &AppSettings) -> Result<Self> {
        let window = Window::new(&WindowDesc {
            title: settings.title.clone(),
            width: settings.width,
            height: settings.height,
            ..WindowDesc::default()
        })?;

        let mut config = Config {
            app_name: settings.title.clone(),
            ..Config::default()
        };
        if let Some(validation) = settings.validation {
            config.enable_validation = validation;
        }

        let vulkan_device = Arc::new(VulkanGraphicsDevice::new(&window, &config)?);
        let swapchain = VulkanSwapchain::new(Arc::clone(&vulkan_device), window.extent())?;
        let device: Arc<dyn GraphicsDevice> = vulkan_device;

        let pipeline_layout = PipelineLayout::empty(&device)?;

        let extent = swapchain.extent();
        let mut pipeline_config = PipelineConfig::default_config(extent.width, extent.height);
        pipeline_config.render_pass = Some(swapchain.render_pass());
        pipeline_config.pipeline_layout = Some(pipeline_layout.handle());

        let pipeline = GraphicsPipeline::new(
            &device,
            &settings.vertex_shader,
            &settings.fragment_shader,
            &pipeline_config,
        )?;

        let frame_renderer = FrameRenderer::new(&device, &swapchain, &pipeline)?;

        engine_info!("tv::demo", "Initialization complete, entering main loop");

        Ok(Self {
            frame_renderer,
            _pipeline: pipeline,
            _pipeline_layout: pipeline_layout,
            swapchain,
            device,
            window,
        })
    }

    /// Draw frames until the window is closed, then wait for the GPU
    ///
    /// Returns the number of frames drawn.
    pub fn run(&mut self) -> Result<u64> {
        let drawn = run_frame_loop(&mut self.window, &mut self.swapchain, &mut self.frame_renderer);
        // Wait even when a frame failed
        let idle = self.device.wait_idle();
        let frames = drawn?;
        idle?;
        Ok(frames)
    }
}
