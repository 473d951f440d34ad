/// GraphicsDevice trait - the device/queue collaborator
///
/// The core never talks to a GPU API directly. Every resource the frame
/// protocol needs is created, recorded into and destroyed through this trait.

use crate::error::Result;
use crate::graphics_device::{
    ClearValue, CommandBufferHandle, FramebufferHandle, PipelineHandle, PipelineLayoutHandle,
    Rect2D, RenderPassHandle, ShaderModuleHandle, ShaderStage,
};
use crate::pipeline::PipelineConfig;

/// Entry point every shader stage is compiled with
pub const SHADER_ENTRY_POINT: &str = "main";

/// One programmable stage of a graphics pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderStageDesc<'a> {
    pub module: ShaderModuleHandle,
    pub stage: ShaderStage,
    pub entry_point: &'a str,
}

/// Everything a backend needs to build one graphics pipeline
///
/// The vertex input state is always empty (vertices are generated in the
/// vertex shader) and no state is dynamic.
#[derive(Debug, Clone, Copy)]
pub struct GraphicsPipelineDesc<'a> {
    /// Vertex stage then fragment stage
    pub stages: [ShaderStageDesc<'a>; 2],
    /// Fixed-function state
    pub config: &'a PipelineConfig,
    pub layout: PipelineLayoutHandle,
    pub render_pass: RenderPassHandle,
    pub subpass: u32,
}

/// Push constant range of a pipeline layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConstantRange {
    /// Shader stages that can access these push constants
    pub stages: Vec<ShaderStage>,
    /// Offset in bytes
    pub offset: u32,
    /// Size in bytes
    pub size: u32,
}

/// Pipeline layout descriptor
///
/// The default descriptor has no descriptor sets and no push constants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineLayoutDesc {
    pub push_constant_ranges: Vec<PushConstantRange>,
}

/// Arguments of a render pass begin command
#[derive(Debug, Clone, Copy)]
pub struct RenderPassBeginInfo<'a> {
    pub render_pass: RenderPassHandle,
    pub framebuffer: FramebufferHandle,
    pub render_area: Rect2D,
    /// One clear value per attachment, in attachment order
    pub clear_values: &'a [ClearValue],
}

/// Device/queue provider
///
/// Implemented by backend-specific devices (e.g., VulkanGraphicsDevice).
/// Recording commands (`cmd_*`) cannot fail; failures surface when the
/// command buffer is ended or submitted.
pub trait GraphicsDevice: Send + Sync {
    // ===== SHADERS =====

    /// Register a compiled shader binary as a shader module
    fn create_shader_module(&self, code: &[u8], stage: ShaderStage) -> Result<ShaderModuleHandle>;

    fn destroy_shader_module(&self, module: ShaderModuleHandle);

    // ===== PIPELINES =====

    fn create_pipeline_layout(&self, desc: &PipelineLayoutDesc) -> Result<PipelineLayoutHandle>;

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle);

    /// Create one graphics pipeline
    ///
    /// # Errors
    ///
    /// `Error::PipelineCreationFailed` when the backend rejects the description.
    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc<'_>) -> Result<PipelineHandle>;

    fn destroy_pipeline(&self, pipeline: PipelineHandle);

    // ===== COMMAND BUFFERS =====

    /// Allocate `count` primary command buffers from the device's pool
    fn allocate_command_buffers(&self, count: u32) -> Result<Vec<CommandBufferHandle>>;

    fn free_command_buffers(&self, command_buffers: &[CommandBufferHandle]);

    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()>;

    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()>;

    // ===== RECORDING =====

    fn cmd_begin_render_pass(&self, command_buffer: CommandBufferHandle, info: &RenderPassBeginInfo<'_>);

    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle);

    fn cmd_bind_pipeline(&self, command_buffer: CommandBufferHandle, pipeline: PipelineHandle);

    fn cmd_draw(
        &self,
        command_buffer: CommandBufferHandle,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    );

    // ===== SYNCHRONIZATION =====

    /// Block until the device has finished all submitted work
    fn wait_idle(&self) -> Result<()>;
}
