/// Mock graphics device, swapchain and window for unit tests (no GPU required)
///
/// The mock device records every call, tracks which handles are alive, and
/// can be scripted to fail at specific steps. The mock swapchain hands out
/// images in round-robin order unless an acquire script is queued.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::graphics_device::{
    AcquiredImage, ClearValue, CommandBufferHandle, Extent2D, FramebufferHandle, GraphicsDevice,
    GraphicsPipelineDesc, PipelineHandle, PipelineLayoutDesc, PipelineLayoutHandle, Rect2D,
    RenderPassBeginInfo, RenderPassHandle, ShaderModuleHandle, ShaderStage, Swapchain,
};
use crate::pipeline::PipelineConfig;
use crate::window::WindowProvider;

// ============================================================================
// Recorded data
// ============================================================================

/// One command recorded into a mock command buffer
#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    BeginRenderPass {
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        render_area: Rect2D,
        clear_values: Vec<ClearValue>,
    },
    BindPipeline(PipelineHandle),
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    EndRenderPass,
}

/// Everything a pipeline was created from, with handles resolved to content
#[derive(Debug, Clone, PartialEq)]
pub struct MockPipelineRecord {
    pub stages: [(ShaderStage, Vec<u8>, String); 2],
    pub config: PipelineConfig,
    pub layout: PipelineLayoutHandle,
    pub render_pass: RenderPassHandle,
    pub subpass: u32,
}

#[derive(Debug, Default)]
pub struct MockCommandBuffer {
    pub begin_count: u32,
    pub end_count: u32,
    pub commands: Vec<MockCommand>,
}

/// Scriptable failures
#[derive(Debug, Default)]
pub struct MockFailures {
    /// Number of shader modules that may be created before creation fails
    pub shader_module_after: Option<usize>,
    pub pipeline_layout: bool,
    pub pipeline: bool,
    pub allocation: bool,
    /// Index (0-based, counted over the device lifetime) of the begin_command_buffer call that fails
    pub begin_at: Option<usize>,
    pub end: bool,
    pub wait_idle: bool,
}

#[derive(Debug, Default)]
pub struct MockState {
    next_handle: u64,
    /// Every device call, in order
    pub calls: Vec<String>,
    pub shader_modules: HashMap<ShaderModuleHandle, (ShaderStage, Vec<u8>)>,
    pub pipeline_layouts: HashSet<PipelineLayoutHandle>,
    pub pipelines: HashMap<PipelineHandle, MockPipelineRecord>,
    pub command_buffers: HashMap<CommandBufferHandle, MockCommandBuffer>,
    pub shader_modules_created: usize,
    pub destroyed_shader_modules: Vec<ShaderModuleHandle>,
    pub destroyed_pipelines: Vec<PipelineHandle>,
    pub destroyed_pipeline_layouts: Vec<PipelineLayoutHandle>,
    pub freed_command_buffers: Vec<CommandBufferHandle>,
    pub begin_calls: usize,
    pub wait_idle_count: usize,
    pub fail: MockFailures,
}

impl MockState {
    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

// ============================================================================
// Mock device
// ============================================================================

#[derive(Debug, Default)]
pub struct MockGraphicsDevice {
    state: Mutex<MockState>,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn live_shader_module_count(&self) -> usize {
        self.state().shader_modules.len()
    }

    pub fn live_pipeline_count(&self) -> usize {
        self.state().pipelines.len()
    }

    pub fn pipeline_record(&self, pipeline: PipelineHandle) -> Option<MockPipelineRecord> {
        self.state().pipelines.get(&pipeline).cloned()
    }

    pub fn recorded_commands(&self, command_buffer: CommandBufferHandle) -> Vec<MockCommand> {
        self.state()
            .command_buffers
            .get(&command_buffer)
            .map(|cb| cb.commands.clone())
            .unwrap_or_default()
    }

    fn record(&self, command_buffer: CommandBufferHandle, command: MockCommand) {
        let mut state = self.state();
        state.calls.push(format!("{:?}", command));
        state
            .command_buffers
            .get_mut(&command_buffer)
            .unwrap_or_else(|| panic!("command recorded into unknown buffer {:?}", command_buffer))
            .commands
            .push(command);
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_shader_module(&self, code: &[u8], stage: ShaderStage) -> Result<ShaderModuleHandle> {
        let mut state = self.state();
        state.calls.push(format!("create_shader_module({:?}, {} bytes)", stage, code.len()));
        if let Some(limit) = state.fail.shader_module_after {
            if state.shader_modules_created >= limit {
                return Err(Error::PipelineCreationFailed("mock shader module failure".to_string()));
            }
        }
        let handle = ShaderModuleHandle::from_raw(state.next_handle());
        state.shader_modules.insert(handle, (stage, code.to_vec()));
        state.shader_modules_created += 1;
        Ok(handle)
    }

    fn destroy_shader_module(&self, module: ShaderModuleHandle) {
        let mut state = self.state();
        state.calls.push(format!("destroy_shader_module({:#x})", module.as_raw()));
        assert!(state.shader_modules.remove(&module).is_some(), "shader module destroyed twice or unknown");
        state.destroyed_shader_modules.push(module);
    }

    fn create_pipeline_layout(&self, desc: &PipelineLayoutDesc) -> Result<PipelineLayoutHandle> {
        let mut state = self.state();
        state.calls.push(format!("create_pipeline_layout({} ranges)", desc.push_constant_ranges.len()));
        if state.fail.pipeline_layout {
            return Err(Error::PipelineLayoutCreationFailed("mock layout failure".to_string()));
        }
        let handle = PipelineLayoutHandle::from_raw(state.next_handle());
        state.pipeline_layouts.insert(handle);
        Ok(handle)
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle) {
        let mut state = self.state();
        state.calls.push(format!("destroy_pipeline_layout({:#x})", layout.as_raw()));
        assert!(state.pipeline_layouts.remove(&layout), "pipeline layout destroyed twice or unknown");
        state.destroyed_pipeline_layouts.push(layout);
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc<'_>) -> Result<PipelineHandle> {
        let mut state = self.state();
        state.calls.push("create_graphics_pipeline".to_string());
        if state.fail.pipeline {
            return Err(Error::PipelineCreationFailed("mock pipeline failure".to_string()));
        }
        let resolve = |index: usize| {
            let stage = &desc.stages[index];
            let (_, code) = state
                .shader_modules
                .get(&stage.module)
                .unwrap_or_else(|| panic!("pipeline references dead shader module {:?}", stage.module));
            (stage.stage, code.clone(), stage.entry_point.to_string())
        };
        let record = MockPipelineRecord {
            stages: [resolve(0), resolve(1)],
            config: desc.config.clone(),
            layout: desc.layout,
            render_pass: desc.render_pass,
            subpass: desc.subpass,
        };
        let handle = PipelineHandle::from_raw(state.next_handle());
        state.pipelines.insert(handle, record);
        Ok(handle)
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        let mut state = self.state();
        state.calls.push(format!("destroy_pipeline({:#x})", pipeline.as_raw()));
        assert!(state.pipelines.remove(&pipeline).is_some(), "pipeline destroyed twice or unknown");
        state.destroyed_pipelines.push(pipeline);
    }

    fn allocate_command_buffers(&self, count: u32) -> Result<Vec<CommandBufferHandle>> {
        let mut state = self.state();
        state.calls.push(format!("allocate_command_buffers({})", count));
        if state.fail.allocation {
            return Err(Error::CommandBufferAllocationFailed("mock allocation failure".to_string()));
        }
        let mut handles = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let handle = CommandBufferHandle::from_raw(state.next_handle());
            state.command_buffers.insert(handle, MockCommandBuffer::default());
            handles.push(handle);
        }
        Ok(handles)
    }

    fn free_command_buffers(&self, command_buffers: &[CommandBufferHandle]) {
        let mut state = self.state();
        state.calls.push(format!("free_command_buffers({})", command_buffers.len()));
        for cb in command_buffers {
            assert!(state.command_buffers.remove(cb).is_some(), "command buffer freed twice or unknown");
            state.freed_command_buffers.push(*cb);
        }
    }

    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let mut state = self.state();
        state.calls.push(format!("begin_command_buffer({:#x})", command_buffer.as_raw()));
        let call_index = state.begin_calls;
        state.begin_calls += 1;
        if state.fail.begin_at == Some(call_index) {
            return Err(Error::CommandRecordingFailed("mock begin failure".to_string()));
        }
        if let Some(cb) = state.command_buffers.get_mut(&command_buffer) {
            cb.begin_count += 1;
        }
        Ok(())
    }

    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let mut state = self.state();
        state.calls.push(format!("end_command_buffer({:#x})", command_buffer.as_raw()));
        if state.fail.end {
            return Err(Error::CommandRecordingFailed("mock end failure".to_string()));
        }
        if let Some(cb) = state.command_buffers.get_mut(&command_buffer) {
            cb.end_count += 1;
        }
        Ok(())
    }

    fn cmd_begin_render_pass(&self, command_buffer: CommandBufferHandle, info: &RenderPassBeginInfo<'_>) {
        self.record(
            command_buffer,
            MockCommand::BeginRenderPass {
                render_pass: info.render_pass,
                framebuffer: info.framebuffer,
                render_area: info.render_area,
                clear_values: info.clear_values.to_vec(),
            },
        );
    }

    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle) {
        self.record(command_buffer, MockCommand::EndRenderPass);
    }

    fn cmd_bind_pipeline(&self, command_buffer: CommandBufferHandle, pipeline: PipelineHandle) {
        self.record(command_buffer, MockCommand::BindPipeline(pipeline));
    }

    fn cmd_draw(
        &self,
        command_buffer: CommandBufferHandle,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.record(
            command_buffer,
            MockCommand::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            },
        );
    }

    fn wait_idle(&self) -> Result<()> {
        let mut state = self.state();
        state.calls.push("wait_idle".to_string());
        state.wait_idle_count += 1;
        if state.fail.wait_idle {
            return Err(Error::BackendError("mock device lost".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Mock swapchain
// ============================================================================

pub struct MockSwapchain {
    pub extent: Extent2D,
    pub render_pass: RenderPassHandle,
    pub framebuffers: Vec<FramebufferHandle>,
    /// Results returned by the next acquires, before falling back to round-robin
    pub acquire_script: VecDeque<Result<AcquiredImage>>,
    /// Error returned by the next submit
    pub submit_error: Option<Error>,
    pub acquire_count: usize,
    /// (command buffer, image index) of every successful submit
    pub submissions: Vec<(CommandBufferHandle, u32)>,
    next_image: u32,
}

impl MockSwapchain {
    pub fn new(image_count: usize, extent: Extent2D) -> Self {
        Self {
            extent,
            render_pass: RenderPassHandle::from_raw(0x5000),
            framebuffers: (0..image_count)
                .map(|i| FramebufferHandle::from_raw(0x6000 + i as u64))
                .collect(),
            acquire_script: VecDeque::new(),
            submit_error: None,
            acquire_count: 0,
            submissions: Vec::new(),
            next_image: 0,
        }
    }

    /// Queue `Ready(index)` results
    pub fn script_indices(&mut self, indices: &[u32]) {
        self.acquire_script
            .extend(indices.iter().map(|&i| Ok(AcquiredImage::Ready(i))));
    }
}

impl Swapchain for MockSwapchain {
    fn image_count(&self) -> usize {
        self.framebuffers.len()
    }

    fn framebuffer(&self, index: usize) -> Result<FramebufferHandle> {
        self.framebuffers
            .get(index)
            .copied()
            .ok_or_else(|| Error::FrameProtocol(format!("framebuffer index {} out of range", index)))
    }

    fn render_pass(&self) -> RenderPassHandle {
        self.render_pass
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }

    fn acquire_next_image(&mut self) -> Result<AcquiredImage> {
        self.acquire_count += 1;
        if let Some(result) = self.acquire_script.pop_front() {
            return result;
        }
        let index = self.next_image;
        self.next_image = (self.next_image + 1) % self.framebuffers.len() as u32;
        Ok(AcquiredImage::Ready(index))
    }

    fn submit_and_present(&mut self, command_buffer: CommandBufferHandle, image_index: u32) -> Result<()> {
        if let Some(err) = self.submit_error.take() {
            return Err(err);
        }
        self.submissions.push((command_buffer, image_index));
        Ok(())
    }
}

// ============================================================================
// Mock window
// ============================================================================

/// Window that requests close after `close_after` polls
pub struct MockWindow {
    pub close_after: usize,
    pub polls: usize,
    pub extent: Extent2D,
}

impl MockWindow {
    pub fn new(close_after: usize) -> Self {
        Self {
            close_after,
            polls: 0,
            extent: Extent2D::new(800, 600),
        }
    }
}

impl WindowProvider for MockWindow {
    fn should_close(&self) -> bool {
        self.polls >= self.close_after
    }

    fn poll_events(&mut self) {
        self.polls += 1;
    }

    fn extent(&self) -> Extent2D {
        self.extent
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
