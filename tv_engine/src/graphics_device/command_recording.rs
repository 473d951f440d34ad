/// Scoped command buffer recording
///
/// `CommandRecording` is an open command buffer; `RenderPassRecording` is an
/// open render pass inside it. Pipeline binds and draws are only reachable
/// through `RenderPassRecording`, so recording them outside a render pass
/// does not compile. The render pass is closed when its scope ends.

use crate::error::Result;
use crate::graphics_device::{CommandBufferHandle, GraphicsDevice, PipelineHandle, RenderPassBeginInfo};

/// An open command buffer recording
pub struct CommandRecording<'d> {
    device: &'d dyn GraphicsDevice,
    command_buffer: CommandBufferHandle,
    ended: bool,
}

impl<'d> CommandRecording<'d> {
    /// Begin recording into `command_buffer`
    pub fn begin(device: &'d dyn GraphicsDevice, command_buffer: CommandBufferHandle) -> Result<Self> {
        device.begin_command_buffer(command_buffer)?;
        Ok(Self {
            device,
            command_buffer,
            ended: false,
        })
    }

    pub fn command_buffer(&self) -> CommandBufferHandle {
        self.command_buffer
    }

    /// Open a render pass; it stays open until the returned scope is dropped
    pub fn begin_render_pass<'r>(&'r mut self, info: &RenderPassBeginInfo<'_>) -> RenderPassRecording<'r, 'd> {
        self.device.cmd_begin_render_pass(self.command_buffer, info);
        RenderPassRecording { recording: self }
    }

    /// Finish recording
    pub fn end(mut self) -> Result<()> {
        self.ended = true;
        self.device.end_command_buffer(self.command_buffer)
    }
}

impl Drop for CommandRecording<'_> {
    fn drop(&mut self) {
        if !self.ended {
            crate::engine_warn!(
                "tv::CommandRecording",
                "Command buffer {:#x} dropped while still recording",
                self.command_buffer.as_raw()
            );
        }
    }
}

/// An open render pass inside a command buffer recording
pub struct RenderPassRecording<'r, 'd> {
    recording: &'r mut CommandRecording<'d>,
}

impl RenderPassRecording<'_, '_> {
    pub fn command_buffer(&self) -> CommandBufferHandle {
        self.recording.command_buffer
    }

    /// Use `pipeline` for subsequent draws
    pub fn bind_pipeline(&mut self, pipeline: PipelineHandle) {
        self.recording.device.cmd_bind_pipeline(self.recording.command_buffer, pipeline);
    }

    pub fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        self.recording.device.cmd_draw(
            self.recording.command_buffer,
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        );
    }

    /// Close the render pass now instead of at the end of the scope
    pub fn end(self) {}
}

impl Drop for RenderPassRecording<'_, '_> {
    fn drop(&mut self) {
        self.recording.device.cmd_end_render_pass(self.recording.command_buffer);
    }
}
