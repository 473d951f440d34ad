/// GraphicsPipeline - immutable pipeline built from two shader stages and a PipelineConfig

use std::path::Path;
use std::sync::{Arc, Weak};
use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, GraphicsPipelineDesc, PipelineHandle, PipelineLayoutHandle, RenderPassHandle,
    RenderPassRecording, ShaderStage, ShaderStageDesc, SHADER_ENTRY_POINT,
};
use crate::pipeline::{load_shader_code, PipelineConfig, ShaderModule};

/// GPU-resident graphics pipeline
///
/// Owns its pipeline handle and both shader modules. Dropping it destroys
/// the pipeline first, then the vertex and fragment modules.
pub struct GraphicsPipeline {
    device: Weak<dyn GraphicsDevice>,
    handle: PipelineHandle,
    vertex_shader: ShaderModule,
    fragment_shader: ShaderModule,
}

impl GraphicsPipeline {
    /// Build a pipeline from two shader binaries on disk
    ///
    /// Both files are read before any shader module is registered.
    ///
    /// # Panics
    ///
    /// Panics, before touching the filesystem or the device, when
    /// `config.pipeline_layout` or `config.render_pass` is unset.
    ///
    /// # Errors
    ///
    /// Shader loading errors (`ShaderNotFound`, `ShaderReadFailed`) or
    /// `PipelineCreationFailed`. Modules registered before the failure are
    /// destroyed.
    pub fn new(
        device: &Arc<dyn GraphicsDevice>,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
        config: &PipelineConfig,
    ) -> Result<Self> {
        let (layout, render_pass) = required_references(config);

        let vertex_code = load_shader_code(vertex_path)?;
        let fragment_code = load_shader_code(fragment_path)?;

        Self::build(device, &vertex_code, &fragment_code, config, layout, render_pass)
    }

    /// Build a pipeline from shader binaries already in memory
    ///
    /// Same preconditions and error contract as [`GraphicsPipeline::new`].
    pub fn from_code(
        device: &Arc<dyn GraphicsDevice>,
        vertex_code: &[u8],
        fragment_code: &[u8],
        config: &PipelineConfig,
    ) -> Result<Self> {
        let (layout, render_pass) = required_references(config);
        Self::build(device, vertex_code, fragment_code, config, layout, render_pass)
    }

    fn build(
        device: &Arc<dyn GraphicsDevice>,
        vertex_code: &[u8],
        fragment_code: &[u8],
        config: &PipelineConfig,
        layout: PipelineLayoutHandle,
        render_pass: RenderPassHandle,
    ) -> Result<Self> {
        crate::engine_debug!(
            "tv::GraphicsPipeline",
            "Vertex shader: {} bytes, fragment shader: {} bytes",
            vertex_code.len(),
            fragment_code.len()
        );

        let vertex_shader = ShaderModule::from_code(device, vertex_code, ShaderStage::Vertex)?;
        let fragment_shader = ShaderModule::from_code(device, fragment_code, ShaderStage::Fragment)?;

        let desc = GraphicsPipelineDesc {
            stages: [
                ShaderStageDesc {
                    module: vertex_shader.handle(),
                    stage: ShaderStage::Vertex,
                    entry_point: SHADER_ENTRY_POINT,
                },
                ShaderStageDesc {
                    module: fragment_shader.handle(),
                    stage: ShaderStage::Fragment,
                    entry_point: SHADER_ENTRY_POINT,
                },
            ],
            config,
            layout,
            render_pass,
            subpass: config.subpass,
        };

        let handle = device.create_graphics_pipeline(&desc)?;

        crate::engine_info!("tv::GraphicsPipeline", "Created graphics pipeline {:#x}", handle.as_raw());

        Ok(Self {
            device: Arc::downgrade(device),
            handle,
            vertex_shader,
            fragment_shader,
        })
    }

    /// Record "use this pipeline" into an open render pass
    pub fn bind(&self, pass: &mut RenderPassRecording<'_, '_>) {
        pass.bind_pipeline(self.handle);
    }

    pub fn handle(&self) -> PipelineHandle {
        self.handle
    }

    pub fn vertex_shader(&self) -> &ShaderModule {
        &self.vertex_shader
    }

    pub fn fragment_shader(&self) -> &ShaderModule {
        &self.fragment_shader
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        // Shader modules are fields and are released right after this
        match self.device.upgrade() {
            Some(device) => device.destroy_pipeline(self.handle),
            None => crate::engine_error!(
                "tv::GraphicsPipeline",
                "Device destroyed before graphics pipeline {:#x}; handle leaked",
                self.handle.as_raw()
            ),
        }
    }
}

fn required_references(config: &PipelineConfig) -> (PipelineLayoutHandle, RenderPassHandle) {
    match (config.pipeline_layout, config.render_pass) {
        (Some(layout), Some(render_pass)) => (layout, render_pass),
        (None, _) => panic!("Cannot create graphics pipeline: no pipeline_layout provided in config"),
        (_, None) => panic!("Cannot create graphics pipeline: no render_pass provided in config"),
    }
}

#[cfg(test)]
#[path = "graphics_pipeline_tests.rs"]
mod tests;
