/// PipelineConfig - plain description of every fixed-function stage
///
/// A config is produced by `PipelineConfig::default_config`, customized by
/// the caller, then handed to `GraphicsPipeline::new`. The viewport-state and
/// color-blend-state views a backend consumes are computed on demand and
/// borrow from the config, so they can never outlive it or point into a
/// different instance after a clone.

use crate::graphics_device::{Extent2D, PipelineLayoutHandle, Rect2D, RenderPassHandle, Viewport};
use crate::pipeline::{
    ColorBlendAttachmentState, ColorBlendState, DepthStencilState, InputAssemblyState, LogicOp,
    MultisampleState, RasterizationState,
};

/// Fixed-function configuration of a graphics pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub input_assembly: InputAssemblyState,
    pub viewport: Viewport,
    pub scissor: Rect2D,
    pub rasterization: RasterizationState,
    pub multisample: MultisampleState,
    pub color_blend_attachment: ColorBlendAttachmentState,
    pub color_blend: ColorBlendState,
    pub depth_stencil: DepthStencilState,
    /// Externally owned layout; required before pipeline creation
    pub pipeline_layout: Option<PipelineLayoutHandle>,
    /// Externally owned render pass; required before pipeline creation
    pub render_pass: Option<RenderPassHandle>,
    pub subpass: u32,
}

/// Viewport state as seen by a backend
#[derive(Debug, Clone, Copy)]
pub struct ViewportStateView<'a> {
    pub viewports: &'a [Viewport],
    pub scissors: &'a [Rect2D],
}

/// Color blend state as seen by a backend
#[derive(Debug, Clone, Copy)]
pub struct ColorBlendStateView<'a> {
    pub logic_op_enable: bool,
    pub logic_op: LogicOp,
    pub attachments: &'a [ColorBlendAttachmentState],
    pub blend_constants: [f32; 4],
}

impl PipelineConfig {
    /// Default configuration for a `width` x `height` target
    ///
    /// Triangle list, one full-target viewport (depth 0..1) and scissor,
    /// filled polygons with no culling and clockwise front faces, one sample,
    /// one RGBA color attachment with blending disabled, depth test and
    /// write with `Less`. Layout and render pass are left unset. Zero extents
    /// are accepted.
    pub fn default_config(width: u32, height: u32) -> Self {
        Self {
            input_assembly: InputAssemblyState::default(),
            viewport: Viewport {
                x: 0.0,
                y: 0.0,
                width: width as f32,
                height: height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            },
            scissor: Rect2D::from_extent(Extent2D::new(width, height)),
            rasterization: RasterizationState::default(),
            multisample: MultisampleState::default(),
            color_blend_attachment: ColorBlendAttachmentState::default(),
            color_blend: ColorBlendState::default(),
            depth_stencil: DepthStencilState::default(),
            pipeline_layout: None,
            render_pass: None,
            subpass: 0,
        }
    }

    /// Viewport state referencing this config's viewport and scissor
    pub fn viewport_state(&self) -> ViewportStateView<'_> {
        ViewportStateView {
            viewports: std::slice::from_ref(&self.viewport),
            scissors: std::slice::from_ref(&self.scissor),
        }
    }

    /// Color blend state referencing this config's attachment
    pub fn color_blend_state(&self) -> ColorBlendStateView<'_> {
        ColorBlendStateView {
            logic_op_enable: self.color_blend.logic_op_enable,
            logic_op: self.color_blend.logic_op,
            attachments: std::slice::from_ref(&self.color_blend_attachment),
            blend_constants: self.color_blend.blend_constants,
        }
    }
}

#[cfg(test)]
#[path = "pipeline_config_tests.rs"]
mod tests;
