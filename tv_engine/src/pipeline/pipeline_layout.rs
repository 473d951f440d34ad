/// PipelineLayout - scoped owner of a pipeline layout handle
///
/// Created by the application driver and referenced, unowned, from
/// `PipelineConfig::pipeline_layout`. Must outlive every pipeline built with it.

use std::sync::{Arc, Weak};
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, PipelineLayoutDesc, PipelineLayoutHandle};

pub struct PipelineLayout {
    device: Weak<dyn GraphicsDevice>,
    handle: PipelineLayoutHandle,
}

impl PipelineLayout {
    pub fn new(device: &Arc<dyn GraphicsDevice>, desc: &PipelineLayoutDesc) -> Result<Self> {
        let handle = device.create_pipeline_layout(desc)?;
        crate::engine_debug!(
            "tv::PipelineLayout",
            "Created pipeline layout {:#x} ({} push constant ranges)",
            handle.as_raw(),
            desc.push_constant_ranges.len()
        );
        Ok(Self {
            device: Arc::downgrade(device),
            handle,
        })
    }

    /// Layout with no descriptor sets and no push constants
    pub fn empty(device: &Arc<dyn GraphicsDevice>) -> Result<Self> {
        Self::new(device, &PipelineLayoutDesc::default())
    }

    pub fn handle(&self) -> PipelineLayoutHandle {
        self.handle
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        match self.device.upgrade() {
            Some(device) => device.destroy_pipeline_layout(self.handle),
            None => crate::engine_error!(
                "tv::PipelineLayout",
                "Device destroyed before pipeline layout {:#x}; handle leaked",
                self.handle.as_raw()
            ),
        }
    }
}
