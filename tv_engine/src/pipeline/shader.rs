/// Shader binary loading and shader module ownership

use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Arc, Weak};
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, ShaderModuleHandle, ShaderStage};

/// Read a compiled shader binary whole
///
/// The bytes are returned as-is; no header validation happens here.
///
/// # Errors
///
/// `Error::ShaderNotFound` when the file cannot be opened because it does not
/// exist, `Error::ShaderReadFailed` for any other I/O failure.
pub fn load_shader_code(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    match std::fs::read(path) {
        Ok(code) => {
            crate::engine_trace!("tv::shader", "Read {} bytes from {}", code.len(), path.display());
            Ok(code)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(crate::engine_err!("tv::shader", ShaderNotFound, "{}", path.display()))
        }
        Err(e) => {
            Err(crate::engine_err!("tv::shader", ShaderReadFailed, "{}: {}", path.display(), e))
        }
    }
}

/// A shader binary registered with a device
///
/// Destroyed when dropped. If the device is already gone the handle is
/// reported as leaked instead.
pub struct ShaderModule {
    device: Weak<dyn GraphicsDevice>,
    handle: ShaderModuleHandle,
    stage: ShaderStage,
}

impl ShaderModule {
    /// Register `code` as a shader module
    pub fn from_code(device: &Arc<dyn GraphicsDevice>, code: &[u8], stage: ShaderStage) -> Result<Self> {
        let handle = device.create_shader_module(code, stage)?;
        Ok(Self {
            device: Arc::downgrade(device),
            handle,
            stage,
        })
    }

    /// Read the binary at `path` and register it
    pub fn load(device: &Arc<dyn GraphicsDevice>, path: impl AsRef<Path>, stage: ShaderStage) -> Result<Self> {
        let code = load_shader_code(path)?;
        Self::from_code(device, &code, stage)
    }

    pub fn handle(&self) -> ShaderModuleHandle {
        self.handle
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        match self.device.upgrade() {
            Some(device) => device.destroy_shader_module(self.handle),
            None => crate::engine_error!(
                "tv::shader",
                "Device destroyed before {:?} shader module {:#x}; handle leaked",
                self.stage,
                self.handle.as_raw()
            ),
        }
    }
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
