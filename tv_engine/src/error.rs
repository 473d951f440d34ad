//! Error types for the TV engine
//!
//! Every failure in this crate is fatal for the process: there is no local
//! recovery or retry. Errors are grouped into categories so the driver can
//! report what kind of failure ended the run.

use std::fmt;

/// Result type for TV engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// TV engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Instance, device, queue or allocator bootstrap failed
    InitializationFailed(String),

    /// Native window surface could not be created
    SurfaceCreationFailed(String),

    /// Pipeline layout creation failed
    PipelineLayoutCreationFailed(String),

    /// Shader module registration or graphics pipeline assembly failed
    PipelineCreationFailed(String),

    /// Command buffers could not be allocated from the pool
    CommandBufferAllocationFailed(String),

    /// Beginning or ending a command buffer or render pass failed
    CommandRecordingFailed(String),

    /// Acquiring the next swapchain image failed
    AcquireFailed(String),

    /// The swapchain no longer matches the surface
    SwapchainOutOfDate,

    /// Queue submission or presentation failed
    SubmissionFailed(String),

    /// The frame protocol was driven with inconsistent state (e.g. bad image index)
    FrameProtocol(String),

    /// Shader binary file does not exist
    ShaderNotFound(String),

    /// Shader binary file exists but could not be read
    ShaderReadFailed(String),

    /// Backend-specific error not covered by another variant
    BackendError(String),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Creating a GPU or window resource failed (startup)
    ResourceCreation,
    /// Recording a command buffer failed
    Recording,
    /// Acquire, submit or present failed
    FrameProtocol,
    /// Reading a file failed
    Io,
}

impl Error {
    /// Category this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InitializationFailed(_)
            | Error::SurfaceCreationFailed(_)
            | Error::PipelineLayoutCreationFailed(_)
            | Error::PipelineCreationFailed(_)
            | Error::CommandBufferAllocationFailed(_)
            | Error::BackendError(_) => ErrorCategory::ResourceCreation,
            Error::CommandRecordingFailed(_) => ErrorCategory::Recording,
            Error::AcquireFailed(_)
            | Error::SwapchainOutOfDate
            | Error::SubmissionFailed(_)
            | Error::FrameProtocol(_) => ErrorCategory::FrameProtocol,
            Error::ShaderNotFound(_) | Error::ShaderReadFailed(_) => ErrorCategory::Io,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::SurfaceCreationFailed(msg) => write!(f, "Failed to create window surface: {}", msg),
            Error::PipelineLayoutCreationFailed(msg) => write!(f, "Failed to create pipeline layout: {}", msg),
            Error::PipelineCreationFailed(msg) => write!(f, "Failed to create graphics pipeline: {}", msg),
            Error::CommandBufferAllocationFailed(msg) => write!(f, "Failed to allocate command buffers: {}", msg),
            Error::CommandRecordingFailed(msg) => write!(f, "Failed to record command buffer: {}", msg),
            Error::AcquireFailed(msg) => write!(f, "Failed to acquire swapchain image: {}", msg),
            Error::SwapchainOutOfDate => write!(f, "Swapchain out of date"),
            Error::SubmissionFailed(msg) => write!(f, "Failed to present swapchain image: {}", msg),
            Error::FrameProtocol(msg) => write!(f, "Frame protocol violation: {}", msg),
            Error::ShaderNotFound(path) => write!(f, "Failed to open file: {}", path),
            Error::ShaderReadFailed(msg) => write!(f, "Failed to read shader binary: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
