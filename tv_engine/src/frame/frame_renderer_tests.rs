//! Unit tests for frame_renderer.rs
//!
//! Uses the mock device and swapchain: no GPU required.

use std::sync::{Arc, Mutex};
use serial_test::serial;
use crate::error::Error;
use crate::frame::*;
use crate::log::{LogEntry, LogSeverity, Logger};
use crate::tv::Engine;
use crate::graphics_device::mock_graphics_device::{MockCommand, MockGraphicsDevice, MockSwapchain};
use crate::graphics_device::*;
use crate::pipeline::{GraphicsPipeline, PipelineConfig};

// ============================================================================
// TEST HELPERS
// ============================================================================

struct Fixture {
    mock: Arc<MockGraphicsDevice>,
    device: Arc<dyn GraphicsDevice>,
    swapchain: MockSwapchain,
    pipeline: GraphicsPipeline,
}

fn fixture(image_count: usize) -> Fixture {
    let mock = Arc::new(MockGraphicsDevice::new());
    let device: Arc<dyn GraphicsDevice> = mock.clone();
    let swapchain = MockSwapchain::new(image_count, Extent2D::new(800, 600));

    let mut config = PipelineConfig::default_config(800, 600);
    config.pipeline_layout = Some(PipelineLayoutHandle::from_raw(0x100));
    config.render_pass = Some(swapchain.render_pass());
    let pipeline = GraphicsPipeline::from_code(&device, &[0; 4], &[0; 4], &config).unwrap();

    Fixture { mock, device, swapchain, pipeline }
}

// ============================================================================
// RECORDING
// ============================================================================

#[test]
fn test_new_records_one_buffer_per_image() {
    let f = fixture(3);

    let renderer = FrameRenderer::new(&f.device, &f.swapchain, &f.pipeline).unwrap();

    assert_eq!(renderer.command_buffer_count(), 3);
    assert_eq!(renderer.frames_drawn(), 0);
    let state = f.mock.state();
    assert_eq!(state.command_buffers.len(), 3);
    for buffer in state.command_buffers.values() {
        assert_eq!(buffer.begin_count, 1);
        assert_eq!(buffer.end_count, 1);
    }
}

#[test]
fn test_recorded_commands_per_image() {
    let f = fixture(2);

    let renderer = FrameRenderer::new(&f.device, &f.swapchain, &f.pipeline).unwrap();

    for index in 0..2 {
        let cb = renderer.command_buffer(index).unwrap();
        let commands = f.mock.recorded_commands(cb);
        assert_eq!(
            commands,
            vec![
                MockCommand::BeginRenderPass {
                    render_pass: f.swapchain.render_pass(),
                    framebuffer: f.swapchain.framebuffer(index).unwrap(),
                    render_area: Rect2D::from_extent(Extent2D::new(800, 600)),
                    clear_values: vec![
                        ClearValue::Color([0.1, 0.1, 0.1, 1.0]),
                        ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
                    ],
                },
                MockCommand::BindPipeline(f.pipeline.handle()),
                MockCommand::Draw {
                    vertex_count: 3,
                    instance_count: 1,
                    first_vertex: 0,
                    first_instance: 0,
                },
                MockCommand::EndRenderPass,
            ]
        );
    }
}

#[test]
fn test_draw_frame_does_not_rerecord() {
    let f = fixture(2);
    let mut swapchain = f.swapchain;
    let mut renderer = FrameRenderer::new(&f.device, &swapchain, &f.pipeline).unwrap();
    let begins_after_recording = f.mock.state().begin_calls;

    for _ in 0..5 {
        renderer.draw_frame(&mut swapchain).unwrap();
    }

    assert_eq!(f.mock.state().begin_calls, begins_after_recording);
}

#[test]
fn test_allocation_failure_propagates() {
    let f = fixture(2);
    f.mock.state().fail.allocation = true;

    let result = FrameRenderer::new(&f.device, &f.swapchain, &f.pipeline);

    assert!(matches!(result, Err(Error::CommandBufferAllocationFailed(_))));
}

#[test]
fn test_recording_failure_frees_buffers() {
    let f = fixture(3);
    let begins_before = f.mock.state().begin_calls;
    f.mock.state().fail.begin_at = Some(begins_before + 1);

    let result = FrameRenderer::new(&f.device, &f.swapchain, &f.pipeline);

    assert!(matches!(result, Err(Error::CommandRecordingFailed(_))));
    let state = f.mock.state();
    assert!(state.command_buffers.is_empty());
    assert_eq!(state.freed_command_buffers.len(), 3);
}

#[test]
fn test_end_failure_is_recording_error() {
    let f = fixture(2);
    f.mock.state().fail.end = true;

    let result = FrameRenderer::new(&f.device, &f.swapchain, &f.pipeline);

    assert!(matches!(result, Err(Error::CommandRecordingFailed(_))));
    assert!(f.mock.state().command_buffers.is_empty());
}

#[test]
fn test_drop_frees_buffers() {
    let f = fixture(2);
    let renderer = FrameRenderer::new(&f.device, &f.swapchain, &f.pipeline).unwrap();

    drop(renderer);

    let state = f.mock.state();
    assert!(state.command_buffers.is_empty());
    assert_eq!(state.freed_command_buffers.len(), 2);
}

// ============================================================================
// FRAME PROTOCOL
// ============================================================================

#[test]
fn test_two_image_swapchain_acquire_order() {
    let f = fixture(2);
    let mut swapchain = f.swapchain;
    swapchain.script_indices(&[0, 1, 0]);
    let mut renderer = FrameRenderer::new(&f.device, &swapchain, &f.pipeline).unwrap();

    let drawn: Vec<u32> = (0..3).map(|_| renderer.draw_frame(&mut swapchain).unwrap()).collect();

    assert_eq!(drawn, vec![0, 1, 0]);
    let cb0 = renderer.command_buffer(0).unwrap();
    let cb1 = renderer.command_buffer(1).unwrap();
    assert_eq!(swapchain.submissions, vec![(cb0, 0), (cb1, 1), (cb0, 0)]);
    assert_eq!(renderer.frames_drawn(), 3);
}

/// Keeps warnings about suboptimal swapchains
#[derive(Clone, Default)]
struct SuboptimalWarnings {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for SuboptimalWarnings {
    fn log(&self, entry: &LogEntry) {
        if entry.severity == LogSeverity::Warn && entry.message.contains("suboptimal") {
            self.entries.lock().unwrap().push(entry.clone());
        }
    }
}

#[test]
#[serial]
fn test_suboptimal_is_drawn_like_ready() {
    let f = fixture(2);
    let mut swapchain = f.swapchain;
    swapchain.acquire_script.push_back(Ok(AcquiredImage::Suboptimal(1)));
    swapchain.acquire_script.push_back(Ok(AcquiredImage::Suboptimal(0)));
    let mut renderer = FrameRenderer::new(&f.device, &swapchain, &f.pipeline).unwrap();

    assert_eq!(renderer.draw_frame(&mut swapchain).unwrap(), 1);
    assert_eq!(renderer.draw_frame(&mut swapchain).unwrap(), 0);
    assert_eq!(swapchain.submissions.len(), 2);
}

#[test]
#[serial]
fn test_suboptimal_warning_logged_once() {
    let warnings = SuboptimalWarnings::default();
    Engine::set_logger(warnings.clone());

    let f = fixture(2);
    let mut swapchain = f.swapchain;
    swapchain.acquire_script.push_back(Ok(AcquiredImage::Suboptimal(0)));
    swapchain.acquire_script.push_back(Ok(AcquiredImage::Suboptimal(1)));
    swapchain.acquire_script.push_back(Ok(AcquiredImage::Suboptimal(0)));
    let mut renderer = FrameRenderer::new(&f.device, &swapchain, &f.pipeline).unwrap();

    for _ in 0..3 {
        renderer.draw_frame(&mut swapchain).unwrap();
    }
    let logged = warnings.entries.lock().unwrap().clone();
    Engine::reset_logger();

    assert_eq!(renderer.frames_drawn(), 3);
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].source, "tv::FrameRenderer");
}

#[test]
fn test_out_of_date_acquire_propagates_without_submit() {
    let f = fixture(2);
    let mut swapchain = f.swapchain;
    swapchain.acquire_script.push_back(Err(Error::SwapchainOutOfDate));
    let mut renderer = FrameRenderer::new(&f.device, &swapchain, &f.pipeline).unwrap();

    let result = renderer.draw_frame(&mut swapchain);

    assert!(matches!(result, Err(Error::SwapchainOutOfDate)));
    assert!(swapchain.submissions.is_empty());
    assert_eq!(renderer.frames_drawn(), 0);
}

#[test]
fn test_acquire_failure_propagates() {
    let f = fixture(2);
    let mut swapchain = f.swapchain;
    swapchain.acquire_script.push_back(Err(Error::AcquireFailed("timeout".to_string())));
    let mut renderer = FrameRenderer::new(&f.device, &swapchain, &f.pipeline).unwrap();

    assert!(matches!(renderer.draw_frame(&mut swapchain), Err(Error::AcquireFailed(_))));
}

#[test]
fn test_index_out_of_range_is_frame_protocol_error() {
    let f = fixture(2);
    let mut swapchain = f.swapchain;
    swapchain.script_indices(&[2]);
    let mut renderer = FrameRenderer::new(&f.device, &swapchain, &f.pipeline).unwrap();

    let result = renderer.draw_frame(&mut swapchain);

    assert!(matches!(result, Err(Error::FrameProtocol(_))));
    assert!(swapchain.submissions.is_empty());
}

#[test]
fn test_submit_failure_propagates() {
    let f = fixture(2);
    let mut swapchain = f.swapchain;
    swapchain.submit_error = Some(Error::SubmissionFailed("device lost".to_string()));
    let mut renderer = FrameRenderer::new(&f.device, &swapchain, &f.pipeline).unwrap();

    assert!(matches!(renderer.draw_frame(&mut swapchain), Err(Error::SubmissionFailed(_))));
    assert_eq!(renderer.frames_drawn(), 0);
}

#[test]
fn test_drop_after_device_gone_leaks_buffers() {
    let f = fixture(2);
    let renderer = FrameRenderer::new(&f.device, &f.swapchain, &f.pipeline).unwrap();
    let Fixture { mock, device, pipeline, .. } = f;

    drop(pipeline);
    drop(device);
    drop(mock);

    drop(renderer);
}
