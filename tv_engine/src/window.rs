/// Window - the window/surface collaborator
///
/// `WindowProvider` is what the frame loop needs from a window. `Window` is
/// the winit-backed implementation; it also exposes the raw handles a
/// backend uses to create its presentation surface.

use std::time::Duration;
use raw_window_handle::{DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::WindowId;
use crate::error::Result;
use crate::graphics_device::Extent2D;

/// Window collaborator used by the frame loop
pub trait WindowProvider {
    /// True once the user asked to close the window
    fn should_close(&self) -> bool;

    /// Process pending input and window events without blocking
    fn poll_events(&mut self);

    /// Current drawable size in pixels
    fn extent(&self) -> Extent2D;
}

/// Window creation parameters
#[derive(Debug, Clone)]
pub struct WindowDesc {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub visible: bool,
    /// Allow the event loop to live outside the main thread (test harnesses)
    pub any_thread: bool,
}

impl Default for WindowDesc {
    fn default() -> Self {
        Self {
            title: "TV Window".to_string(),
            width: 800,
            height: 600,
            visible: true,
            any_thread: false,
        }
    }
}

/// Fixed-size native window with its own event loop
pub struct Window {
    // Declared before the event loop so the window is destroyed first
    state: WindowState,
    event_loop: EventLoop<()>,
}

struct WindowState {
    window: winit::window::Window,
    close_requested: bool,
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if window_id != self.window.id() {
            return;
        }
        match event {
            WindowEvent::CloseRequested => {
                crate::engine_debug!("tv::Window", "Close requested");
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                // Swapchain recreation is not supported; the extent stays fixed
                crate::engine_info!("tv::Window", "Window resized to {}x{}", size.width, size.height);
            }
            _ => {}
        }
    }
}

impl Window {
    /// Create the event loop and a non-resizable window
    pub fn new(desc: &WindowDesc) -> Result<Self> {
        let mut builder = EventLoop::builder();
        if desc.any_thread {
            allow_any_thread(&mut builder);
        }
        let event_loop = builder.build().map_err(|e| {
            crate::engine_err!("tv::Window", InitializationFailed, "Failed to create event loop: {}", e)
        })?;

        let attributes = winit::window::Window::default_attributes()
            .with_title(desc.title.clone())
            .with_inner_size(PhysicalSize::new(desc.width, desc.height))
            .with_resizable(false)
            .with_visible(desc.visible);

        #[allow(deprecated)]
        let window = event_loop.create_window(attributes).map_err(|e| {
            crate::engine_err!("tv::Window", InitializationFailed, "Failed to create window: {}", e)
        })?;

        crate::engine_info!("tv::Window", "Created window \"{}\" ({}x{})", desc.title, desc.width, desc.height);

        Ok(Self {
            state: WindowState {
                window,
                close_requested: false,
            },
            event_loop,
        })
    }

    /// Underlying winit window
    pub fn winit_window(&self) -> &winit::window::Window {
        &self.state.window
    }
}

impl WindowProvider for Window {
    fn should_close(&self) -> bool {
        self.state.close_requested
    }

    fn poll_events(&mut self) {
        if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(Some(Duration::ZERO), &mut self.state) {
            crate::engine_debug!("tv::Window", "Event loop exited with code {}", code);
            self.state.close_requested = true;
        }
    }

    fn extent(&self) -> Extent2D {
        let size = self.state.window.inner_size();
        Extent2D::new(size.width, size.height)
    }
}

impl HasWindowHandle for Window {
    fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
        self.state.window.window_handle()
    }
}

impl HasDisplayHandle for Window {
    fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
        self.state.window.display_handle()
    }
}

#[cfg(target_os = "windows")]
fn allow_any_thread(builder: &mut winit::event_loop::EventLoopBuilder<()>) {
    use winit::platform::windows::EventLoopBuilderExtWindows;
    builder.with_any_thread(true);
}

#[cfg(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly"
))]
fn allow_any_thread(builder: &mut winit::event_loop::EventLoopBuilder<()>) {
    use winit::platform::x11::EventLoopBuilderExtX11;
    EventLoopBuilderExtX11::with_any_thread(builder, true);
}

#[cfg(not(any(
    target_os = "windows",
    target_os = "linux",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly"
)))]
fn allow_any_thread(_builder: &mut winit::event_loop::EventLoopBuilder<()>) {
    crate::engine_warn!("tv::Window", "Event loop off the main thread is not supported on this platform");
}
