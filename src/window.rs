//! The window the instance is created for.
use std::ffi::CStr;

use raw_window_handle::HasRawDisplayHandle;
use thiserror::Error;
use winit::{
    dpi::LogicalSize,
    event::{Event, KeyboardInput, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    platform::run_return::EventLoopExtRunReturn,
    window::{Window, WindowBuilder},
};

/// Window title, also advertised as the application name.
pub const WINDOW_TITLE: &str = "Vulkan Application";
/// Fixed inner width of the window.
pub const WINDOW_WIDTH: u32 = 800;
/// Fixed inner height of the window.
pub const WINDOW_HEIGHT: u32 = 600;

/// Errors that can occur during window creation.
#[derive(Debug, Error)]
pub enum WindowError {
    /// The platform refused to create the window.
    #[error("failed to create window")]
    Os(#[from] winit::error::OsError),
}

/// A non-resizable window together with its event loop.
///
/// Dropping it destroys the window, then shuts the event loop down.
pub struct AppWindow {
    window: Window,
    event_loop: EventLoop<()>,
}

impl AppWindow {
    /// Opens the window. winit creates no graphics context of its own.
    pub fn new() -> Result<Self, WindowError> {
        let event_loop = EventLoop::new();
        let window = WindowBuilder::new()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
            .with_resizable(false)
            .build(&event_loop)?;

        Ok(AppWindow { window, event_loop })
    }

    /// The winit window.
    #[inline]
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Instance extensions needed to present to this window. Empty if the
    /// platform is not supported.
    pub fn required_extensions(&self) -> Vec<&'static CStr> {
        match ash_window::enumerate_required_extensions(self.window.raw_display_handle()) {
            Ok(extensions) => extensions
                .iter()
                .map(|&extension| unsafe { CStr::from_ptr(extension) })
                .collect(),
            Err(err) => {
                log::warn!("no surface extensions for this platform: {err}");
                Vec::new()
            }
        }
    }

    /// Pumps events until the window is closed or `Esc` is pressed.
    pub fn run_until_closed(&mut self) {
        let window_id = self.window.id();
        self.event_loop.run_return(|event, _, control_flow| {
            *control_flow = ControlFlow::Wait;
            match event {
                Event::WindowEvent {
                    event:
                        WindowEvent::CloseRequested
                        | WindowEvent::KeyboardInput {
                            input:
                                KeyboardInput {
                                    virtual_keycode: Some(VirtualKeyCode::Escape),
                                    ..
                                },
                            ..
                        },
                    window_id: id,
                } if id == window_id => *control_flow = ControlFlow::Exit,
                _ => (),
            }
        });
    }
}
