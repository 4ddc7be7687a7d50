use winit::event::WindowEvent;
use winit::window::WindowId;

use crate::renderer::Renderer;

use super::ctx::FrameCtx;

/// What the runtime should do after a callback.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Callbacks the window runtime invokes on the application.
///
/// Only [`App::on_frame`] is required.
pub trait App {
    /// A window's renderer has just connected. Load atlases and register pass shaders here.
    fn on_start(&mut self, _window_id: WindowId, _renderer: &mut Renderer<'_>) -> AppControl {
        AppControl::Continue
    }

    fn on_window_event(&mut self, _window_id: WindowId, _event: &WindowEvent) -> AppControl {
        AppControl::Continue
    }

    /// One redraw of one window; call [`FrameCtx::render`] to draw.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
