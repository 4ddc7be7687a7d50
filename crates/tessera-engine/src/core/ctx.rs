use winit::window::{Window, WindowId};

use crate::error::RenderResult;
use crate::renderer::Renderer;
use crate::scene::{Camera, Scene};
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// Per-window handles.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl WindowCtx<'_> {
    /// Physical window size as `(width, height)`.
    pub fn physical_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Renderer<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub renderer: &'a mut Renderer<'w>,
    pub runtime: &'a mut RuntimeCtx,
    /// Seconds since the previous redraw of this window.
    pub dt: f32,
}

impl FrameCtx<'_, '_> {
    /// Renders and presents `scene` through `camera`.
    ///
    /// Every [`crate::RenderError`] is terminal: the error is logged and the app is told to exit.
    /// Surface timeouts never get here; the backend drops those frames itself.
    pub fn render(&mut self, scene: &Scene, camera: &Camera) -> AppControl {
        self.window.window.pre_present_notify();
        control_after(self.renderer.render(scene, camera))
    }
}

fn control_after(result: RenderResult<()>) -> AppControl {
    match result {
        Ok(()) => AppControl::Continue,
        Err(err) => {
            log::error!("rendering stopped: {err}");
            AppControl::Exit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendKind;
    use crate::error::RenderError;

    #[test]
    fn successful_frame_continues() {
        assert_eq!(control_after(Ok(())), AppControl::Continue);
    }

    #[test]
    fn every_render_error_exits() {
        let errors = [
            RenderError::UnsupportedBackend { kind: BackendKind::Gles2, reason: "no GL".into() },
            RenderError::ShaderCompile { name: "bloom".into(), log: "syntax".into() },
            RenderError::UnknownShader("bloom".into()),
            RenderError::UnknownTexture("tiles".into()),
            RenderError::InvalidTexture {
                name: "tiles".into(),
                width: 2,
                height: 2,
                expected: 16,
                actual: 3,
            },
            RenderError::TooManyInputs { shader: "mix".into(), count: 9, max: 8 },
            RenderError::UnknownTarget(12),
            RenderError::NotInitialized,
            RenderError::Surface("lost".into()),
        ];
        for err in errors {
            let shown = err.to_string();
            assert_eq!(control_after(Err(err)), AppControl::Exit, "{shown}");
        }
    }
}
