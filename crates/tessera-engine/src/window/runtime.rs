use anyhow::{bail, Context, Result};
use ouroboros::self_referencing;
use std::collections::HashMap;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::backend::{BackendKind, HostContext};
use crate::coords::SurfaceSize;
use crate::core::{App, AppControl, FrameCtx, WindowCtx};
use crate::renderer::{Renderer, RendererConfig};

/// Settings for one runtime-owned window and its renderer.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Must be [`BackendKind::Wgpu`]. GL embedders own their context and call
    /// [`Renderer::init`] themselves.
    pub backend: BackendKind,
    pub renderer: RendererConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "tessera".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            backend: BackendKind::Wgpu,
            renderer: RendererConfig::default(),
        }
    }
}

impl RuntimeConfig {
    fn check(&self) -> Result<()> {
        if self.backend != BackendKind::Wgpu {
            bail!("the window runtime only hosts wgpu surfaces, got {:?}", self.backend);
        }
        Ok(())
    }
}

/// Requests an app can make from inside a callback. They take effect once the callback
/// returns.
#[derive(Default)]
pub struct RuntimeCtx {
    queue: Vec<Request>,
}

enum Request {
    Open(RuntimeConfig),
    Close(WindowId),
    Quit,
}

impl RuntimeCtx {
    pub fn create_window(&mut self, config: RuntimeConfig) {
        self.queue.push(Request::Open(config));
    }

    pub fn close_window(&mut self, id: WindowId) {
        self.queue.push(Request::Close(id));
    }

    pub fn exit(&mut self) {
        self.queue.push(Request::Quit);
    }
}

/// Drives a [`App`] with winit: one window and one renderer per [`RuntimeConfig`].
pub struct Runtime;

impl Runtime {
    /// Blocks until every window is closed or the app asks to exit.
    pub fn run<A: App + 'static>(initial: RuntimeConfig, app: A) -> Result<()> {
        initial.check()?;
        let event_loop = EventLoop::new().context("failed to create winit event loop")?;
        let mut host = Host {
            pending: Some(initial),
            app,
            windows: HashMap::new(),
            quitting: false,
        };
        event_loop
            .run_app(&mut host)
            .context("winit event loop terminated with error")
    }
}

/// A window and the renderer borrowing it.
#[self_referencing]
struct Hosted {
    window: Window,
    previous_frame: Instant,
    #[borrows(window)]
    #[covariant]
    renderer: Renderer<'this>,
}

impl Hosted {
    fn open(event_loop: &ActiveEventLoop, config: RuntimeConfig) -> Result<Self> {
        config.check()?;
        let attrs = Window::default_attributes()
            .with_title(config.title)
            .with_inner_size(config.initial_size);
        let window = event_loop.create_window(attrs).context("failed to create window")?;

        let size = physical_size(&window);
        let (kind, renderer_config) = (config.backend, config.renderer);
        HostedTryBuilder {
            window,
            previous_frame: Instant::now(),
            renderer_builder: |w| {
                pollster::block_on(Renderer::init(kind, HostContext::Window(w), size, &[], renderer_config))
            },
        }
        .try_build()
        .with_context(|| format!("failed to start {kind:?} renderer"))
    }

    fn follow_window_size(&mut self) {
        self.with_mut(|f| {
            f.renderer.set_size(physical_size(f.window));
            f.window.request_redraw();
        });
    }
}

fn physical_size(window: &Window) -> SurfaceSize {
    let size = window.inner_size();
    SurfaceSize::new(size.width, size.height)
}

struct Host<A> {
    pending: Option<RuntimeConfig>,
    app: A,
    windows: HashMap<WindowId, Hosted>,
    quitting: bool,
}

impl<A: App + 'static> Host<A> {
    fn open(&mut self, event_loop: &ActiveEventLoop, config: RuntimeConfig) {
        let mut hosted = match Hosted::open(event_loop, config) {
            Ok(hosted) => hosted,
            Err(e) => {
                log::error!("{e:#}");
                self.quitting = true;
                return;
            }
        };

        let id = hosted.borrow_window().id();
        if hosted.with_renderer_mut(|r| self.app.on_start(id, r)) == AppControl::Exit {
            self.quitting = true;
        }
        hosted.borrow_window().request_redraw();
        self.windows.insert(id, hosted);
    }

    fn apply(&mut self, event_loop: &ActiveEventLoop, ctx: RuntimeCtx) {
        for request in ctx.queue {
            match request {
                Request::Open(config) => self.open(event_loop, config),
                Request::Close(id) => {
                    self.windows.remove(&id);
                }
                Request::Quit => self.quitting = true,
            }
        }
    }

    fn redraw(&mut self, window_id: WindowId) -> RuntimeCtx {
        let mut runtime = RuntimeCtx::default();
        let Some(hosted) = self.windows.get_mut(&window_id) else { return runtime };

        let app = &mut self.app;
        let control = hosted.with_mut(|f| {
            let now = Instant::now();
            let dt = now.saturating_duration_since(*f.previous_frame).as_secs_f32();
            *f.previous_frame = now;

            app.on_frame(&mut FrameCtx {
                window: WindowCtx { id: window_id, window: f.window },
                renderer: f.renderer,
                runtime: &mut runtime,
                dt,
            })
        });
        if control == AppControl::Exit {
            runtime.exit();
        }
        runtime
    }

    /// Ends the loop once asked to, or once no window is left.
    fn settle(&mut self, event_loop: &ActiveEventLoop) {
        if self.quitting || self.windows.is_empty() {
            self.windows.clear();
            event_loop.exit();
        }
    }
}

impl<A: App + 'static> ApplicationHandler for Host<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(config) = self.pending.take() {
            self.open(event_loop, config);
            self.settle(event_loop);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
        // Lights and dynamic layers may change every frame.
        for hosted in self.windows.values() {
            hosted.borrow_window().request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.app.on_window_event(window_id, &event) == AppControl::Exit {
            self.quitting = true;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.windows.remove(&window_id);
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(hosted) = self.windows.get_mut(&window_id) {
                    hosted.follow_window_size();
                }
            }
            WindowEvent::RedrawRequested if !self.quitting => {
                let ctx = self.redraw(window_id);
                self.apply(event_loop, ctx);
            }
            _ => {}
        }

        self.settle(event_loop);
    }
}
