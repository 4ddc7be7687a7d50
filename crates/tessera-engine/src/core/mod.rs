//! Contracts between the window runtime and applications built on the renderer.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
