//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and one [`crate::Renderer`] per window.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
