//! Tessera engine crate.
//!
//! A batched 2D tile/sprite renderer. Scenes are described on the CPU ([`scene`]), mirrored into
//! instance buffers ([`batch`]), lit ([`lighting`]) and pushed through a pass list of full-screen
//! programs ([`graph`]) authored once in a small shader IR ([`shader`]). The same frame runs on
//! GLES 2, GLES 3 or wgpu through [`backend::Backend`].

pub mod backend;
pub mod batch;
pub mod coords;
pub mod core;
pub mod device;
pub mod graph;
pub mod lighting;
pub mod logging;
pub mod scene;
pub mod shader;
pub mod spatial;
pub mod window;

mod error;
mod renderer;

pub use backend::{BackendKind, BlendMode, HostContext, Target, TextureData};
pub use error::{RenderError, RenderResult};
pub use graph::{OffscreenSlot, RenderPassStage, UniformValue};
pub use renderer::{Renderer, RendererConfig};
