//! Frame graph: offscreen slots, pass stages and the shader registry they reference.

mod pipeline;
mod registry;
mod stage;
mod targets;
mod uniforms;

pub use pipeline::{run_stage, run_stages, FrameContext};
pub use registry::{RegisteredShader, ShaderRegistry};
pub use stage::{default_passes, RenderPassStage, UniformOverride, UniformValue};
pub use targets::{slot_sizes, OffscreenSlot, OFFSCREEN_SLOTS};
pub use uniforms::pack_uniforms;
