//! Backend-agnostic shader IR, its code generator and the per-dialect program wrappers.

pub mod codegen;
pub mod dialect;
pub mod ir;
pub mod library;

pub use codegen::{generate, BackendOptions, ComponentMap, GeneratedShader, SamplerBinding};
pub use dialect::{ProgramSource, ShaderDialect};
pub use ir::{AssignOp, ShaderBuilder, ShaderOp, ShaderType, UniformDesc, MAX_CHANNELS};
