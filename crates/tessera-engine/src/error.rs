//! Renderer error type.
//!
//! Every variant is terminal for the call that produced it: these indicate programmer or
//! configuration mistakes (or a host that cannot run the selected backend), never transient
//! conditions worth retrying.

use crate::backend::BackendKind;

/// Errors surfaced by [`crate::Renderer`] and the backend adapters.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("backend {kind:?} is not supported by this host: {reason}")]
    UnsupportedBackend { kind: BackendKind, reason: String },

    #[error("shader `{name}` failed to compile: {log}")]
    ShaderCompile { name: String, log: String },

    #[error("unknown shader `{0}`")]
    UnknownShader(String),

    #[error("unknown texture `{0}`")]
    UnknownTexture(String),

    #[error("texture `{name}` has {actual} bytes, expected {expected} for {width}x{height} RGBA8")]
    InvalidTexture {
        name: String,
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("pass stage `{shader}` samples {count} inputs; at most {max} are supported")]
    TooManyInputs {
        shader: String,
        count: usize,
        max: usize,
    },

    #[error("offscreen target {0} does not exist")]
    UnknownTarget(usize),

    #[error("renderer used before init() completed")]
    NotInitialized,

    #[error("surface error: {0}")]
    Surface(String),
}

impl From<wgpu::SurfaceError> for RenderError {
    fn from(e: wgpu::SurfaceError) -> Self {
        RenderError::Surface(e.to_string())
    }
}

pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_shader_display() {
        let err = RenderError::UnknownShader("bloom".to_string());
        assert_eq!(err.to_string(), "unknown shader `bloom`");
    }

    #[test]
    fn unsupported_backend_display_names_kind() {
        let err = RenderError::UnsupportedBackend {
            kind: BackendKind::Gles3,
            reason: "no GL context".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "backend Gles3 is not supported by this host: no GL context"
        );
    }

    #[test]
    fn too_many_inputs_display() {
        let err = RenderError::TooManyInputs { shader: "blur".into(), count: 9, max: 8 };
        assert_eq!(
            err.to_string(),
            "pass stage `blur` samples 9 inputs; at most 8 are supported"
        );
    }
}
