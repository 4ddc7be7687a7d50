use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{Backend, BlendMode, ProgramDesc};
use crate::error::{RenderError, RenderResult};
use crate::shader::{generate, library, ShaderBuilder};

/// A compiled full-screen program and the blueprint it came from.
#[derive(Debug, Clone)]
pub struct RegisteredShader {
    pub builder: Arc<ShaderBuilder>,
    pub blend: BlendMode,
}

/// Name → program table shared by the lighting chain and user pass stages.
#[derive(Debug, Default)]
pub struct ShaderRegistry {
    shaders: HashMap<String, RegisteredShader>,
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates `builder` for the backend's dialect and compiles it under `name`.
    ///
    /// Registering an existing name replaces it. A compile failure leaves the previous entry
    /// (if any) in place.
    pub fn register(
        &mut self,
        backend: &mut dyn Backend,
        name: &str,
        builder: Arc<ShaderBuilder>,
        blend: BlendMode,
    ) -> RenderResult<()> {
        let dialect = backend.dialect();
        let generated = generate(&builder, &dialect.options());
        let desc = ProgramDesc {
            source: dialect.fullscreen_program(&generated),
            uniforms: builder.uniforms().to_vec(),
            uniform_len: builder.uniform_len(),
            blend,
        };

        backend.compile_program(name, &desc)?;
        log::debug!("compiled shader `{name}` for {dialect:?} ({blend:?})");

        self.shaders.insert(name.to_string(), RegisteredShader { builder, blend });
        Ok(())
    }

    /// Registers the programs the lighting chain and default pass list depend on.
    pub fn register_builtins(&mut self, backend: &mut dyn Backend) -> RenderResult<()> {
        let copy = Arc::new(library::copy());
        self.register(backend, library::COPY, Arc::clone(&copy), BlendMode::Replace)?;
        self.register(backend, library::LIGHT_ACCUMULATE, copy, BlendMode::Additive)?;
        self.register(backend, library::LIGHT, Arc::new(library::light()), BlendMode::Replace)?;
        self.register(backend, library::BLUR_H, Arc::new(library::blur_h()), BlendMode::Replace)?;
        self.register(backend, library::BLUR_V, Arc::new(library::blur_v()), BlendMode::Replace)?;
        self.register(
            backend,
            library::VIGNETTE,
            Arc::new(library::vignette()),
            BlendMode::Replace,
        )?;
        self.register(
            backend,
            library::GRAYSCALE,
            Arc::new(library::grayscale()),
            BlendMode::Replace,
        )?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> RenderResult<&RegisteredShader> {
        self.shaders
            .get(name)
            .ok_or_else(|| RenderError::UnknownShader(name.to_string()))
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.shaders.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::RecordingBackend;
    use crate::backend::BackendKind;
    use crate::shader::{ProgramSource, ShaderType};

    #[test]
    fn builtins_share_copy_blueprint() {
        let mut backend = RecordingBackend::new(BackendKind::Gles3);
        let mut reg = ShaderRegistry::new();
        reg.register_builtins(&mut backend).unwrap();

        let copy = reg.get(library::COPY).unwrap();
        let acc = reg.get(library::LIGHT_ACCUMULATE).unwrap();
        assert!(Arc::ptr_eq(&copy.builder, &acc.builder));
        assert_eq!(acc.blend, BlendMode::Additive);
    }

    #[test]
    fn program_source_follows_backend_dialect() {
        let mut backend = RecordingBackend::new(BackendKind::Wgpu);
        let log = backend.log();
        let mut reg = ShaderRegistry::new();
        let fx = ShaderBuilder::new().uniform("k", ShaderType::Float);
        reg.register(&mut backend, "fx", Arc::new(fx), BlendMode::Alpha).unwrap();

        let log = log.borrow();
        let desc = log.program("fx").unwrap();
        assert!(matches!(desc.source, ProgramSource::Wgsl(_)));
        assert_eq!(desc.uniform_len, 4);
        assert_eq!(desc.blend, BlendMode::Alpha);
    }

    #[test]
    fn failed_compile_is_not_registered() {
        let mut backend = RecordingBackend::new(BackendKind::Gles2);
        backend.log().borrow_mut().fail_compile = Some("broken".to_string());
        let mut reg = ShaderRegistry::new();

        let err = reg
            .register(&mut backend, "broken", Arc::new(ShaderBuilder::new()), BlendMode::Replace)
            .unwrap_err();
        assert!(matches!(err, RenderError::ShaderCompile { .. }));
        assert!(!reg.contains("broken"));
    }

    #[test]
    fn unknown_name_is_an_error() {
        let reg = ShaderRegistry::new();
        assert!(matches!(reg.get("nope"), Err(RenderError::UnknownShader(n)) if n == "nope"));
    }
}
