use crate::backend::{Backend, Target};
use crate::coords::SurfaceSize;
use crate::error::{RenderError, RenderResult};
use crate::shader::MAX_CHANNELS;

use super::{pack_uniforms, slot_sizes, RenderPassStage, ShaderRegistry, OFFSCREEN_SLOTS};

/// Per-frame inputs every stage invocation needs.
#[derive(Debug, Copy, Clone)]
pub struct FrameContext {
    pub surface: SurfaceSize,
    /// Seconds since the renderer was initialised.
    pub time: f32,
    targets: [SurfaceSize; OFFSCREEN_SLOTS],
}

impl FrameContext {
    pub fn new(surface: SurfaceSize, time: f32) -> Self {
        Self { surface, time, targets: slot_sizes(surface) }
    }

    /// Pixel size of `target`; used as the `resolution` uniform.
    pub fn size_of(&self, target: Target) -> RenderResult<SurfaceSize> {
        match target {
            Target::Surface => Ok(self.surface),
            Target::Offscreen(i) => self.targets.get(i).copied().ok_or(RenderError::UnknownTarget(i)),
        }
    }
}

/// Validates `stage` and issues it as one `run_program` call.
pub fn run_stage(
    backend: &mut dyn Backend,
    registry: &ShaderRegistry,
    stage: &RenderPassStage,
    frame: &FrameContext,
) -> RenderResult<()> {
    let shader = registry.get(&stage.shader)?;

    if stage.inputs.len() > MAX_CHANNELS {
        return Err(RenderError::TooManyInputs {
            shader: stage.shader.clone(),
            count: stage.inputs.len(),
            max: MAX_CHANNELS,
        });
    }
    if let Some(&bad) = stage.inputs.iter().find(|&&i| i >= OFFSCREEN_SLOTS) {
        return Err(RenderError::UnknownTarget(bad));
    }

    let resolution = frame.size_of(stage.output)?;
    let uniforms = pack_uniforms(&shader.builder, resolution, frame.time, &stage.uniform_overrides);

    backend.run_program(&stage.shader, &stage.inputs, stage.output, &uniforms, stage.clear_color)
}

/// Runs `stages` in order, stopping at the first failure.
pub fn run_stages(
    backend: &mut dyn Backend,
    registry: &ShaderRegistry,
    stages: &[RenderPassStage],
    frame: &FrameContext,
) -> RenderResult<()> {
    for stage in stages {
        run_stage(backend, registry, stage, frame)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Call, RecordingBackend};
    use crate::backend::BackendKind;
    use crate::graph::OffscreenSlot;
    use crate::shader::library;

    fn setup() -> (RecordingBackend, ShaderRegistry) {
        let mut backend = RecordingBackend::new(BackendKind::Gles3);
        let mut reg = ShaderRegistry::new();
        reg.register_builtins(&mut backend).unwrap();
        (backend, reg)
    }

    #[test]
    fn resolution_is_the_output_size() {
        let (mut backend, reg) = setup();
        let frame = FrameContext::new(SurfaceSize::new(200, 100), 2.0);
        let stage = RenderPassStage::new(library::BLUR_H, Target::Offscreen(OffscreenSlot::BlurTemp.index()))
            .input(OffscreenSlot::LightTemp)
            .uniform("radius", 3.0f32);

        run_stage(&mut backend, &reg, &stage, &frame).unwrap();

        let log = backend.log();
        let log = log.borrow();
        let Some(Call::RunProgram { uniforms, .. }) = log.calls.last() else {
            panic!("expected a program run");
        };
        assert_eq!(uniforms, &vec![100.0, 50.0, 2.0, 3.0]);
    }

    #[test]
    fn unregistered_shader_fails_before_drawing() {
        let (mut backend, reg) = setup();
        let frame = FrameContext::new(SurfaceSize::new(10, 10), 0.0);
        let stage = RenderPassStage::new("bloom", Target::Surface);

        let err = run_stage(&mut backend, &reg, &stage, &frame).unwrap_err();
        assert!(matches!(err, RenderError::UnknownShader(_)));
        assert_eq!(backend.log().borrow().count(|c| matches!(c, Call::RunProgram { .. })), 0);
    }

    #[test]
    fn too_many_inputs_is_rejected() {
        let (mut backend, reg) = setup();
        let frame = FrameContext::new(SurfaceSize::new(10, 10), 0.0);
        let mut stage = RenderPassStage::new(library::COPY, Target::Surface);
        stage.inputs = vec![0; MAX_CHANNELS + 1];

        let err = run_stage(&mut backend, &reg, &stage, &frame).unwrap_err();
        assert!(matches!(err, RenderError::TooManyInputs { count: 9, max: 8, .. }));
    }

    #[test]
    fn out_of_range_input_is_rejected() {
        let (mut backend, reg) = setup();
        let frame = FrameContext::new(SurfaceSize::new(10, 10), 0.0);
        let mut stage = RenderPassStage::new(library::COPY, Target::Surface);
        stage.inputs = vec![OFFSCREEN_SLOTS];

        let err = run_stage(&mut backend, &reg, &stage, &frame).unwrap_err();
        assert!(matches!(err, RenderError::UnknownTarget(8)));
    }
}
