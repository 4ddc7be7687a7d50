use crate::backend::Target;
use crate::coords::ColorRgba;

use super::OffscreenSlot;

/// A uniform override value. Packed into the declared component count: extra components are
/// dropped, missing ones stay zero.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl UniformValue {
    #[inline]
    pub fn components(&self) -> &[f32] {
        match self {
            UniformValue::Float(v) => std::slice::from_ref(v),
            UniformValue::Vec2(v) => v,
            UniformValue::Vec3(v) => v,
            UniformValue::Vec4(v) => v,
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        UniformValue::Vec4(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformOverride {
    pub name: String,
    pub value: UniformValue,
}

/// One full-screen program invocation in the post chain.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassStage {
    /// Name the program was registered under.
    pub shader: String,
    /// Offscreen slot bound to each channel, in channel order.
    pub inputs: Vec<usize>,
    pub output: Target,
    pub uniform_overrides: Vec<UniformOverride>,
    /// Clears the output before drawing when set.
    pub clear_color: Option<ColorRgba>,
}

impl RenderPassStage {
    pub fn new(shader: impl Into<String>, output: Target) -> Self {
        Self {
            shader: shader.into(),
            inputs: Vec::new(),
            output,
            uniform_overrides: Vec::new(),
            clear_color: None,
        }
    }

    pub fn input(mut self, slot: OffscreenSlot) -> Self {
        self.inputs.push(slot.index());
        self
    }

    pub fn uniform(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.uniform_overrides.push(UniformOverride { name: name.into(), value: value.into() });
        self
    }

    pub fn clear(mut self, color: ColorRgba) -> Self {
        self.clear_color = Some(color);
        self
    }
}

/// Post chain used when the caller configures nothing: present `Primary` unchanged.
pub fn default_passes() -> Vec<RenderPassStage> {
    vec![
        RenderPassStage::new(crate::shader::library::COPY, Target::Surface)
            .input(OffscreenSlot::Primary),
    ]
}
