//! Thin shader IR: an ordered operation list plus a packed uniform table.
//!
//! Expressions are opaque text in a small backend-agnostic dialect (arithmetic, `.rgba`
//! swizzles, `texture(channel, uv)`). Nothing is type-checked here; the code generator only
//! rewrites text, and malformed programs surface as backend compile errors.

/// Number of offscreen inputs a full-screen program may sample.
pub const MAX_CHANNELS: usize = 8;

/// Built-in uniform: output target size in pixels (`vec2`, offset 0).
pub const UNIFORM_RESOLUTION: &str = "resolution";

/// Built-in uniform: seconds since the renderer started (`float`, offset 2).
pub const UNIFORM_TIME: &str = "time";

/// Value types understood by every backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderType {
    Float,
    Vec2,
    Vec3,
    Vec4,
}

impl ShaderType {
    /// Number of `f32` components; also the packed-offset stride.
    #[inline]
    pub const fn components(self) -> usize {
        match self {
            ShaderType::Float => 1,
            ShaderType::Vec2 => 2,
            ShaderType::Vec3 => 3,
            ShaderType::Vec4 => 4,
        }
    }

    /// GLSL spelling (shared by GLSL ES 1.00 and 3.00).
    #[inline]
    pub const fn glsl_name(self) -> &'static str {
        match self {
            ShaderType::Float => "float",
            ShaderType::Vec2 => "vec2",
            ShaderType::Vec3 => "vec3",
            ShaderType::Vec4 => "vec4",
        }
    }

    #[inline]
    pub const fn wgsl_name(self) -> &'static str {
        match self {
            ShaderType::Float => "f32",
            ShaderType::Vec2 => "vec2<f32>",
            ShaderType::Vec3 => "vec3<f32>",
            ShaderType::Vec4 => "vec4<f32>",
        }
    }
}

/// Assignment flavour for [`ShaderOp::Assign`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    #[inline]
    pub const fn symbol(self) -> &'static str {
        match self {
            AssignOp::Set => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
        }
    }
}

/// One IR operation.
///
/// `If`/`ElseIf`/`Else`/`EndIf` must nest as balanced blocks. This is a caller contract:
/// the generator emits whatever sequence it is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderOp {
    Declare { name: String, ty: ShaderType },
    Assign { op: AssignOp, target: String, expr: String },
    If(String),
    ElseIf(String),
    Else,
    EndIf,
}

/// A uniform slot in the packed, linear uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDesc {
    pub name: String,
    pub ty: ShaderType,
    /// Offset in `f32` components from the start of the block.
    pub offset: usize,
}

/// Append-only builder for a full-screen fragment program.
///
/// Every builder starts with the two built-in uniforms (`resolution` at 0, `time` at 2).
/// Once registered with a renderer a builder is treated as a read-only blueprint; the same
/// builder can be compiled for any number of backends.
///
/// ```ignore
/// let fx = ShaderBuilder::new()
///     .uniform("strength", ShaderType::Float)
///     .declare("uv", ShaderType::Vec2)
///     .set("uv", "fragCoord / uniforms.resolution")
///     .set("fragColor", "texture(0, uv) * uniforms.strength");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBuilder {
    ops: Vec<ShaderOp>,
    uniforms: Vec<UniformDesc>,
    next_offset: usize,
}

impl Default for ShaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderBuilder {
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            uniforms: Vec::new(),
            next_offset: 0,
        }
        .uniform(UNIFORM_RESOLUTION, ShaderType::Vec2)
        .uniform(UNIFORM_TIME, ShaderType::Float)
    }

    pub fn declare(mut self, name: impl Into<String>, ty: ShaderType) -> Self {
        self.ops.push(ShaderOp::Declare { name: name.into(), ty });
        self
    }

    pub fn set(self, target: impl Into<String>, expr: impl Into<String>) -> Self {
        self.assign(AssignOp::Set, target, expr)
    }

    pub fn add(self, target: impl Into<String>, expr: impl Into<String>) -> Self {
        self.assign(AssignOp::Add, target, expr)
    }

    pub fn sub(self, target: impl Into<String>, expr: impl Into<String>) -> Self {
        self.assign(AssignOp::Sub, target, expr)
    }

    pub fn mul(self, target: impl Into<String>, expr: impl Into<String>) -> Self {
        self.assign(AssignOp::Mul, target, expr)
    }

    pub fn div(self, target: impl Into<String>, expr: impl Into<String>) -> Self {
        self.assign(AssignOp::Div, target, expr)
    }

    pub fn assign(
        mut self,
        op: AssignOp,
        target: impl Into<String>,
        expr: impl Into<String>,
    ) -> Self {
        self.ops.push(ShaderOp::Assign {
            op,
            target: target.into(),
            expr: expr.into(),
        });
        self
    }

    pub fn if_(mut self, condition: impl Into<String>) -> Self {
        self.ops.push(ShaderOp::If(condition.into()));
        self
    }

    pub fn else_if(mut self, condition: impl Into<String>) -> Self {
        self.ops.push(ShaderOp::ElseIf(condition.into()));
        self
    }

    pub fn else_(mut self) -> Self {
        self.ops.push(ShaderOp::Else);
        self
    }

    pub fn end_if(mut self) -> Self {
        self.ops.push(ShaderOp::EndIf);
        self
    }

    /// Declares a uniform at the next packed offset.
    ///
    /// Names are not deduplicated; a repeated name gets a second slot and overrides only ever
    /// reach the first.
    pub fn uniform(mut self, name: impl Into<String>, ty: ShaderType) -> Self {
        self.uniforms.push(UniformDesc {
            name: name.into(),
            ty,
            offset: self.next_offset,
        });
        self.next_offset += ty.components();
        self
    }

    #[inline]
    pub fn ops(&self) -> &[ShaderOp] {
        &self.ops
    }

    /// Uniform table in declaration (and therefore offset) order.
    #[inline]
    pub fn uniforms(&self) -> &[UniformDesc] {
        &self.uniforms
    }

    /// Total packed size of the uniform block in `f32` components.
    #[inline]
    pub fn uniform_len(&self) -> usize {
        self.next_offset
    }

    pub fn find_uniform(&self, name: &str) -> Option<&UniformDesc> {
        self.uniforms.iter().find(|u| u.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── built-ins ─────────────────────────────────────────────────────────

    #[test]
    fn builtins_occupy_offsets_zero_and_two() {
        let b = ShaderBuilder::new();
        let res = b.find_uniform(UNIFORM_RESOLUTION).unwrap();
        let time = b.find_uniform(UNIFORM_TIME).unwrap();
        assert_eq!((res.offset, res.ty), (0, ShaderType::Vec2));
        assert_eq!((time.offset, time.ty), (2, ShaderType::Float));
        assert_eq!(b.uniform_len(), 3);
    }

    // ── packing ───────────────────────────────────────────────────────────

    #[test]
    fn uniforms_pack_tightly_in_declaration_order() {
        let b = ShaderBuilder::new()
            .uniform("tint", ShaderType::Vec3)
            .uniform("strength", ShaderType::Float)
            .uniform("rect", ShaderType::Vec4);
        let offsets: Vec<_> = b.uniforms().iter().map(|u| (u.name.as_str(), u.offset)).collect();
        assert_eq!(
            offsets,
            vec![("resolution", 0), ("time", 2), ("tint", 3), ("strength", 6), ("rect", 7)]
        );
        assert_eq!(b.uniform_len(), 11);
    }

    #[test]
    fn uniform_does_not_append_an_operation() {
        let b = ShaderBuilder::new().uniform("k", ShaderType::Float);
        assert!(b.ops().is_empty());
    }

    // ── operations ────────────────────────────────────────────────────────

    #[test]
    fn each_call_appends_exactly_one_op_in_order() {
        let b = ShaderBuilder::new()
            .declare("uv", ShaderType::Vec2)
            .set("uv", "fragCoord / uniforms.resolution")
            .if_("uv.x > 0.5")
            .mul("fragColor", "0.5")
            .else_if("uv.y > 0.5")
            .div("fragColor", "2.0")
            .else_()
            .sub("fragColor", "vec4(0.1)")
            .end_if()
            .add("fragColor", "texture(0, uv)");

        assert_eq!(b.ops().len(), 10);
        assert_eq!(
            b.ops()[0],
            ShaderOp::Declare { name: "uv".into(), ty: ShaderType::Vec2 }
        );
        assert_eq!(b.ops()[2], ShaderOp::If("uv.x > 0.5".into()));
        assert_eq!(b.ops()[6], ShaderOp::Else);
        assert_eq!(b.ops()[8], ShaderOp::EndIf);
        assert!(matches!(
            &b.ops()[9],
            ShaderOp::Assign { op: AssignOp::Add, target, .. } if target == "fragColor"
        ));
    }

    #[test]
    fn unbalanced_blocks_are_accepted() {
        // Balance is the caller's responsibility; the builder records what it is told.
        let b = ShaderBuilder::new().end_if().end_if();
        assert_eq!(b.ops(), &[ShaderOp::EndIf, ShaderOp::EndIf]);
    }

    #[test]
    fn assign_symbols() {
        let syms: Vec<_> = [AssignOp::Set, AssignOp::Add, AssignOp::Sub, AssignOp::Mul, AssignOp::Div]
            .iter()
            .map(|op| op.symbol())
            .collect();
        assert_eq!(syms, vec!["=", "+=", "-=", "*=", "/="]);
    }

    // ── properties ────────────────────────────────────────────────────────

    mod props {
        use super::super::*;
        use proptest::prelude::*;

        fn any_type() -> impl Strategy<Value = ShaderType> {
            prop_oneof![
                Just(ShaderType::Float),
                Just(ShaderType::Vec2),
                Just(ShaderType::Vec3),
                Just(ShaderType::Vec4),
            ]
        }

        proptest! {
            #[test]
            fn offsets_advance_by_component_count(types in prop::collection::vec(any_type(), 0..24)) {
                let mut b = ShaderBuilder::new();
                for (i, ty) in types.iter().enumerate() {
                    b = b.uniform(format!("u{i}"), *ty);
                }

                let table = b.uniforms();
                prop_assert_eq!(table[0].offset, 0);
                prop_assert_eq!(table[1].offset, 2);
                for pair in table.windows(2) {
                    prop_assert_eq!(pair[1].offset, pair[0].offset + pair[0].ty.components());
                }
                let last = table.last().unwrap();
                prop_assert_eq!(b.uniform_len(), last.offset + last.ty.components());
            }
        }
    }
}
