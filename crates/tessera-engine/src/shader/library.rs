//! Built-in full-screen effects.
//!
//! The lighting chain registers `copy`, `light`, `light_accumulate`, `blur_h` and `blur_v`
//! under these names at init; `vignette` and `grayscale` are registered too so user pass
//! stages can reference them without building their own IR.

use super::ir::{ShaderBuilder, ShaderType};

pub const COPY: &str = "copy";
pub const LIGHT: &str = "light";
pub const LIGHT_ACCUMULATE: &str = "light_accumulate";
pub const BLUR_H: &str = "blur_h";
pub const BLUR_V: &str = "blur_v";
pub const VIGNETTE: &str = "vignette";
pub const GRAYSCALE: &str = "grayscale";

// 9-tap gaussian folded into 5 bilinear fetches.
const BLUR_WEIGHTS: [f32; 3] = [0.227_027, 0.316_216_2, 0.070_270_27];
const BLUR_OFFSETS: [f32; 2] = [1.384_615_4, 3.230_769_2];

fn uv() -> ShaderBuilder {
    ShaderBuilder::new()
        .declare("uv", ShaderType::Vec2)
        .set("uv", "fragCoord / uniforms.resolution")
}

/// Samples channel 0 unchanged.
pub fn copy() -> ShaderBuilder {
    uv().set("fragColor", "texture(0, uv)")
}

/// Modulates the scene (channel 0) by the lightmap (channel 1).
pub fn light() -> ShaderBuilder {
    uv().set("fragColor", "texture(0, uv) * vec4(texture(1, uv).rgb, 1.0)")
}

/// Separable blur along x; `uniforms.radius` scales the tap spacing in pixels.
pub fn blur_h() -> ShaderBuilder {
    blur("vec2(1.0, 0.0)")
}

/// Separable blur along y.
pub fn blur_v() -> ShaderBuilder {
    blur("vec2(0.0, 1.0)")
}

fn blur(axis: &str) -> ShaderBuilder {
    let [w0, w1, w2] = BLUR_WEIGHTS;
    let [o1, o2] = BLUR_OFFSETS;
    uv().uniform("radius", ShaderType::Float)
        .declare("texel", ShaderType::Vec2)
        .set("texel", format!("{axis} * uniforms.radius / uniforms.resolution"))
        .set("fragColor", format!("texture(0, uv) * {w0:?}"))
        .add("fragColor", format!("texture(0, uv + texel * {o1:?}) * {w1:?}"))
        .add("fragColor", format!("texture(0, uv - texel * {o1:?}) * {w1:?}"))
        .add("fragColor", format!("texture(0, uv + texel * {o2:?}) * {w2:?}"))
        .add("fragColor", format!("texture(0, uv - texel * {o2:?}) * {w2:?}"))
}

/// Darkens toward the corners; `radius` and `softness` are in uv units.
pub fn vignette() -> ShaderBuilder {
    uv().uniform("strength", ShaderType::Float)
        .uniform("radius", ShaderType::Float)
        .uniform("softness", ShaderType::Float)
        .declare("d", ShaderType::Float)
        .declare("shade", ShaderType::Float)
        .set("d", "length(uv - vec2(0.5, 0.5))")
        .set(
            "shade",
            "1.0 - smoothstep(uniforms.radius - uniforms.softness, uniforms.radius, d)",
        )
        .set("fragColor", "texture(0, uv)")
        .mul(
            "fragColor",
            "vec4(vec3(mix(1.0, shade, uniforms.strength)), 1.0)",
        )
}

/// Blends toward luminance by `amount`; skips the conversion when `amount` is zero.
pub fn grayscale() -> ShaderBuilder {
    uv().uniform("amount", ShaderType::Float)
        .declare("luma", ShaderType::Float)
        .set("fragColor", "texture(0, uv)")
        .if_("uniforms.amount > 0.0")
        .set("luma", "dot(fragColor.rgb, vec3(0.299, 0.587, 0.114))")
        .set(
            "fragColor",
            "vec4(mix(fragColor.rgb, vec3(luma), uniforms.amount), fragColor.a)",
        )
        .end_if()
}
