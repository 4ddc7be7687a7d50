//! The three target shading languages.
//!
//! A [`ShaderDialect`] supplies the [`BackendOptions`] the generator consumes and wraps
//! generated lines into complete programs. The sprite, light and shadow programs are fixed
//! per dialect; only full-screen effects go through the IR.

use super::codegen::{remap_components, BackendOptions, ComponentMap, GeneratedShader, SamplerBinding};
use super::ir::{ShaderType, MAX_CHANNELS};
use crate::backend::SpriteMode;

/// Program text handed to a backend for native compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramSource {
    /// Separate GLSL vertex and fragment stages.
    Glsl { vertex: String, fragment: String },
    /// One WGSL module exporting `vs_main` and `fs_main`.
    Wgsl(String),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderDialect {
    /// GLSL ES 1.00: `attribute`/`varying`, `texture2D`, `gl_FragColor`.
    GlslEs100,
    /// GLSL ES 3.00: `in`/`out`, `texture`, explicit attribute locations.
    GlslEs300,
    /// WGSL with `x,y,z,w` swizzles and an explicit shared sampler.
    Wgsl,
}

/// GL attribute name for each fixed vertex location.
///
/// GL backends bind these before linking so every dialect agrees on locations.
pub const SPRITE_ATTRIBUTES: [&str; 7] =
    ["aCorner", "aPosition", "aSize", "aUvMin", "aUvMax", "aTint", "aMask"];
pub const LIGHT_ATTRIBUTES: [&str; 5] =
    ["aCorner", "aCenter", "aRadiusCutoff", "aDirection", "aColor"];
pub const SHADOW_ATTRIBUTES: [&str; 1] = ["aPosition"];
pub const FULLSCREEN_ATTRIBUTES: [&str; 1] = ["aCorner"];

/// GL sampler uniform for offscreen input `channel`.
pub fn channel_sampler_name(channel: usize) -> String {
    format!("uChannel{channel}")
}

/// GL uniform name for a member of the generated `uniforms` struct.
pub fn uniform_member_name(name: &str) -> String {
    format!("uniforms.{name}")
}

fn glsl_declare(name: &str, ty: ShaderType, _is_uniform: bool) -> String {
    format!("{} {name};", ty.glsl_name())
}

fn wgsl_declare(name: &str, ty: ShaderType, is_uniform: bool) -> String {
    if is_uniform {
        format!("{name}: {},", ty.wgsl_name())
    } else {
        format!("var {name}: {};", ty.wgsl_name())
    }
}

fn es100_sample(channel: usize, args: &str) -> String {
    format!("texture2D(uChannel{channel}, {args})")
}

fn es300_sample(channel: usize, args: &str) -> String {
    format!("texture(uChannel{channel}, {args})")
}

fn wgsl_sample(channel: usize, args: &str) -> String {
    // Explicit LOD keeps sampling legal inside non-uniform branches.
    format!("textureSampleLevel(channel{channel}, channelSampler, {args}, 0.0)")
}

impl ShaderDialect {
    pub fn options(self) -> BackendOptions {
        match self {
            ShaderDialect::GlslEs100 => BackendOptions {
                component_map: ComponentMap::identity(),
                declare_var: glsl_declare,
                sampler: SamplerBinding::Numbered(es100_sample),
            },
            ShaderDialect::GlslEs300 => BackendOptions {
                component_map: ComponentMap::identity(),
                declare_var: glsl_declare,
                sampler: SamplerBinding::Numbered(es300_sample),
            },
            ShaderDialect::Wgsl => BackendOptions {
                component_map: ComponentMap::xyzw(),
                declare_var: wgsl_declare,
                sampler: SamplerBinding::Numbered(wgsl_sample),
            },
        }
    }

    /// Wraps generated lines into a full-screen program.
    ///
    /// The body sees `fragCoord` (pixel position), a zero-initialised `fragColor`, the
    /// `uniforms` block and `MAX_CHANNELS` input samplers.
    pub fn fullscreen_program(self, generated: &GeneratedShader) -> ProgramSource {
        let uniforms = join_indented(&generated.uniform_lines);
        let body = join_indented(&generated.body_lines);

        match self {
            ShaderDialect::GlslEs100 => ProgramSource::Glsl {
                vertex: FULLSCREEN_VS_ES100.to_string(),
                fragment: format!(
                    "#version 100\n\
                     precision mediump float;\n\
                     struct Uniforms {{\n{uniforms}}};\n\
                     uniform Uniforms uniforms;\n\
                     {samplers}\
                     void main() {{\n    \
                     vec2 fragCoord = gl_FragCoord.xy;\n    \
                     vec4 fragColor = vec4(0.0);\n\
                     {body}    \
                     gl_FragColor = fragColor;\n\
                     }}\n",
                    samplers = glsl_samplers(),
                ),
            },
            ShaderDialect::GlslEs300 => ProgramSource::Glsl {
                vertex: FULLSCREEN_VS_ES300.to_string(),
                fragment: format!(
                    "#version 300 es\n\
                     precision highp float;\n\
                     struct Uniforms {{\n{uniforms}}};\n\
                     uniform Uniforms uniforms;\n\
                     {samplers}\
                     out vec4 outColor;\n\
                     void main() {{\n    \
                     vec2 fragCoord = gl_FragCoord.xy;\n    \
                     vec4 fragColor = vec4(0.0);\n\
                     {body}    \
                     outColor = fragColor;\n\
                     }}\n",
                    samplers = glsl_samplers(),
                ),
            },
            ShaderDialect::Wgsl => ProgramSource::Wgsl(format!(
                "struct Uniforms {{\n{uniforms}}};\n\
                 @group(0) @binding(0) var<uniform> uniforms: Uniforms;\n\
                 {textures}\
                 @group(1) @binding({MAX_CHANNELS}) var channelSampler: sampler;\n\
                 \n\
                 @vertex\n\
                 fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {{\n    \
                 let x = f32((index << 1u) & 2u);\n    \
                 let y = f32(index & 2u);\n    \
                 return vec4<f32>(x * 2.0 - 1.0, 1.0 - y * 2.0, 0.0, 1.0);\n\
                 }}\n\
                 \n\
                 @fragment\n\
                 fn fs_main(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {{\n    \
                 let fragCoord = position.xy;\n    \
                 var fragColor = vec4<f32>(0.0, 0.0, 0.0, 0.0);\n\
                 {body}    \
                 return fragColor;\n\
                 }}\n",
                textures = wgsl_channel_textures(),
            )),
        }
    }

    /// Instanced sprite program; `mode` selects tinted color or flat mask output.
    pub fn sprite_program(self, mode: SpriteMode) -> ProgramSource {
        match self {
            ShaderDialect::GlslEs100 => ProgramSource::Glsl {
                vertex: SPRITE_VS_ES100.to_string(),
                fragment: format!(
                    "#version 100\n\
                     precision mediump float;\n\
                     uniform sampler2D uAtlas;\n\
                     varying vec2 vUv;\n\
                     varying vec4 vTint;\n\
                     varying vec4 vMask;\n\
                     void main() {{\n    \
                     vec4 texel = texture2D(uAtlas, vUv);\n    \
                     gl_FragColor = {};\n\
                     }}\n",
                    sprite_output(mode, "vTint", "vMask"),
                ),
            },
            ShaderDialect::GlslEs300 => ProgramSource::Glsl {
                vertex: SPRITE_VS_ES300.to_string(),
                fragment: format!(
                    "#version 300 es\n\
                     precision highp float;\n\
                     uniform sampler2D uAtlas;\n\
                     in vec2 vUv;\n\
                     in vec4 vTint;\n\
                     in vec4 vMask;\n\
                     out vec4 outColor;\n\
                     void main() {{\n    \
                     vec4 texel = texture(uAtlas, vUv);\n    \
                     outColor = {};\n\
                     }}\n",
                    sprite_output(mode, "vTint", "vMask"),
                ),
            },
            ShaderDialect::Wgsl => ProgramSource::Wgsl(format!(
                "{SPRITE_WGSL}\n\
                 @fragment\n\
                 fn fs_main(frag: SpriteOut) -> @location(0) vec4<f32> {{\n    \
                 let texel = textureSample(atlas, atlasSampler, frag.uv);\n    \
                 return {};\n\
                 }}\n",
                remap_components(&sprite_output(mode, "frag.tint", "frag.mask"), &ComponentMap::xyzw()),
            )),
        }
    }

    /// Radial falloff with optional spot cone, drawn as one instanced quad per light.
    pub fn light_program(self) -> ProgramSource {
        match self {
            ShaderDialect::GlslEs100 => ProgramSource::Glsl {
                vertex: LIGHT_VS_ES100.to_string(),
                fragment: format!(
                    "#version 100\n\
                     precision mediump float;\n\
                     varying vec2 vLocal;\n\
                     varying vec2 vRadiusCutoff;\n\
                     varying vec2 vDirection;\n\
                     varying vec4 vColor;\n\
                     void main() {{\n\
                     {LIGHT_FS_GLSL_BODY}    \
                     gl_FragColor = light;\n\
                     }}\n"
                ),
            },
            ShaderDialect::GlslEs300 => ProgramSource::Glsl {
                vertex: LIGHT_VS_ES300.to_string(),
                fragment: format!(
                    "#version 300 es\n\
                     precision highp float;\n\
                     in vec2 vLocal;\n\
                     in vec2 vRadiusCutoff;\n\
                     in vec2 vDirection;\n\
                     in vec4 vColor;\n\
                     out vec4 outColor;\n\
                     void main() {{\n\
                     {LIGHT_FS_GLSL_BODY}    \
                     outColor = light;\n\
                     }}\n"
                ),
            },
            ShaderDialect::Wgsl => ProgramSource::Wgsl(LIGHT_WGSL.to_string()),
        }
    }

    /// Flat shadow-caster geometry; writes transparent black over the light buffer.
    pub fn shadow_program(self) -> ProgramSource {
        match self {
            ShaderDialect::GlslEs100 => ProgramSource::Glsl {
                vertex: SHADOW_VS_ES100.to_string(),
                fragment: "#version 100\n\
                           precision mediump float;\n\
                           void main() {\n    \
                           gl_FragColor = vec4(0.0);\n\
                           }\n"
                    .to_string(),
            },
            ShaderDialect::GlslEs300 => ProgramSource::Glsl {
                vertex: SHADOW_VS_ES300.to_string(),
                fragment: "#version 300 es\n\
                           precision highp float;\n\
                           out vec4 outColor;\n\
                           void main() {\n    \
                           outColor = vec4(0.0);\n\
                           }\n"
                    .to_string(),
            },
            ShaderDialect::Wgsl => ProgramSource::Wgsl(SHADOW_WGSL.to_string()),
        }
    }
}

fn join_indented(lines: &[String]) -> String {
    lines.iter().map(|l| format!("    {l}\n")).collect()
}

fn glsl_samplers() -> String {
    (0..MAX_CHANNELS)
        .map(|i| format!("uniform sampler2D {};\n", channel_sampler_name(i)))
        .collect()
}

fn wgsl_channel_textures() -> String {
    (0..MAX_CHANNELS)
        .map(|i| format!("@group(1) @binding({i}) var channel{i}: texture_2d<f32>;\n"))
        .collect()
}

fn sprite_output(mode: SpriteMode, tint: &str, mask: &str) -> String {
    match mode {
        SpriteMode::Color => format!("texel * {tint}"),
        SpriteMode::Mask => format!("{mask} * texel.a"),
    }
}

// ── fixed GLSL sources ────────────────────────────────────────────────────

const FULLSCREEN_VS_ES100: &str = "#version 100
attribute vec2 aCorner;
void main() {
    gl_Position = vec4(aCorner * 2.0 - 1.0, 0.0, 1.0);
}
";

const FULLSCREEN_VS_ES300: &str = "#version 300 es
layout(location = 0) in vec2 aCorner;
void main() {
    gl_Position = vec4(aCorner * 2.0 - 1.0, 0.0, 1.0);
}
";

const SPRITE_VS_ES100: &str = "#version 100
attribute vec2 aCorner;
attribute vec2 aPosition;
attribute vec2 aSize;
attribute vec2 aUvMin;
attribute vec2 aUvMax;
attribute vec4 aTint;
attribute vec4 aMask;
uniform vec4 uView;
varying vec2 vUv;
varying vec4 vTint;
varying vec4 vMask;
void main() {
    vec2 world = aPosition + aCorner * aSize;
    vec2 rel = (world - uView.xy) / uView.zw;
    gl_Position = vec4(rel.x * 2.0 - 1.0, 1.0 - rel.y * 2.0, 0.0, 1.0);
    vUv = mix(aUvMin, aUvMax, aCorner);
    vTint = aTint;
    vMask = aMask;
}
";

const SPRITE_VS_ES300: &str = "#version 300 es
layout(location = 0) in vec2 aCorner;
layout(location = 1) in vec2 aPosition;
layout(location = 2) in vec2 aSize;
layout(location = 3) in vec2 aUvMin;
layout(location = 4) in vec2 aUvMax;
layout(location = 5) in vec4 aTint;
layout(location = 6) in vec4 aMask;
uniform vec4 uView;
out vec2 vUv;
out vec4 vTint;
out vec4 vMask;
void main() {
    vec2 world = aPosition + aCorner * aSize;
    vec2 rel = (world - uView.xy) / uView.zw;
    gl_Position = vec4(rel.x * 2.0 - 1.0, 1.0 - rel.y * 2.0, 0.0, 1.0);
    vUv = mix(aUvMin, aUvMax, aCorner);
    vTint = aTint;
    vMask = aMask;
}
";

const LIGHT_VS_ES100: &str = "#version 100
attribute vec2 aCorner;
attribute vec2 aCenter;
attribute vec2 aRadiusCutoff;
attribute vec2 aDirection;
attribute vec4 aColor;
uniform vec4 uView;
varying vec2 vLocal;
varying vec2 vRadiusCutoff;
varying vec2 vDirection;
varying vec4 vColor;
void main() {
    vLocal = aCorner * 2.0 - 1.0;
    vec2 world = aCenter + vLocal * aRadiusCutoff.x;
    vec2 rel = (world - uView.xy) / uView.zw;
    gl_Position = vec4(rel.x * 2.0 - 1.0, 1.0 - rel.y * 2.0, 0.0, 1.0);
    vRadiusCutoff = aRadiusCutoff;
    vDirection = aDirection;
    vColor = aColor;
}
";

const LIGHT_VS_ES300: &str = "#version 300 es
layout(location = 0) in vec2 aCorner;
layout(location = 1) in vec2 aCenter;
layout(location = 2) in vec2 aRadiusCutoff;
layout(location = 3) in vec2 aDirection;
layout(location = 4) in vec4 aColor;
uniform vec4 uView;
out vec2 vLocal;
out vec2 vRadiusCutoff;
out vec2 vDirection;
out vec4 vColor;
void main() {
    vLocal = aCorner * 2.0 - 1.0;
    vec2 world = aCenter + vLocal * aRadiusCutoff.x;
    vec2 rel = (world - uView.xy) / uView.zw;
    gl_Position = vec4(rel.x * 2.0 - 1.0, 1.0 - rel.y * 2.0, 0.0, 1.0);
    vRadiusCutoff = aRadiusCutoff;
    vDirection = aDirection;
    vColor = aColor;
}
";

// Shared between both GLSL versions; `vRadiusCutoff.y` is the cosine of the spot half-angle,
// or -1 for an omni light.
const LIGHT_FS_GLSL_BODY: &str = "    float d = length(vLocal);
    float falloff = clamp(1.0 - d, 0.0, 1.0);
    falloff *= falloff;
    float spot = 1.0;
    if (vRadiusCutoff.y > -1.0 && d > 0.0) {
        float c = dot(vLocal / d, vDirection);
        spot = smoothstep(vRadiusCutoff.y, min(vRadiusCutoff.y + 0.05, 1.0), c);
    }
    float k = falloff * spot;
    vec4 light = vec4(vColor.rgb * k, k);
";

const SHADOW_VS_ES100: &str = "#version 100
attribute vec2 aPosition;
uniform vec4 uView;
void main() {
    vec2 rel = (aPosition - uView.xy) / uView.zw;
    gl_Position = vec4(rel.x * 2.0 - 1.0, 1.0 - rel.y * 2.0, 0.0, 1.0);
}
";

const SHADOW_VS_ES300: &str = "#version 300 es
layout(location = 0) in vec2 aPosition;
uniform vec4 uView;
void main() {
    vec2 rel = (aPosition - uView.xy) / uView.zw;
    gl_Position = vec4(rel.x * 2.0 - 1.0, 1.0 - rel.y * 2.0, 0.0, 1.0);
}
";

// ── fixed WGSL sources ────────────────────────────────────────────────────

const SPRITE_WGSL: &str = "struct Camera {
    rect: vec4<f32>,
};
@group(0) @binding(0) var<uniform> camera: Camera;
@group(1) @binding(0) var atlas: texture_2d<f32>;
@group(1) @binding(1) var atlasSampler: sampler;

struct SpriteIn {
    @location(0) corner: vec2<f32>,
    @location(1) position: vec2<f32>,
    @location(2) size: vec2<f32>,
    @location(3) uv_min: vec2<f32>,
    @location(4) uv_max: vec2<f32>,
    @location(5) tint: vec4<f32>,
    @location(6) mask: vec4<f32>,
};

struct SpriteOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) tint: vec4<f32>,
    @location(2) mask: vec4<f32>,
};

@vertex
fn vs_main(v: SpriteIn) -> SpriteOut {
    let world = v.position + v.corner * v.size;
    let rel = (world - camera.rect.xy) / camera.rect.zw;
    var o: SpriteOut;
    o.clip = vec4<f32>(rel.x * 2.0 - 1.0, 1.0 - rel.y * 2.0, 0.0, 1.0);
    o.uv = mix(v.uv_min, v.uv_max, v.corner);
    o.tint = v.tint;
    o.mask = v.mask;
    return o;
}
";

const LIGHT_WGSL: &str = "struct Camera {
    rect: vec4<f32>,
};
@group(0) @binding(0) var<uniform> camera: Camera;

struct LightIn {
    @location(0) corner: vec2<f32>,
    @location(1) center: vec2<f32>,
    @location(2) radius_cutoff: vec2<f32>,
    @location(3) direction: vec2<f32>,
    @location(4) color: vec4<f32>,
};

struct LightOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) local: vec2<f32>,
    @location(1) radius_cutoff: vec2<f32>,
    @location(2) direction: vec2<f32>,
    @location(3) color: vec4<f32>,
};

@vertex
fn vs_main(v: LightIn) -> LightOut {
    let local = v.corner * 2.0 - 1.0;
    let world = v.center + local * v.radius_cutoff.x;
    let rel = (world - camera.rect.xy) / camera.rect.zw;
    var o: LightOut;
    o.clip = vec4<f32>(rel.x * 2.0 - 1.0, 1.0 - rel.y * 2.0, 0.0, 1.0);
    o.local = local;
    o.radius_cutoff = v.radius_cutoff;
    o.direction = v.direction;
    o.color = v.color;
    return o;
}

@fragment
fn fs_main(frag: LightOut) -> @location(0) vec4<f32> {
    let d = length(frag.local);
    var falloff = clamp(1.0 - d, 0.0, 1.0);
    falloff = falloff * falloff;
    var spot = 1.0;
    if (frag.radius_cutoff.y > -1.0 && d > 0.0) {
        let c = dot(frag.local / d, frag.direction);
        spot = smoothstep(frag.radius_cutoff.y, min(frag.radius_cutoff.y + 0.05, 1.0), c);
    }
    let k = falloff * spot;
    return vec4<f32>(frag.color.xyz * k, k);
}
";

const SHADOW_WGSL: &str = "struct Camera {
    rect: vec4<f32>,
};
@group(0) @binding(0) var<uniform> camera: Camera;

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    let rel = (position - camera.rect.xy) / camera.rect.zw;
    return vec4<f32>(rel.x * 2.0 - 1.0, 1.0 - rel.y * 2.0, 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(0.0, 0.0, 0.0, 0.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::codegen::generate;
    use crate::shader::ir::ShaderBuilder;

    fn sample_builder() -> ShaderBuilder {
        ShaderBuilder::new()
            .uniform("strength", ShaderType::Float)
            .declare("uv", ShaderType::Vec2)
            .set("uv", "fragCoord / uniforms.resolution")
            .set("fragColor", "texture(0, uv)")
            .mul("fragColor", "vec4(texture(1, uv).rgb * uniforms.strength, 1.0)")
    }

    fn validate_wgsl(src: &str) {
        let module = naga::front::wgsl::parse_str(src)
            .unwrap_or_else(|e| panic!("parse failed:\n{}\n{src}", e.emit_to_string(src)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap_or_else(|e| panic!("validation failed:\n{}\n{src}", e.emit_to_string(src)));
    }

    // ── options ───────────────────────────────────────────────────────────

    #[test]
    fn gles300_matches_numbered_sampler_convention() {
        let out = generate(&sample_builder(), &ShaderDialect::GlslEs300.options());
        assert_eq!(out.body_lines[2], "fragColor = texture(uChannel0, uv);");
    }

    #[test]
    fn gles100_uses_texture2d() {
        let out = generate(&sample_builder(), &ShaderDialect::GlslEs100.options());
        assert_eq!(out.body_lines[2], "fragColor = texture2D(uChannel0, uv);");
    }

    #[test]
    fn wgsl_remaps_swizzles_and_declares_with_var() {
        let out = generate(&sample_builder(), &ShaderDialect::Wgsl.options());
        assert_eq!(out.body_lines[0], "var uv: vec2<f32>;");
        assert_eq!(
            out.body_lines[3],
            "fragColor *= vec4(textureSampleLevel(channel1, channelSampler, uv, 0.0).xyz \
             * uniforms.strength, 1.0);"
        );
        assert_eq!(
            out.uniform_lines,
            vec!["resolution: vec2<f32>,", "time: f32,", "strength: f32,"]
        );
    }

    // ── assembly ──────────────────────────────────────────────────────────

    #[test]
    fn glsl_fullscreen_program_declares_struct_and_samplers() {
        let generated = generate(&sample_builder(), &ShaderDialect::GlslEs300.options());
        let ProgramSource::Glsl { fragment, .. } =
            ShaderDialect::GlslEs300.fullscreen_program(&generated)
        else {
            panic!("expected GLSL source");
        };
        assert!(fragment.starts_with("#version 300 es\n"));
        assert!(fragment.contains("struct Uniforms {\n    vec2 resolution;\n    float time;\n"));
        assert!(fragment.contains("uniform sampler2D uChannel7;\n"));
        assert!(fragment.contains("    fragColor = texture(uChannel0, uv);\n"));
        assert!(fragment.ends_with("    outColor = fragColor;\n}\n"));
    }

    #[test]
    fn wgsl_fullscreen_program_validates() {
        let generated = generate(&sample_builder(), &ShaderDialect::Wgsl.options());
        let ProgramSource::Wgsl(src) = ShaderDialect::Wgsl.fullscreen_program(&generated) else {
            panic!("expected WGSL source");
        };
        validate_wgsl(&src);
    }

    #[test]
    fn wgsl_fixed_programs_validate() {
        for source in [
            ShaderDialect::Wgsl.sprite_program(SpriteMode::Color),
            ShaderDialect::Wgsl.sprite_program(SpriteMode::Mask),
            ShaderDialect::Wgsl.light_program(),
            ShaderDialect::Wgsl.shadow_program(),
        ] {
            let ProgramSource::Wgsl(src) = source else { panic!("expected WGSL source") };
            validate_wgsl(&src);
        }
    }

    #[test]
    fn glsl_sprite_modes_differ_only_in_output() {
        let ProgramSource::Glsl { fragment: color, .. } =
            ShaderDialect::GlslEs100.sprite_program(SpriteMode::Color)
        else {
            panic!("expected GLSL source");
        };
        let ProgramSource::Glsl { fragment: mask, .. } =
            ShaderDialect::GlslEs100.sprite_program(SpriteMode::Mask)
        else {
            panic!("expected GLSL source");
        };
        assert!(color.contains("gl_FragColor = texel * vTint;"));
        assert!(mask.contains("gl_FragColor = vMask * texel.a;"));
    }

    #[test]
    fn wgsl_sprite_output_uses_xyzw_swizzles() {
        let ProgramSource::Wgsl(mask) = ShaderDialect::Wgsl.sprite_program(SpriteMode::Mask) else {
            panic!("expected WGSL source");
        };
        let ProgramSource::Wgsl(color) = ShaderDialect::Wgsl.sprite_program(SpriteMode::Color) else {
            panic!("expected WGSL source");
        };
        assert!(mask.contains("return frag.mask * texel.w;"));
        assert!(color.contains("return texel * frag.tint;"));
    }

    #[test]
    fn component_remap_leaves_longer_members_alone() {
        let out = remap_components("frag.amount * texel.a", &ComponentMap::xyzw());
        assert_eq!(out, "frag.amount * texel.w");
    }
}
