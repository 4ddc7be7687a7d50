use crate::coords::SurfaceSize;
use crate::shader::ir::{UNIFORM_RESOLUTION, UNIFORM_TIME};
use crate::shader::ShaderBuilder;

use super::{UniformOverride, UniformValue};

/// Packs the uniform block for one program invocation.
///
/// `resolution` and `time` are always written. Overrides are matched by name against the
/// builder's table; unknown names are skipped and unsupplied uniforms stay zero.
pub fn pack_uniforms(
    builder: &ShaderBuilder,
    resolution: SurfaceSize,
    time: f32,
    overrides: &[UniformOverride],
) -> Vec<f32> {
    let mut block = vec![0.0; builder.uniform_len()];

    write(builder, &mut block, UNIFORM_RESOLUTION, &UniformValue::Vec2(resolution.as_f32()));
    write(builder, &mut block, UNIFORM_TIME, &UniformValue::Float(time));

    for o in overrides {
        if !write(builder, &mut block, &o.name, &o.value) {
            log::trace!("ignoring override for undeclared uniform `{}`", o.name);
        }
    }

    block
}

fn write(builder: &ShaderBuilder, block: &mut [f32], name: &str, value: &UniformValue) -> bool {
    let Some(desc) = builder.find_uniform(name) else {
        return false;
    };
    let dst = &mut block[desc.offset..desc.offset + desc.ty.components()];
    dst.fill(0.0);
    for (d, s) in dst.iter_mut().zip(value.components()) {
        *d = *s;
    }
    true
}
