//! WGSL uniform-struct layout for the linear packed table.
//!
//! The frame graph packs uniforms back to back (`vec2` at 0, `float` at 2, ...). WGSL aligns
//! `vec2` to 8 bytes and `vec3`/`vec4` to 16, so the block is spread out before upload.

use crate::shader::{ShaderType, UniformDesc};

/// Alignment of `ty` inside a WGSL uniform struct, in `f32` units.
const fn align_of(ty: ShaderType) -> usize {
    match ty {
        ShaderType::Float => 1,
        ShaderType::Vec2 => 2,
        ShaderType::Vec3 | ShaderType::Vec4 => 4,
    }
}

#[inline]
const fn round_up(v: usize, align: usize) -> usize {
    v.div_ceil(align) * align
}

/// Destination offsets (in floats) for each uniform plus the padded block length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WgslLayout {
    members: Vec<(usize, usize, usize)>,
    len: usize,
}

impl WgslLayout {
    pub fn new(uniforms: &[UniformDesc]) -> Self {
        let mut cursor = 0;
        let members = uniforms
            .iter()
            .map(|u| {
                let n = u.ty.components();
                let dst = round_up(cursor, align_of(u.ty));
                cursor = dst + n;
                (u.offset, dst, n)
            })
            .collect();

        // Uniform buffer bindings are sized in 16-byte rows.
        Self { members, len: round_up(cursor.max(1), 4) }
    }

    /// Length of the repacked block in floats.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn byte_len(&self) -> u64 {
        (self.len() * size_of::<f32>()) as u64
    }

    /// Spreads `packed` into `out` (resized to [`Self::len`]). Missing source floats read as 0.
    pub fn repack_into(&self, packed: &[f32], out: &mut Vec<f32>) {
        out.clear();
        out.resize(self.len, 0.0);
        for &(src, dst, n) in &self.members {
            for i in 0..n {
                out[dst + i] = packed.get(src + i).copied().unwrap_or(0.0);
            }
        }
    }
}
