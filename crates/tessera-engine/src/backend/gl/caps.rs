//! Context capability checks for the GL adapters.

use std::collections::HashSet;

use crate::backend::BackendKind;

/// The parts of `GL_VERSION` the adapters care about.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GlVersion {
    pub major: u32,
    pub minor: u32,
    pub embedded: bool,
}

impl From<&glow::Version> for GlVersion {
    fn from(v: &glow::Version) -> Self {
        Self { major: v.major, minor: v.minor, embedded: v.is_embedded }
    }
}

impl GlVersion {
    #[inline]
    fn at_least(self, major: u32, minor: u32) -> bool {
        (self.major, self.minor) >= (major, minor)
    }
}

/// How instanced draws reach the driver.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Instancing {
    Core,
    /// Through one of the `*_instanced_arrays` extensions.
    Extension,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Capabilities {
    pub instancing: Instancing,
    /// Vertex array objects exist (and are required on desktop core profiles).
    pub vertex_arrays: bool,
    /// `RGBA8` is a valid sized internal format.
    pub sized_formats: bool,
}

const INSTANCING_EXTENSIONS: [&str; 3] =
    ["GL_ANGLE_instanced_arrays", "GL_EXT_instanced_arrays", "GL_ARB_instanced_arrays"];

/// Decides whether a context can run `kind`, or why not.
///
/// Desktop contexts accept `#version 100` from 4.1 and `#version 300 es` from 4.3.
pub fn check_support(
    kind: BackendKind,
    version: GlVersion,
    extensions: &HashSet<String>,
) -> Result<Capabilities, String> {
    let es3_class = if version.embedded { version.major >= 3 } else { version.at_least(3, 3) };

    match kind {
        BackendKind::Gles3 => {
            let ok = if version.embedded { version.major >= 3 } else { version.at_least(4, 3) };
            if !ok {
                return Err(format!(
                    "GLSL ES 3.00 needs OpenGL ES 3.0 or OpenGL 4.3, context is {}.{}",
                    version.major, version.minor
                ));
            }
        }
        BackendKind::Gles2 => {
            let ok = if version.embedded { version.major >= 2 } else { version.at_least(4, 1) };
            if !ok {
                return Err(format!(
                    "GLSL ES 1.00 needs OpenGL ES 2.0 or OpenGL 4.1, context is {}.{}",
                    version.major, version.minor
                ));
            }
        }
        BackendKind::Wgpu => return Err("wgpu does not run on a GL context".to_string()),
    }

    let instancing = if es3_class {
        Instancing::Core
    } else if INSTANCING_EXTENSIONS.iter().any(|e| extensions.contains(*e)) {
        Instancing::Extension
    } else {
        return Err("no instanced-arrays support".to_string());
    };

    Ok(Capabilities { instancing, vertex_arrays: es3_class, sized_formats: es3_class })
}
