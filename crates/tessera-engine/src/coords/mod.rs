//! Plain geometry shared by the scene, lighting and every backend.
//!
//! All CPU-side positions are world units with the origin at the top-left and +Y pointing
//! down. The view uniform carries the camera origin and extent; vertex programs do the
//! conversion to clip space.

mod color;
mod rect;
mod size;
mod vec2;
mod viewport;

pub use color::ColorRgba;
pub use rect::Rect;
pub use size::SurfaceSize;
pub use vec2::Vec2;
pub use viewport::Viewport;
