//! Lighting sub-pipeline: ambient clear, per-light falloff with shadows, separable blur and
//! additive accumulation into the half-resolution lightmap.

mod shadow;

pub use shadow::extrude_shadows;

use crate::backend::{Backend, LightInstance, Target};
use crate::coords::Rect;
use crate::error::RenderResult;
use crate::graph::{run_stage, FrameContext, OffscreenSlot, RenderPassStage, ShaderRegistry};
use crate::scene::{Light, Scene};
use crate::shader::library;
use crate::spatial::SpatialHash;

/// Reusable per-renderer lighting state.
#[derive(Debug)]
pub struct LightingPass {
    spatial: SpatialHash,
    hits: Vec<usize>,
    triangles: Vec<[f32; 2]>,
    blur_h: RenderPassStage,
    blur_v: RenderPassStage,
    accumulate: RenderPassStage,
}

/// Lights with a positive radius whose bounds overlap `view`.
pub fn visible_lights<'a>(lights: &'a [Light], view: Rect) -> impl Iterator<Item = &'a Light> + 'a {
    lights
        .iter()
        .filter(move |l| l.radius > 0.0 && l.intensity > 0.0 && l.bounds().overlaps(view))
}

impl LightingPass {
    pub fn new(blur_radius: f32, cell_size: f32) -> Self {
        let temp = Target::Offscreen(OffscreenSlot::LightTemp.index());
        let blur = Target::Offscreen(OffscreenSlot::BlurTemp.index());
        let lightmap = Target::Offscreen(OffscreenSlot::Lightmap.index());

        Self {
            spatial: SpatialHash::new(cell_size),
            hits: Vec::new(),
            triangles: Vec::new(),
            blur_h: RenderPassStage::new(library::BLUR_H, blur)
                .input(OffscreenSlot::LightTemp)
                .uniform("radius", blur_radius),
            blur_v: RenderPassStage::new(library::BLUR_V, temp)
                .input(OffscreenSlot::BlurTemp)
                .uniform("radius", blur_radius),
            accumulate: RenderPassStage::new(library::LIGHT_ACCUMULATE, lightmap)
                .input(OffscreenSlot::LightTemp),
        }
    }

    /// Renders the lightmap for `scene` as seen through `view`.
    ///
    /// The lightmap always ends up cleared to the ambient color; lights outside `view` issue
    /// no backend calls at all. Returns the number of lights drawn.
    pub fn render(
        &mut self,
        backend: &mut dyn Backend,
        registry: &ShaderRegistry,
        scene: &Scene,
        view: Rect,
        frame: &FrameContext,
    ) -> RenderResult<usize> {
        let lightmap = Target::Offscreen(OffscreenSlot::Lightmap.index());
        let temp = Target::Offscreen(OffscreenSlot::LightTemp.index());

        backend.clear(lightmap, scene.ambient())?;

        self.spatial.rebuild(scene.colliders.iter().map(|c| c.bounds()));

        let mut drawn = 0;
        for light in visible_lights(&scene.lights, view) {
            backend.clear(temp, crate::coords::ColorRgba::TRANSPARENT)?;
            backend.draw_light(temp, &LightInstance::from_light(light))?;

            self.triangles.clear();
            self.spatial.query(light.bounds(), &mut self.hits);
            for &i in &self.hits {
                extrude_shadows(light.position, light.radius, &scene.colliders[i], &mut self.triangles);
            }
            if !self.triangles.is_empty() {
                backend.draw_shadows(temp, &self.triangles)?;
            }

            run_stage(backend, registry, &self.blur_h, frame)?;
            run_stage(backend, registry, &self.blur_v, frame)?;
            run_stage(backend, registry, &self.accumulate, frame)?;
            drawn += 1;
        }

        log::trace!("lighting: {drawn} of {} lights drawn", scene.lights.len());
        Ok(drawn)
    }
}
