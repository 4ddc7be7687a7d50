//! The per-frame driver: batching, the lighting chain and the post-process pass list.

mod config;

pub use config::RendererConfig;

use std::sync::Arc;
use std::time::Instant;

use crate::backend::{self, Backend, BackendKind, BlendMode, HostContext, SpriteMode, Target, TextureData};
use crate::batch::LayerTable;
use crate::coords::{ColorRgba, SurfaceSize};
use crate::error::RenderResult;
use crate::graph::{
    default_passes, run_stage, run_stages, slot_sizes, FrameContext, OffscreenSlot,
    RenderPassStage, ShaderRegistry,
};
use crate::lighting::LightingPass;
use crate::scene::{Camera, LayerId, Scene, SceneLayer};
use crate::shader::{library, ShaderBuilder};

/// Renders [`Scene`]s through one backend.
///
/// Per frame, in order: lit layers into `Scene`, the lightmap, the `light` composite into
/// `Primary`, unlit layers onto `Primary`, every layer's mask into `Mask`, then [`Self::pass`].
pub struct Renderer<'w> {
    backend: Box<dyn Backend + 'w>,
    config: RendererConfig,
    registry: ShaderRegistry,
    layers: LayerTable,
    lighting: LightingPass,
    composite: RenderPassStage,

    /// Post-process chain run after the mask pass. Defaults to copying `Primary` to the surface.
    pub pass: Vec<RenderPassStage>,

    size: SurfaceSize,
    resize_pending: bool,
    started: Instant,
    order: Vec<usize>,
}

fn offscreen(slot: OffscreenSlot) -> Target {
    Target::Offscreen(slot.index())
}

impl<'w> Renderer<'w> {
    /// Connects `kind` on `host`, uploads `textures` and compiles the built-in programs.
    ///
    /// Fails with [`crate::RenderError::UnsupportedBackend`] when the host cannot run `kind`.
    pub async fn init(
        kind: BackendKind,
        host: HostContext<'w>,
        size: SurfaceSize,
        textures: &[TextureData],
        config: RendererConfig,
    ) -> RenderResult<Self> {
        let backend = backend::connect(kind, host, size, config.gpu.clone()).await?;
        Self::with_backend(backend, size, textures, config)
    }

    /// Wraps an already connected backend.
    pub fn with_backend(
        mut backend: Box<dyn Backend + 'w>,
        size: SurfaceSize,
        textures: &[TextureData],
        config: RendererConfig,
    ) -> RenderResult<Self> {
        for texture in textures {
            backend.load_texture(texture)?;
            log::debug!("loaded atlas `{}` ({}x{})", texture.name, texture.width, texture.height);
        }

        let mut registry = ShaderRegistry::new();
        registry.register_builtins(backend.as_mut())?;

        Ok(Self {
            layers: LayerTable::new(config.layer_limits()),
            lighting: LightingPass::new(config.blur_radius, config.light_cell_size),
            composite: RenderPassStage::new(library::LIGHT, offscreen(OffscreenSlot::Primary))
                .input(OffscreenSlot::Scene)
                .input(OffscreenSlot::Lightmap),
            pass: default_passes(),
            backend,
            config,
            registry,
            size,
            resize_pending: true,
            started: Instant::now(),
            order: Vec::new(),
        })
    }

    #[inline]
    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    #[inline]
    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Records a new surface size; targets are recreated at the start of the next `render`.
    pub fn set_size(&mut self, size: SurfaceSize) {
        if size != self.size {
            self.size = size;
            self.resize_pending = true;
        }
    }

    /// Uploads (or replaces) an atlas after construction.
    pub fn load_texture(&mut self, texture: &TextureData) -> RenderResult<()> {
        self.backend.load_texture(texture)
    }

    pub fn set_clear_color(&mut self, color: ColorRgba) {
        self.config.clear_color = color;
    }

    /// Compiles `builder` under `name` for use in [`Self::pass`] stages. Re-registering a name
    /// replaces the previous program.
    pub fn register_shader(
        &mut self,
        name: &str,
        builder: ShaderBuilder,
        blend: BlendMode,
    ) -> RenderResult<()> {
        self.registry.register(self.backend.as_mut(), name, Arc::new(builder), blend)
    }

    /// Forces the next frame to re-upload layer `id`, static or not.
    pub fn invalidate_layer(&mut self, id: LayerId) {
        self.layers.invalidate(id);
    }

    /// Renders one frame of `scene` as seen by `camera`.
    ///
    /// Any error aborts the frame; the next call starts a fresh one.
    pub fn render(&mut self, scene: &Scene, camera: &Camera) -> RenderResult<()> {
        if self.size.is_empty() {
            log::trace!("skipping frame for empty surface");
            return Ok(());
        }

        if self.resize_pending {
            self.backend.configure_targets(self.size, &slot_sizes(self.size))?;
            self.resize_pending = false;
            log::debug!("offscreen targets sized for {:?}", self.size);
        }

        let frame = FrameContext::new(self.size, self.started.elapsed().as_secs_f32());
        let backend = self.backend.as_mut();

        backend.begin_frame(camera.view_uniform(self.size))?;
        self.layers.sync(&scene.layers, backend)?;

        self.order.clear();
        self.order.extend(0..scene.layers.len());
        self.order.sort_by_key(|&i| scene.layers[i].z);

        let cutoff = self.config.shadow_cutoff;
        let (lit, unlit): (Vec<usize>, Vec<usize>) =
            self.order.iter().partition(|&&i| scene.layers[i].z.is_lit_below(cutoff));
        let scene_slot = offscreen(OffscreenSlot::Scene);
        let primary = offscreen(OffscreenSlot::Primary);
        let mask = offscreen(OffscreenSlot::Mask);

        backend.clear(scene_slot, self.config.clear_color)?;
        draw_layers(backend, &self.layers, &scene.layers, &lit, scene_slot, SpriteMode::Color)?;

        let view = camera.visible_bounds(self.size);
        self.lighting.render(backend, &self.registry, scene, view, &frame)?;
        run_stage(backend, &self.registry, &self.composite, &frame)?;

        draw_layers(backend, &self.layers, &scene.layers, &unlit, primary, SpriteMode::Color)?;

        backend.clear(mask, ColorRgba::TRANSPARENT)?;
        draw_layers(backend, &self.layers, &scene.layers, &self.order, mask, SpriteMode::Mask)?;

        run_stages(backend, &self.registry, &self.pass, &frame)?;

        self.layers.collect_garbage(backend);
        backend.end_frame()
    }
}

/// Issues the draw calls of `layers[indices]`, in that order, onto `target`.
fn draw_layers(
    backend: &mut dyn Backend,
    table: &LayerTable,
    layers: &[SceneLayer],
    indices: &[usize],
    target: Target,
    mode: SpriteMode,
) -> RenderResult<()> {
    for &i in indices {
        let Some(layer) = table.get(layers[i].id) else { continue };
        if layer.draw_calls.is_empty() {
            continue;
        }
        backend.draw_sprites(target, mode, layer.buffer, &layer.draw_calls)?;
    }
    Ok(())
}

impl Drop for Renderer<'_> {
    fn drop(&mut self) {
        self.layers.clear(self.backend.as_mut());
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::recording::{Call, Recording, RecordingBackend};
    use crate::backend::BufferId;
    use crate::coords::Vec2;
    use crate::error::RenderError;
    use crate::scene::{Light, LayerKind, Sprite, ZIndex};

    fn atlas() -> TextureData {
        TextureData::new("atlas", 2, 2, vec![255; 16])
    }

    fn renderer(config: RendererConfig) -> (Renderer<'static>, Rc<RefCell<Recording>>) {
        let backend = RecordingBackend::new(BackendKind::Gles3);
        let log = backend.log();
        let r = Renderer::with_backend(Box::new(backend), SurfaceSize::new(200, 100), &[atlas()],
            config)
            .unwrap();
        log.borrow_mut().calls.clear();
        (r, log)
    }

    fn layer(id: u32, z: i32, kind: LayerKind) -> SceneLayer {
        let mut l = SceneLayer::new(LayerId(id), ZIndex(z), kind);
        l.push(Sprite::new("atlas", Vec2::new(1.0, 1.0), Vec2::new(4.0, 4.0)));
        l
    }

    fn writes(log: &Rc<RefCell<Recording>>) -> usize {
        log.borrow().count(|c| matches!(c, Call::WriteInstances { .. }))
    }

    fn slot(s: OffscreenSlot) -> Target {
        Target::Offscreen(s.index())
    }

    // ── frame order ───────────────────────────────────────────────────────

    #[test]
    fn frame_runs_passes_in_fixed_order() {
        let (mut r, log) = renderer(RendererConfig::default());
        let mut scene = Scene::new();
        scene.layers.push(layer(2, 5, LayerKind::Static));
        scene.layers.push(layer(1, 0, LayerKind::Static));
        scene.lights.push(Light::omni(Vec2::new(50.0, 50.0), 20.0, ColorRgba::WHITE, 1.0));

        r.render(&scene, &Camera::default()).unwrap();

        let log = log.borrow();
        let steps: Vec<String> = log
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::ConfigureTargets(..) => Some("configure".to_string()),
                Call::BeginFrame(_) => Some("begin".to_string()),
                Call::Clear(t, _) => Some(format!("clear {t:?}")),
                Call::DrawSprites { target, mode, .. } => Some(format!("{mode:?} {target:?}")),
                Call::DrawLight(..) => Some("light".to_string()),
                Call::RunProgram { name, .. } => Some(name.clone()),
                Call::EndFrame => Some("end".to_string()),
                _ => None,
            })
            .collect();

        let scene_t = slot(OffscreenSlot::Scene);
        let primary = slot(OffscreenSlot::Primary);
        let mask = slot(OffscreenSlot::Mask);
        let lightmap = slot(OffscreenSlot::Lightmap);
        let temp = slot(OffscreenSlot::LightTemp);
        assert_eq!(steps, vec![
            "configure".to_string(),
            "begin".to_string(),
            format!("clear {scene_t:?}"),
            format!("Color {scene_t:?}"),
            format!("clear {lightmap:?}"),
            format!("clear {temp:?}"),
            "light".to_string(),
            "blur_h".to_string(),
            "blur_v".to_string(),
            "light_accumulate".to_string(),
            "light".to_string(),
            format!("Color {primary:?}"),
            format!("clear {mask:?}"),
            format!("Mask {mask:?}"),
            format!("Mask {mask:?}"),
            "copy".to_string(),
            "end".to_string(),
        ]);
    }

    #[test]
    fn layers_draw_in_z_order_regardless_of_scene_order() {
        let (mut r, log) = renderer(RendererConfig { shadow_cutoff: ZIndex(10), ..Default::default() });
        let mut scene = Scene::new();
        scene.layers.push(layer(1, 3, LayerKind::Static));
        scene.layers.push(layer(2, -1, LayerKind::Static));
        scene.layers.push(layer(3, 3, LayerKind::Static));

        r.render(&scene, &Camera::default()).unwrap();

        let log = log.borrow();
        let buffers: Vec<BufferId> = log
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::DrawSprites { mode: SpriteMode::Color, buffer, .. } => Some(*buffer),
                _ => None,
            })
            .collect();
        // Buffers are created in scene order: layer 1 → 0, layer 2 → 1, layer 3 → 2.
        assert_eq!(buffers, vec![BufferId(1), BufferId(0), BufferId(2)]);
    }

    #[test]
    fn composite_samples_scene_and_lightmap() {
        let (mut r, log) = renderer(RendererConfig::default());
        r.render(&Scene::new(), &Camera::default()).unwrap();

        let log = log.borrow();
        let composite = log.calls.iter().find_map(|c| match c {
            Call::RunProgram { name, inputs, output, .. } if name == library::LIGHT => {
                Some((inputs.clone(), *output))
            }
            _ => None,
        });
        assert_eq!(
            composite,
            Some((
                vec![OffscreenSlot::Scene.index(), OffscreenSlot::Lightmap.index()],
                slot(OffscreenSlot::Primary)
            ))
        );
    }

    // ── resize ────────────────────────────────────────────────────────────

    #[test]
    fn resize_is_deferred_to_next_render() {
        let (mut r, log) = renderer(RendererConfig::default());
        r.render(&Scene::new(), &Camera::default()).unwrap();

        r.set_size(SurfaceSize::new(64, 32));
        assert!(!matches!(log.borrow().calls.last(), Some(Call::ConfigureTargets(..))));
        assert_eq!(log.borrow().count(|c| matches!(c, Call::ConfigureTargets(..))), 1);

        r.render(&Scene::new(), &Camera::default()).unwrap();
        let log = log.borrow();
        let configs: Vec<_> = log
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::ConfigureTargets(s, t) => Some((*s, t.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[1].0, SurfaceSize::new(64, 32));
        assert_eq!(configs[1].1[OffscreenSlot::Lightmap.index()], SurfaceSize::new(32, 16));
    }

    #[test]
    fn unchanged_size_does_not_reconfigure() {
        let (mut r, log) = renderer(RendererConfig::default());
        r.render(&Scene::new(), &Camera::default()).unwrap();
        r.set_size(SurfaceSize::new(200, 100));
        r.render(&Scene::new(), &Camera::default()).unwrap();
        assert_eq!(log.borrow().count(|c| matches!(c, Call::ConfigureTargets(..))), 1);
    }

    #[test]
    fn empty_surface_skips_the_frame() {
        let (mut r, log) = renderer(RendererConfig::default());
        r.set_size(SurfaceSize::new(0, 0));
        r.render(&Scene::new(), &Camera::default()).unwrap();
        assert!(log.borrow().calls.is_empty());
    }

    // ── batching through the renderer ─────────────────────────────────────

    #[test]
    fn static_layer_is_not_reuploaded_on_second_render() {
        let (mut r, log) = renderer(RendererConfig::default());
        let mut scene = Scene::new();
        scene.layers.push(layer(1, 0, LayerKind::Static));

        r.render(&scene, &Camera::default()).unwrap();
        scene.layers[0].push(Sprite::new("atlas", Vec2::ZERO, Vec2::new(1.0, 1.0)));
        r.render(&scene, &Camera::default()).unwrap();
        assert_eq!(writes(&log), 1);

        r.invalidate_layer(LayerId(1));
        r.render(&scene, &Camera::default()).unwrap();
        assert_eq!(writes(&log), 2);
    }

    #[test]
    fn dynamic_layer_reuploads_when_dirty() {
        let (mut r, log) = renderer(RendererConfig::default());
        let mut scene = Scene::new();
        scene.layers.push(layer(1, 0, LayerKind::Dynamic));

        r.render(&scene, &Camera::default()).unwrap();
        r.render(&scene, &Camera::default()).unwrap();
        assert_eq!(writes(&log), 1);

        scene.layers[0].sprites_mut()[0].position = Vec2::new(9.0, 9.0);
        r.render(&scene, &Camera::default()).unwrap();
        assert_eq!(writes(&log), 2);
    }

    #[test]
    fn dropped_layer_is_freed_once_after_lifetime() {
        let config = RendererConfig { layer_lifetime: 3, ..Default::default() };
        let (mut r, log) = renderer(config);
        let mut scene = Scene::new();
        scene.layers.push(layer(1, 0, LayerKind::Static));
        r.render(&scene, &Camera::default()).unwrap();

        scene.layers.clear();
        for _ in 0..10 {
            r.render(&scene, &Camera::default()).unwrap();
        }
        assert_eq!(log.borrow().count(|c| matches!(c, Call::FreeBuffer(_))), 1);
        assert_eq!(log.borrow().live_buffers(), 0);
    }

    #[test]
    fn drop_frees_live_buffers() {
        let (mut r, log) = renderer(RendererConfig::default());
        let mut scene = Scene::new();
        scene.layers.push(layer(1, 0, LayerKind::Static));
        scene.layers.push(layer(2, 1, LayerKind::Dynamic));
        r.render(&scene, &Camera::default()).unwrap();
        assert_eq!(log.borrow().live_buffers(), 2);

        drop(r);
        assert_eq!(log.borrow().live_buffers(), 0);
    }

    // ── errors ────────────────────────────────────────────────────────────

    #[test]
    fn unknown_texture_aborts_the_frame() {
        let (mut r, log) = renderer(RendererConfig::default());
        let mut scene = Scene::new();
        let mut l = SceneLayer::new(LayerId(1), ZIndex(0), LayerKind::Static);
        l.push(Sprite::new("nope", Vec2::ZERO, Vec2::new(1.0, 1.0)));
        scene.layers.push(l);

        let err = r.render(&scene, &Camera::default()).unwrap_err();
        assert!(matches!(err, RenderError::UnknownTexture(ref t) if t == "nope"));
        assert_eq!(log.borrow().count(|c| matches!(c, Call::EndFrame)), 0);
    }

    #[test]
    fn unregistered_pass_shader_is_reported() {
        let (mut r, _log) = renderer(RendererConfig::default());
        r.pass = vec![RenderPassStage::new("bloom", Target::Surface).input(OffscreenSlot::Primary)];

        let err = r.render(&Scene::new(), &Camera::default()).unwrap_err();
        assert!(matches!(err, RenderError::UnknownShader(ref s) if s == "bloom"));
    }

    #[test]
    fn registered_shader_can_be_used_in_the_pass_list() {
        let (mut r, log) = renderer(RendererConfig::default());
        r.register_shader(library::VIGNETTE, library::vignette(), BlendMode::Replace).unwrap();
        r.pass = vec![
            RenderPassStage::new(library::VIGNETTE, slot(OffscreenSlot::Post0))
                .input(OffscreenSlot::Primary)
                .uniform("strength", 0.5f32),
            RenderPassStage::new(library::COPY, Target::Surface).input(OffscreenSlot::Post0),
        ];

        r.render(&Scene::new(), &Camera::default()).unwrap();
        let log = log.borrow();
        let tail: Vec<&str> = log
            .last_frame()
            .iter()
            .filter_map(|c| match c {
                Call::RunProgram { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .rev()
            .take(2)
            .collect();
        assert_eq!(tail, vec![library::COPY, library::VIGNETTE]);
    }

    #[test]
    fn compile_failure_surfaces_from_register_shader() {
        let (mut r, log) = renderer(RendererConfig::default());
        log.borrow_mut().fail_compile = Some("broken".to_string());
        let err = r
            .register_shader("broken", ShaderBuilder::new(), BlendMode::Replace)
            .unwrap_err();
        assert!(matches!(err, RenderError::ShaderCompile { ref name, .. } if name == "broken"));
    }

    #[test]
    fn invalid_atlas_fails_construction() {
        let backend = RecordingBackend::new(BackendKind::Gles2);
        let bad = TextureData::new("atlas", 4, 4, vec![0; 3]);
        let result = Renderer::with_backend(Box::new(backend), SurfaceSize::new(8, 8), &[bad],
            RendererConfig::default());
        assert!(matches!(result, Err(RenderError::InvalidTexture { .. })));
    }
}
