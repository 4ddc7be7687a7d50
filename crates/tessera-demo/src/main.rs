//! Lit tile room: a static floor, dynamic crates casting shadows, two wandering lights and an
//! unlit overlay, finished with a vignette.

use anyhow::Result;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use tessera_engine::coords::{ColorRgba, Rect, Vec2};
use tessera_engine::core::{App, AppControl, FrameCtx};
use tessera_engine::logging::{init_logging, LoggingConfig};
use tessera_engine::scene::{Camera, Collider, LayerId, LayerKind, Light, Scene, SceneLayer, Sprite, ZIndex};
use tessera_engine::shader::library;
use tessera_engine::window::{Runtime, RuntimeConfig};
use tessera_engine::{OffscreenSlot, RenderPassStage, Renderer, Target, TextureData};

const ATLAS: &str = "tiles";
const TILE_PX: u32 = 16;
const TILE: f32 = 32.0;
const COLUMNS: u32 = 40;
const ROWS: u32 = 24;

#[derive(Debug, Copy, Clone)]
enum Tile {
    Floor = 0,
    Stone = 1,
    Crate = 2,
    Lamp = 3,
}

impl Tile {
    const COUNT: u32 = 4;

    fn uv(self) -> (Vec2, Vec2) {
        let w = 1.0 / Self::COUNT as f32;
        let u = self as u32 as f32 * w;
        (Vec2::new(u, 0.0), Vec2::new(u + w, 1.0))
    }

    fn sprite(self, position: Vec2, size: f32) -> Sprite {
        let (lo, hi) = self.uv();
        Sprite::new(ATLAS, position, Vec2::new(size, size)).with_uv(lo, hi)
    }
}

/// Four 16×16 tiles side by side, generated so the demo needs no asset files.
fn tile_atlas() -> TextureData {
    let width = TILE_PX * Tile::COUNT;
    let mut pixels = Vec::with_capacity((width * TILE_PX * 4) as usize);

    for y in 0..TILE_PX {
        for x in 0..width {
            let (tile, lx, ly) = (x / TILE_PX, x % TILE_PX, y);
            let edge = lx == 0 || ly == 0 || lx == TILE_PX - 1 || ly == TILE_PX - 1;
            let noise = ((lx * 7 + ly * 13) % 5) as u8 * 6;
            let rgba = match tile {
                0 if edge => [70, 64, 58, 255],
                0 => [110 + noise, 100 + noise, 88 + noise, 255],
                1 => [90 + noise, 92 + noise, 100 + noise, 255],
                2 if edge || lx == ly || lx + ly == TILE_PX - 1 => [96, 60, 30, 255],
                2 => [150 + noise, 104 + noise, 54, 255],
                _ => {
                    let (dx, dy) = (lx as i32 - 8, ly as i32 - 8);
                    if dx * dx + dy * dy <= 30 { [255, 220, 140, 255] } else { [0, 0, 0, 0] }
                }
            };
            pixels.extend_from_slice(&rgba);
        }
    }

    TextureData::new(ATLAS, width, TILE_PX, pixels)
}

struct Demo {
    scene: Scene,
    camera: Camera,
    time: f32,
}

const FLOOR: LayerId = LayerId(1);
const CRATES: LayerId = LayerId(2);
const OVERLAY: LayerId = LayerId(3);

impl Demo {
    fn new() -> Self {
        let mut scene = Scene::new();
        scene.ambient_color = ColorRgba::new(0.35, 0.4, 0.55, 1.0);
        scene.ambient_intensity = 0.25;

        let mut floor = SceneLayer::new(FLOOR, ZIndex(-1), LayerKind::Static);
        for row in 0..ROWS {
            for col in 0..COLUMNS {
                let tile = if (row * 3 + col * 5) % 11 == 0 { Tile::Stone } else { Tile::Floor };
                floor.push(tile.sprite(Vec2::new(col as f32 * TILE, row as f32 * TILE), TILE));
            }
        }

        let mut crates = SceneLayer::new(CRATES, ZIndex(0), LayerKind::Dynamic);
        for i in 0..12u32 {
            let at = Vec2::new(160.0 + (i % 4) as f32 * 240.0, 128.0 + (i / 4) as f32 * 192.0);
            crates.push(Tile::Crate.sprite(at, TILE).with_mask(ColorRgba::WHITE));
            scene.colliders.push(Collider::rect(Rect::from_origin_size(at, Vec2::new(TILE, TILE))));
        }

        let mut overlay = SceneLayer::new(OVERLAY, ZIndex(10), LayerKind::Static);
        for i in 0..3 {
            overlay.push(Tile::Lamp.sprite(Vec2::new(16.0 + i as f32 * 40.0, 16.0), 32.0));
        }

        scene.layers = vec![floor, crates, overlay];
        scene.lights = vec![
            Light::omni(Vec2::ZERO, 260.0, ColorRgba::new(1.0, 0.85, 0.6, 1.0), 1.4),
            Light::omni(Vec2::ZERO, 320.0, ColorRgba::new(0.5, 0.7, 1.0, 1.0), 1.0)
                .spot(0.0, 0.6),
        ];

        Self { scene, camera: Camera::default(), time: 0.0 }
    }

    fn update(&mut self, dt: f32) {
        self.time += dt;
        let t = self.time;
        let center = Vec2::new(COLUMNS as f32 * TILE * 0.5, ROWS as f32 * TILE * 0.5);

        self.scene.lights[0].position = center + Vec2::new(t.cos() * 300.0, (t * 0.7).sin() * 180.0);
        self.scene.lights[1].position = center + Vec2::new((t * 0.4).sin() * 420.0, 0.0);
        self.scene.lights[1].direction = t * 0.9;

        // Bob the crates; dynamic layers re-upload only when touched.
        if let Some(crates) = self.scene.layer_mut(CRATES) {
            for (i, sprite) in crates.sprites_mut().iter_mut().enumerate() {
                let base = 128.0 + (i / 4) as f32 * 192.0;
                sprite.position.y = base + (t * 2.0 + i as f32).sin() * 4.0;
            }
        }
    }
}

impl App for Demo {
    fn on_start(&mut self, _window_id: WindowId, renderer: &mut Renderer<'_>) -> AppControl {
        if let Err(err) = renderer.load_texture(&tile_atlas()) {
            log::error!("atlas upload failed: {err}");
            return AppControl::Exit;
        }

        renderer.pass = vec![
            RenderPassStage::new(library::VIGNETTE, Target::Offscreen(OffscreenSlot::Post0.index()))
                .input(OffscreenSlot::Primary)
                .uniform("strength", 0.8f32)
                .uniform("radius", 0.75f32)
                .uniform("softness", 0.45f32),
            RenderPassStage::new(library::COPY, Target::Surface).input(OffscreenSlot::Post0),
        ];

        log::info!("demo scene ready on {:?}", renderer.kind());
        AppControl::Continue
    }

    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        self.update(ctx.dt);
        ctx.render(&self.scene, &self.camera)
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "tessera · lit tiles".to_string(),
        ..Default::default()
    };
    Runtime::run(config, Demo::new())
}
