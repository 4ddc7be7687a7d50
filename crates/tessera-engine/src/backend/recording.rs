//! In-memory backend that records every call, for exercising the frame graph without a GPU.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::coords::{ColorRgba, SurfaceSize};
use crate::error::{RenderError, RenderResult};

use super::{
    Backend, BackendKind, BufferId, DrawCall, LightInstance, ProgramDesc, SpriteInstance,
    SpriteMode, Target, TextureData,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    LoadTexture(String),
    CompileProgram(String),
    ConfigureTargets(SurfaceSize, Vec<SurfaceSize>),
    CreateBuffer { id: BufferId, capacity: usize },
    WriteInstances { id: BufferId, count: usize },
    FreeBuffer(BufferId),
    BeginFrame([f32; 4]),
    Clear(Target, ColorRgba),
    DrawSprites { target: Target, mode: SpriteMode, buffer: BufferId, calls: Vec<DrawCall> },
    DrawLight(Target, LightInstance),
    DrawShadows { target: Target, vertices: usize },
    RunProgram {
        name: String,
        inputs: Vec<usize>,
        output: Target,
        uniforms: Vec<f32>,
        clear: Option<ColorRgba>,
    },
    EndFrame,
}

/// Everything a [`RecordingBackend`] has observed. Shared so tests can inspect it while the
/// renderer owns the backend.
#[derive(Debug, Default)]
pub struct Recording {
    pub calls: Vec<Call>,
    textures: HashSet<String>,
    programs: HashMap<String, ProgramDesc>,
    live_buffers: HashMap<BufferId, usize>,
    next_buffer: u32,
    /// When set, `compile_program` fails for this name.
    pub fail_compile: Option<String>,
}

impl Recording {
    pub fn program(&self, name: &str) -> Option<&ProgramDesc> {
        self.programs.get(name)
    }

    pub fn live_buffers(&self) -> usize {
        self.live_buffers.len()
    }

    /// Calls recorded since the last `BeginFrame`, inclusive.
    pub fn last_frame(&self) -> &[Call] {
        let start = self
            .calls
            .iter()
            .rposition(|c| matches!(c, Call::BeginFrame(_)))
            .unwrap_or(0);
        &self.calls[start..]
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

#[derive(Debug)]
pub struct RecordingBackend {
    kind: BackendKind,
    log: Rc<RefCell<Recording>>,
}

impl RecordingBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self { kind, log: Rc::default() }
    }

    pub fn log(&self) -> Rc<RefCell<Recording>> {
        Rc::clone(&self.log)
    }
}

impl Backend for RecordingBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn load_texture(&mut self, texture: &TextureData) -> RenderResult<()> {
        let mut log = self.log.borrow_mut();
        texture.validate()?;
        log.textures.insert(texture.name.clone());
        log.calls.push(Call::LoadTexture(texture.name.clone()));
        Ok(())
    }

    fn compile_program(&mut self, name: &str, desc: &ProgramDesc) -> RenderResult<()> {
        let mut log = self.log.borrow_mut();
        if log.fail_compile.as_deref() == Some(name) {
            return Err(RenderError::ShaderCompile {
                name: name.to_string(),
                log: "rejected by test".to_string(),
            });
        }
        log.programs.insert(name.to_string(), desc.clone());
        log.calls.push(Call::CompileProgram(name.to_string()));
        Ok(())
    }

    fn configure_targets(&mut self, surface: SurfaceSize, targets: &[SurfaceSize])
    -> RenderResult<()> {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::ConfigureTargets(surface, targets.to_vec()));
        Ok(())
    }

    fn create_instance_buffer(&mut self, capacity: usize) -> RenderResult<BufferId> {
        let mut log = self.log.borrow_mut();
        let id = BufferId(log.next_buffer);
        log.next_buffer += 1;
        log.live_buffers.insert(id, capacity);
        log.calls.push(Call::CreateBuffer { id, capacity });
        Ok(id)
    }

    fn write_instances(&mut self, buffer: BufferId, instances: &[SpriteInstance])
    -> RenderResult<()> {
        let mut log = self.log.borrow_mut();
        let capacity = log.live_buffers.get(&buffer).copied().unwrap_or(0);
        assert!(instances.len() <= capacity, "write past buffer capacity");
        log.calls.push(Call::WriteInstances { id: buffer, count: instances.len() });
        Ok(())
    }

    fn free_instance_buffer(&mut self, buffer: BufferId) {
        let mut log = self.log.borrow_mut();
        assert!(log.live_buffers.remove(&buffer).is_some(), "double free of {buffer:?}");
        log.calls.push(Call::FreeBuffer(buffer));
    }

    fn begin_frame(&mut self, view: [f32; 4]) -> RenderResult<()> {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::BeginFrame(view));
        Ok(())
    }

    fn clear(&mut self, target: Target, color: ColorRgba) -> RenderResult<()> {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::Clear(target, color));
        Ok(())
    }

    fn draw_sprites(
        &mut self,
        target: Target,
        mode: SpriteMode,
        buffer: BufferId,
        calls: &[DrawCall],
    ) -> RenderResult<()> {
        let mut log = self.log.borrow_mut();
        if let Some(missing) = calls.iter().find(|c| !log.textures.contains(&c.texture)) {
            return Err(RenderError::UnknownTexture(missing.texture.clone()));
        }
        log.calls.push(Call::DrawSprites { target, mode, buffer, calls: calls.to_vec() });
        Ok(())
    }

    fn draw_light(&mut self, target: Target, light: &LightInstance) -> RenderResult<()> {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::DrawLight(target, *light));
        Ok(())
    }

    fn draw_shadows(&mut self, target: Target, triangles: &[[f32; 2]]) -> RenderResult<()> {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::DrawShadows { target, vertices: triangles.len() });
        Ok(())
    }

    fn run_program(
        &mut self,
        name: &str,
        inputs: &[usize],
        output: Target,
        uniforms: &[f32],
        clear: Option<ColorRgba>,
    ) -> RenderResult<()> {
        let mut log = self.log.borrow_mut();
        if !log.programs.contains_key(name) {
            return Err(RenderError::UnknownShader(name.to_string()));
        }
        log.calls.push(Call::RunProgram {
            name: name.to_string(),
            inputs: inputs.to_vec(),
            output,
            uniforms: uniforms.to_vec(),
            clear,
        });
        Ok(())
    }

    fn end_frame(&mut self) -> RenderResult<()> {
        let mut log = self.log.borrow_mut();
        log.calls.push(Call::EndFrame);
        Ok(())
    }
}
