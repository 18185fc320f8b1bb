//! Shared fixtures: a device-free compiler, targets, geometry and a
//! command recorder that keeps what it was given.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use wgpu::ShaderStages;

use myth_synth::cache::{PipelineHandle, PipelineLayoutHandle, ShaderModuleHandle};
use myth_synth::{
    CommandRecorder, GeometryFlags, GeometryInterface, PipelineCompiler, PipelineDescriptor,
    ProgramLayout, RenderTargetId, RenderTargetInterface, Result,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Compiler
// ============================================================================

/// What the compiler saw for one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRecord {
    pub label: String,
    pub vertex_buffers: usize,
    pub view_count: Option<u32>,
    pub depth_write: bool,
}

#[derive(Default)]
pub struct CountingCompiler {
    next_handle: AtomicU64,
    modules: AtomicU64,
    layouts: AtomicU64,
    pipelines: Mutex<Vec<PipelineRecord>>,
}

impl CountingCompiler {
    fn handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn module_count(&self) -> u64 {
        self.modules.load(Ordering::Relaxed)
    }

    pub fn layout_count(&self) -> u64 {
        self.layouts.load(Ordering::Relaxed)
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.lock().len()
    }

    pub fn pipelines(&self) -> Vec<PipelineRecord> {
        self.pipelines.lock().clone()
    }
}

impl PipelineCompiler for CountingCompiler {
    fn create_shader_module(
        &self,
        _stage: ShaderStages,
        _label: &str,
        source: &str,
    ) -> Result<ShaderModuleHandle> {
        assert!(source.starts_with("#version"));
        self.modules.fetch_add(1, Ordering::Relaxed);
        Ok(ShaderModuleHandle(self.handle()))
    }

    fn create_pipeline_layout(
        &self,
        _label: &str,
        _layout: &ProgramLayout,
    ) -> Result<PipelineLayoutHandle> {
        self.layouts.fetch_add(1, Ordering::Relaxed);
        Ok(PipelineLayoutHandle(self.handle()))
    }

    fn create_pipeline(&self, descriptor: &PipelineDescriptor<'_>) -> Result<PipelineHandle> {
        self.pipelines.lock().push(PipelineRecord {
            label: descriptor.label.to_string(),
            vertex_buffers: descriptor.vertex_format.buffers.len(),
            view_count: descriptor.view_count,
            depth_write: descriptor.depth_write,
        });
        Ok(PipelineHandle(self.handle()))
    }
}

// ============================================================================
// Targets & Geometry
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct MockTarget {
    pub id: u64,
    pub cubemap: bool,
    pub cascades: u32,
    pub render_pass: u64,
}

impl MockTarget {
    pub fn screen(id: u64) -> Self {
        Self {
            id,
            cubemap: false,
            cascades: 0,
            render_pass: 100 + id,
        }
    }

    pub fn cube(id: u64) -> Self {
        Self {
            cubemap: true,
            ..Self::screen(id)
        }
    }

    pub fn cascaded(id: u64, cascades: u32) -> Self {
        Self {
            cascades,
            ..Self::screen(id)
        }
    }
}

impl RenderTargetInterface for MockTarget {
    fn id(&self) -> RenderTargetId {
        RenderTargetId(self.id)
    }

    fn is_cubemap(&self) -> bool {
        self.cubemap
    }

    fn is_cascaded_shadow_map(&self) -> bool {
        self.cascades > 0
    }

    fn cascade_count(&self) -> u32 {
        self.cascades
    }

    fn extent(&self) -> (u32, u32) {
        (1024, 1024)
    }

    fn render_pass_handle(&self) -> u64 {
        self.render_pass
    }
}

pub struct MockGeometry {
    pub flags: GeometryFlags,
    pub layers: u32,
}

impl MockGeometry {
    pub fn full() -> Self {
        Self {
            flags: GeometryFlags::all(),
            layers: 1,
        }
    }
}

impl GeometryInterface for MockGeometry {
    fn flags(&self) -> GeometryFlags {
        self.flags
    }

    fn layer_count(&self) -> u32 {
        self.layers
    }
}

// ============================================================================
// Recorder
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Bind(PipelineHandle),
    Push { stages: ShaderStages, bytes: usize },
    Draw { layer: u32, instances: u32 },
}

#[derive(Default)]
pub struct RecordingRecorder {
    pub commands: Vec<Command>,
}

impl RecordingRecorder {
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, Command::Draw { .. }))
            .count()
    }

    pub fn pushed_bytes(&self) -> Vec<usize> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                Command::Push { bytes, .. } => Some(*bytes),
                _ => None,
            })
            .collect()
    }
}

impl CommandRecorder for RecordingRecorder {
    fn bind_pipeline(&mut self, pipeline: PipelineHandle, _layout: PipelineLayoutHandle) {
        self.commands.push(Command::Bind(pipeline));
    }

    fn push_constants(
        &mut self,
        _layout: PipelineLayoutHandle,
        stages: ShaderStages,
        _offset: u32,
        data: &[u8],
    ) {
        self.commands.push(Command::Push {
            stages,
            bytes: data.len(),
        });
    }

    fn draw(&mut self, layer_index: u32, instance_count: u32) {
        self.commands.push(Command::Draw {
            layer: layer_index,
            instances: instance_count,
        });
    }
}
