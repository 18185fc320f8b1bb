//! Program Builder
//!
//! Runs the full preparation pipeline for one configuration:
//!
//! ```text
//! synthesize ─► completeness check ─► vertex format ─► modules ─► layout ─► pipeline
//! ```
//!
//! Shader modules are deduplicated by source: the module cache is keyed by
//! the 128-bit `xxh3` hash of the GLSL text, so two programs that emit the
//! same stage share one module.

use log::debug;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use wgpu::ShaderStages;
use xxhash_rust::xxh3::xxh3_128;

use super::key::{ProgramCacheKey, ProgramCompatibility};
use super::program::CompiledProgram;
use crate::config::RenderConfiguration;
use crate::errors::{Result, SynthError};
use crate::interfaces::{
    MaterialInterface, PipelineCompiler, PipelineDescriptor, RenderTargetInterface,
    ShaderModuleHandle,
};
use crate::layout::VertexBufferFormat;
use crate::settings::SynthSettings;
use crate::synth::resources::CUBEMAP_FACES;
use crate::synth::synthesize;

pub struct ProgramBuilder<C: PipelineCompiler> {
    compiler: C,
    settings: SynthSettings,
    module_cache: Mutex<FxHashMap<u128, ShaderModuleHandle>>,
}

impl<C: PipelineCompiler> ProgramBuilder<C> {
    pub fn new(compiler: C, settings: SynthSettings) -> Self {
        Self {
            compiler,
            settings,
            module_cache: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn settings(&self) -> &SynthSettings {
        &self.settings
    }

    /// Number of distinct shader modules created so far.
    pub fn module_count(&self) -> usize {
        self.module_cache.lock().len()
    }

    /// Builds the program for `config` against `target`.
    ///
    /// Nothing is cached here; the caller stores the result in a
    /// [`ProgramCache`](super::ProgramCache).
    pub fn build(
        &self,
        config: &RenderConfiguration,
        material: Option<&dyn MaterialInterface>,
        target: &dyn RenderTargetInterface,
    ) -> Result<CompiledProgram> {
        let program = synthesize(config, material, &self.settings)?;
        program.check_completeness()?;

        if self.settings.show_source_code {
            debug!(
                "Program '{}' vertex source:\n{}",
                program.name,
                normalize_newlines(&program.vertex_source)
            );
            debug!(
                "Program '{}' fragment source:\n{}",
                program.name,
                normalize_newlines(&program.fragment_source)
            );
        }

        let vertex_format =
            VertexBufferFormat::resolve(&program.vertex_declarations, config.geometry)?;

        let expected = program.recipe.byte_size();
        if program.push_constant_layout.total_bytes != expected {
            return Err(SynthError::Layout(format!(
                "program '{}' declares {} push-constant bytes, its {:?} recipe uploads {expected}",
                program.name, program.push_constant_layout.total_bytes, program.recipe
            )));
        }

        let vertex_module =
            self.shader_module(ShaderStages::VERTEX, &program.name, &program.vertex_source)?;
        let fragment_module =
            self.shader_module(ShaderStages::FRAGMENT, &program.name, &program.fragment_source)?;

        let pipeline_layout = self
            .compiler
            .create_pipeline_layout(&program.name, &program.layout)?;

        let view_count = config.is_cubemap_multiview.then(|| {
            if config.is_csm {
                config.cascade_count
            } else {
                CUBEMAP_FACES
            }
        });

        let render_pass_handle = target.render_pass_handle();
        let pipeline = self.compiler.create_pipeline(&PipelineDescriptor {
            label: &program.name,
            layout: pipeline_layout,
            vertex_module,
            fragment_module,
            vertex_format: &vertex_format,
            render_pass_handle,
            depth_test: !config.is_depth_test_disabled,
            depth_write: !config.is_depth_write_disabled,
            view_count,
        })?;

        debug!(
            "Built program '{}' for {:?}: {} vertex buffers, {} modules cached",
            program.name,
            target.id(),
            vertex_format.buffers.len(),
            self.module_count()
        );

        let surface = material.map(MaterialInterface::surface);
        let compatibility =
            ProgramCompatibility::new(config, program.material_layout_hash(), surface.as_ref());
        Ok(CompiledProgram {
            key: ProgramCacheKey::new(config, render_pass_handle),
            name: program.name,
            vertex_source: program.vertex_source,
            fragment_source: program.fragment_source,
            layout: program.layout,
            push_constant_layout: program.push_constant_layout,
            recipe: program.recipe,
            vertex_format,
            set_indexes: program.set_indexes,
            compatibility,
            pipeline_layout,
            pipeline,
        })
    }

    fn shader_module(
        &self,
        stage: ShaderStages,
        label: &str,
        source: &str,
    ) -> Result<ShaderModuleHandle> {
        let hash = xxh3_128(source.as_bytes());
        if let Some(&module) = self.module_cache.lock().get(&hash) {
            return Ok(module);
        }

        // Compiled outside the lock; a racing duplicate keeps the first entry.
        let module = self.compiler.create_shader_module(stage, label, source)?;
        Ok(*self.module_cache.lock().entry(hash).or_insert(module))
    }
}

fn normalize_newlines(source: &str) -> String {
    source.replace("\r\n", "\n").replace('\r', "\n")
}
