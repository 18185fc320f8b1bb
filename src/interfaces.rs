//! Collaborator Interfaces
//!
//! Everything the synthesis layer needs from the rest of the renderer is
//! consumed through the traits in this module. Device objects, asset parsing
//! and scene traversal stay on the other side.
//!
//! | Trait                     | Provides                                        |
//! |---------------------------|-------------------------------------------------|
//! | [`MaterialInterface`]     | Shading intent, caps, bindings, surface code    |
//! | [`GeometryInterface`]     | Vertex attribute presence, layer count          |
//! | [`RenderTargetInterface`] | Target identity and shape                       |
//! | [`PipelineCompiler`]      | Shader module, layout and pipeline creation     |
//! | [`CommandRecorder`]       | Draw-time command recording                     |

use wgpu::ShaderStages;

use crate::cache::RenderTargetId;
use crate::config::{GeometryFlags, MaterialCaps, MaterialShading};
use crate::errors::Result;
use crate::layout::{
    Declaration, DescriptorSetLayout, ProgramLayout, ResourceLayoutBuilder, SamplerDeclaration,
    UniformBlock, VertexBufferFormat,
};
use crate::synth::SurfaceDescription;

// ─── Material ────────────────────────────────────────────────────────────────

/// A material as seen by program synthesis.
///
/// The uniform block is bound at `binding` of the per-model-layer set and is
/// visible to both stages. Samplers follow from `first_binding` on and are
/// visible to the fragment stage.
pub trait MaterialInterface: Send + Sync {
    fn name(&self) -> &str;

    fn shading(&self) -> MaterialShading;

    fn caps(&self) -> MaterialCaps;

    fn uniform_block(&self, set: u32, binding: u32) -> Option<UniformBlock>;

    fn samplers(&self, set: u32, first_binding: u32) -> Vec<SamplerDeclaration>;

    /// GLSL expressions describing the surface.
    fn surface(&self) -> SurfaceDescription;

    /// Vertex and fragment declarations of the material set.
    fn declarations(&self, set: u32) -> (Vec<Declaration>, Vec<Declaration>) {
        let block = self.uniform_block(set, 0).map(Declaration::UniformBlock);

        let vertex: Vec<Declaration> = block.iter().cloned().collect();
        let fragment = block
            .into_iter()
            .chain(self.samplers(set, 1).into_iter().map(Declaration::Sampler))
            .collect();

        (vertex, fragment)
    }

    /// Descriptor-set layout of the material when bound at `set`.
    fn descriptor_set_layout(&self, set: u32) -> Result<DescriptorSetLayout> {
        let (vertex, fragment) = self.declarations(set);

        let mut builder = ResourceLayoutBuilder::new(set + 1);
        builder.add_stage(ShaderStages::VERTEX, &vertex)?;
        builder.add_stage(ShaderStages::FRAGMENT, &fragment)?;

        let mut layout = builder.build();
        Ok(layout.set_layouts.swap_remove(set as usize))
    }

    /// Compatibility hash compared against cached programs.
    ///
    /// Materials whose layout cannot be derived hash to `0`.
    fn layout_hash(&self) -> u64 {
        self.descriptor_set_layout(0).map_or(0, |layout| layout.hash())
    }
}

// ─── Geometry & Targets ──────────────────────────────────────────────────────

pub trait GeometryInterface: Send + Sync {
    fn flags(&self) -> GeometryFlags;

    /// Number of sub-meshes, each drawn with its own material.
    fn layer_count(&self) -> u32;
}

pub trait RenderTargetInterface: Send + Sync {
    fn id(&self) -> RenderTargetId;

    fn is_cubemap(&self) -> bool;

    /// Layered depth target holding one cascade per layer.
    fn is_cascaded_shadow_map(&self) -> bool;

    fn cascade_count(&self) -> u32;

    fn extent(&self) -> (u32, u32);

    /// Identity of the API render pass the pipelines are created against.
    fn render_pass_handle(&self) -> u64;

    /// Whether programs render all layers through `gl_ViewIndex`.
    fn is_multiview(&self) -> bool {
        self.is_cubemap() || self.is_cascaded_shadow_map()
    }
}

// ─── Compiler ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderModuleHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineLayoutHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineHandle(pub u64);

/// Everything needed to create one graphics pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineDescriptor<'a> {
    pub label: &'a str,
    pub layout: PipelineLayoutHandle,
    pub vertex_module: ShaderModuleHandle,
    pub fragment_module: ShaderModuleHandle,
    pub vertex_format: &'a VertexBufferFormat,
    pub render_pass_handle: u64,
    pub depth_test: bool,
    pub depth_write: bool,
    /// Views rendered per draw through multiview, `None` for single view.
    pub view_count: Option<u32>,
}

/// Backend that turns synthesized programs into API objects.
///
/// Methods take `&self`; implementations synchronize internally.
pub trait PipelineCompiler: Send + Sync {
    fn create_shader_module(
        &self,
        stage: ShaderStages,
        label: &str,
        source: &str,
    ) -> Result<ShaderModuleHandle>;

    fn create_pipeline_layout(&self, label: &str, layout: &ProgramLayout)
    -> Result<PipelineLayoutHandle>;

    fn create_pipeline(&self, descriptor: &PipelineDescriptor<'_>) -> Result<PipelineHandle>;
}

// ─── Recording ───────────────────────────────────────────────────────────────

pub trait CommandRecorder {
    fn bind_pipeline(&mut self, pipeline: PipelineHandle, layout: PipelineLayoutHandle);

    fn push_constants(
        &mut self,
        layout: PipelineLayoutHandle,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    );

    fn draw(&mut self, layer_index: u32, instance_count: u32);
}
