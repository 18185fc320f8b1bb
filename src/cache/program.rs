use wgpu::ShaderStages;

use super::key::{ProgramCacheKey, ProgramCompatibility};
use crate::interfaces::{CommandRecorder, PipelineHandle, PipelineLayoutHandle};
use crate::layout::{ProgramLayout, SetIndexes, VertexBufferFormat};
use crate::push_constants::{MatrixInputs, PushConstantLayout, PushConstantRecipe, PushConstantStrategy};

/// A synthesized program together with its compiled pipeline.
///
/// Shared through `Arc` by every instance whose configuration maps to the
/// same cache entry. Immutable once built.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub name: String,
    pub key: ProgramCacheKey,
    pub vertex_source: String,
    pub fragment_source: String,
    pub layout: ProgramLayout,
    pub push_constant_layout: PushConstantLayout,
    pub recipe: PushConstantRecipe,
    pub vertex_format: VertexBufferFormat,
    pub set_indexes: SetIndexes,
    pub compatibility: ProgramCompatibility,
    pub pipeline_layout: PipelineLayoutHandle,
    pub pipeline: PipelineHandle,
}

impl CompiledProgram {
    /// Hash of the material set layout, `None` when no material is bound.
    #[inline]
    #[must_use]
    pub fn material_layout_hash(&self) -> Option<u64> {
        self.compatibility.material_layout_hash
    }

    #[inline]
    #[must_use]
    pub fn is_compatible_with(&self, compatibility: &ProgramCompatibility) -> bool {
        self.compatibility == *compatibility
    }

    pub fn bind(&self, recorder: &mut dyn CommandRecorder) {
        recorder.bind_pipeline(self.pipeline, self.pipeline_layout);
    }

    /// Uploads the matrices this program expects. Does nothing when the
    /// recipe pushes nothing.
    pub fn push_matrices(&self, recorder: &mut dyn CommandRecorder, inputs: &MatrixInputs) {
        if self.push_constant_layout.is_empty() {
            return;
        }
        let payload = PushConstantStrategy::write(&self.push_constant_layout, inputs);
        let stages = if self.push_constant_layout.stages.is_empty() {
            ShaderStages::VERTEX
        } else {
            self.push_constant_layout.stages
        };
        recorder.push_constants(self.pipeline_layout, stages, 0, &payload);
    }
}
