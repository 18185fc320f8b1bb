//! Resource Layouts
//!
//! CPU-side mirror of the resources a synthesized program declares:
//! descriptor-set layouts, push-constant ranges and the vertex buffer
//! format. Everything here is plain data; turning it into API objects is the
//! job of the [`PipelineCompiler`](crate::cache::PipelineCompiler).

pub mod builder;
pub mod declaration;
pub mod set_index;
pub mod std140;
pub mod vertex;

pub use builder::ResourceLayoutBuilder;
pub use declaration::{
    Declaration, GlslType, Interpolation, Member, PushConstantBlock, SamplerDeclaration,
    StageVariable, UniformBlock,
};
pub use set_index::{SetIndexAllocator, SetIndexes, SetRole};
pub use std140::Std140Layout;
pub use vertex::{VertexAttribute, VertexBufferFormat, VertexBufferLayout};

use std::hash::{Hash, Hasher};

use smallvec::SmallVec;
use wgpu::{ShaderStages, TextureViewDimension};

// ─── Descriptors ─────────────────────────────────────────────────────────────

/// What a binding slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    /// A std140 uniform buffer of `size` bytes.
    UniformBuffer { size: u32 },
    /// A texture plus sampler pair.
    CombinedImageSampler {
        dimension: TextureViewDimension,
        comparison: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorBinding {
    pub binding: u32,
    pub kind: DescriptorKind,
    pub visibility: ShaderStages,
    /// GLSL instance name, for diagnostics only.
    pub name: String,
}

/// Bindings of one descriptor set, sorted by binding index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorSetLayout {
    pub set: u32,
    pub bindings: SmallVec<[DescriptorBinding; 4]>,
}

impl DescriptorSetLayout {
    #[must_use]
    pub fn new(set: u32) -> Self {
        Self {
            set,
            bindings: SmallVec::new(),
        }
    }

    /// Structural hash of the set: binding indices, kinds and visibility.
    ///
    /// Names and the set index are not part of the hash, so two sets that
    /// accept the same descriptors hash equal wherever they are bound.
    #[must_use]
    pub fn hash(&self) -> u64 {
        let mut hasher = rustc_hash::FxHasher::default();
        self.bindings.len().hash(&mut hasher);
        for binding in &self.bindings {
            binding.binding.hash(&mut hasher);
            binding.kind.hash(&mut hasher);
            binding.visibility.bits().hash(&mut hasher);
        }
        hasher.finish()
    }

    #[must_use]
    pub fn binding(&self, binding: u32) -> Option<&DescriptorBinding> {
        self.bindings.iter().find(|b| b.binding == binding)
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// A push-constant byte range and the stages that read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PushConstantRange {
    pub stages: ShaderStages,
    pub offset: u32,
    pub size: u32,
}

/// Everything a pipeline layout is created from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramLayout {
    /// One entry per allocated set index, in index order.
    pub set_layouts: Vec<DescriptorSetLayout>,
    pub push_constant_ranges: SmallVec<[PushConstantRange; 1]>,
}

impl ProgramLayout {
    #[must_use]
    pub fn set_layout(&self, set: u32) -> Option<&DescriptorSetLayout> {
        self.set_layouts.get(set as usize)
    }

    /// Total push-constant bytes the layout reserves.
    #[must_use]
    pub fn push_constant_size(&self) -> u32 {
        self.push_constant_ranges
            .iter()
            .map(|range| range.offset + range.size)
            .max()
            .unwrap_or(0)
    }
}
