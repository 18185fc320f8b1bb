//! Program Caching
//!
//! - [`ProgramBuilder`]: synthesis through pipeline creation
//! - [`ProgramCache`]: per-target store of shared [`CompiledProgram`]s
//! - [`ProgramCacheKey`]: coarse key, confirmed by a [`ProgramCompatibility`]

pub mod builder;
pub mod key;
pub mod program;
pub mod program_cache;

pub use builder::ProgramBuilder;
pub use key::{ProgramCacheKey, ProgramCompatibility, RenderTargetId, fx_hash_key};
pub use program::CompiledProgram;
pub use program_cache::ProgramCache;

pub use crate::interfaces::{
    CommandRecorder, PipelineCompiler, PipelineDescriptor, PipelineHandle, PipelineLayoutHandle,
    ShaderModuleHandle,
};
