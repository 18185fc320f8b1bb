#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod cache;
pub mod config;
pub mod errors;
pub mod instance;
pub mod interfaces;
pub mod layout;
pub mod material;
pub mod push_constants;
pub mod settings;
pub mod shadow;
pub mod state;
pub mod synth;

pub use cache::{CompiledProgram, ProgramBuilder, ProgramCache, ProgramCacheKey, RenderTargetId};
pub use config::{
    GeometryFlags, InstancingMode, LightDescriptor, LightType, MaterialCaps, MaterialShading,
    RenderConfiguration, RenderIntent, RenderPassType, ShadingModel, ShadowFilter, TargetShape,
    resolve,
};
pub use errors::{Result, SynthError};
pub use instance::{FrameMatrices, InstanceFlags, PassRequest, Renderable, RenderableInstance, RenderList};
pub use interfaces::{
    CommandRecorder, GeometryInterface, MaterialInterface, PipelineCompiler, PipelineDescriptor,
    RenderTargetInterface,
};
pub use layout::{ProgramLayout, ResourceLayoutBuilder, Std140Layout, VertexBufferFormat};
pub use material::{MaterialParams, StandardMaterial};
pub use push_constants::{MatrixInputs, PushConstantLayout, PushConstantRecipe, PushConstantStrategy};
pub use settings::SynthSettings;
pub use synth::{SurfaceDescription, SynthesizedProgram, synthesize};
