//! Shader Code Synthesis
//!
//! Generates GLSL for one resolved configuration. See [`program`] for the
//! overall flow.

pub mod chunks;
pub mod code;
pub mod context;
pub mod light;
pub mod program;
pub mod resources;
pub mod shadow;
pub mod stage;
pub mod surface;
pub mod unlit;
pub mod variables;

pub use code::{Code, CodeBuffer, Zone};
pub use context::BuildContext;
pub use program::{SynthesizedProgram, needs_view_block, synthesize};
pub use stage::{ShaderStage, StageKind};
pub use surface::SurfaceDescription;
pub use variables::SynthVariable;
