pub mod resolver;
pub mod types;

pub use resolver::{LightDescriptor, RenderIntent, TargetShape, resolve};
pub use types::*;
