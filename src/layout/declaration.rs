//! Shader resource declarations.
//!
//! A stage is described by an ordered list of [`Declaration`]s. The same list
//! drives two outputs: the GLSL interface text of the stage and the
//! CPU-side [`ProgramLayout`](super::ProgramLayout). Both derive block member
//! offsets from [`Std140Layout`](super::std140::Std140Layout).

use std::fmt::{self, Write};

use wgpu::{TextureViewDimension, VertexFormat};

use super::std140::Std140Layout;

// ─── GLSL Types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlslType {
    Float,
    Int,
    Uint,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    Sampler2D,
    Sampler2DShadow,
    Sampler2DArrayShadow,
    SamplerCube,
}

impl GlslType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Vec4 => "vec4",
            Self::Mat3 => "mat3",
            Self::Mat4 => "mat4",
            Self::Sampler2D => "sampler2D",
            Self::Sampler2DShadow => "sampler2DShadow",
            Self::Sampler2DArrayShadow => "sampler2DArrayShadow",
            Self::SamplerCube => "samplerCube",
        }
    }

    /// Number of consecutive stage-IO locations a value of this type uses.
    #[must_use]
    pub const fn location_count(self) -> u32 {
        match self {
            Self::Mat3 => 3,
            Self::Mat4 => 4,
            _ => 1,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_sampler(self) -> bool {
        matches!(
            self,
            Self::Sampler2D | Self::Sampler2DShadow | Self::Sampler2DArrayShadow | Self::SamplerCube
        )
    }

    /// Integer types must be `flat` when passed between stages.
    #[inline]
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int | Self::Uint)
    }

    /// Texture view dimension of a sampler type.
    #[must_use]
    pub const fn view_dimension(self) -> Option<TextureViewDimension> {
        match self {
            Self::Sampler2D | Self::Sampler2DShadow => Some(TextureViewDimension::D2),
            Self::Sampler2DArrayShadow => Some(TextureViewDimension::D2Array),
            Self::SamplerCube => Some(TextureViewDimension::Cube),
            _ => None,
        }
    }

    /// Whether the sampler performs a depth comparison.
    #[inline]
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(self, Self::Sampler2DShadow | Self::Sampler2DArrayShadow)
    }

    /// Vertex format of one attribute location of this type.
    ///
    /// Matrix attributes occupy several locations, each of their column type.
    #[must_use]
    pub const fn column_vertex_format(self) -> Option<VertexFormat> {
        match self {
            Self::Float => Some(VertexFormat::Float32),
            Self::Int => Some(VertexFormat::Sint32),
            Self::Uint => Some(VertexFormat::Uint32),
            Self::Vec2 => Some(VertexFormat::Float32x2),
            Self::Vec3 | Self::Mat3 => Some(VertexFormat::Float32x3),
            Self::Vec4 | Self::Mat4 => Some(VertexFormat::Float32x4),
            _ => None,
        }
    }
}

impl fmt::Display for GlslType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Block Members ───────────────────────────────────────────────────────────

/// One member of a uniform or push-constant block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Member {
    pub ty: GlslType,
    pub name: String,
    /// `0` for a plain member.
    pub array_size: u32,
}

impl Member {
    pub fn new(ty: GlslType, name: impl Into<String>) -> Self {
        Self {
            ty,
            name: name.into(),
            array_size: 0,
        }
    }

    pub fn array(ty: GlslType, name: impl Into<String>, array_size: u32) -> Self {
        Self {
            ty,
            name: name.into(),
            array_size,
        }
    }
}

// ─── Declarations ────────────────────────────────────────────────────────────

/// A `uniform` block bound through a descriptor set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniformBlock {
    pub set: u32,
    pub binding: u32,
    pub block_name: String,
    pub instance_name: String,
    pub members: Vec<Member>,
}

impl UniformBlock {
    pub fn new(
        set: u32,
        binding: u32,
        block_name: impl Into<String>,
        instance_name: impl Into<String>,
    ) -> Self {
        Self {
            set,
            binding,
            block_name: block_name.into(),
            instance_name: instance_name.into(),
            members: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, ty: GlslType, name: impl Into<String>) -> Self {
        self.members.push(Member::new(ty, name));
        self
    }

    #[must_use]
    pub fn with_array(mut self, ty: GlslType, name: impl Into<String>, size: u32) -> Self {
        self.members.push(Member::array(ty, name, size));
        self
    }

    /// std140 size of the block.
    #[must_use]
    pub fn byte_size(&self) -> u32 {
        Std140Layout::compute(&self.members).size
    }
}

/// A combined image sampler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SamplerDeclaration {
    pub set: u32,
    pub binding: u32,
    pub ty: GlslType,
    pub name: String,
}

impl SamplerDeclaration {
    pub fn new(set: u32, binding: u32, ty: GlslType, name: impl Into<String>) -> Self {
        Self {
            set,
            binding,
            ty,
            name: name.into(),
        }
    }
}

/// The push-constant block. At most one per stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PushConstantBlock {
    pub block_name: String,
    pub instance_name: String,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    #[default]
    Smooth,
    Flat,
}

/// A stage input or output variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StageVariable {
    pub location: u32,
    pub ty: GlslType,
    pub name: String,
    pub interpolation: Interpolation,
}

impl StageVariable {
    pub fn new(location: u32, ty: GlslType, name: impl Into<String>) -> Self {
        let interpolation = if ty.is_integer() {
            Interpolation::Flat
        } else {
            Interpolation::Smooth
        };
        Self {
            location,
            ty,
            name: name.into(),
            interpolation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Declaration {
    UniformBlock(UniformBlock),
    Sampler(SamplerDeclaration),
    PushConstantBlock(PushConstantBlock),
    StageInput(StageVariable),
    StageOutput(StageVariable),
}

impl Declaration {
    /// Descriptor set this declaration is bound to, if any.
    #[must_use]
    pub const fn set(&self) -> Option<u32> {
        match self {
            Self::UniformBlock(block) => Some(block.set),
            Self::Sampler(sampler) => Some(sampler.set),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::UniformBlock(block) => &block.instance_name,
            Self::Sampler(sampler) => &sampler.name,
            Self::PushConstantBlock(block) => &block.instance_name,
            Self::StageInput(var) | Self::StageOutput(var) => &var.name,
        }
    }

    /// Appends the GLSL interface text of this declaration.
    pub fn write_glsl(&self, out: &mut String) -> fmt::Result {
        match self {
            Self::UniformBlock(block) => {
                writeln!(
                    out,
                    "layout(set = {}, binding = {}, std140) uniform {}",
                    block.set, block.binding, block.block_name
                )?;
                write_block_body(out, &block.members, &block.instance_name)
            }
            Self::Sampler(sampler) => writeln!(
                out,
                "layout(set = {}, binding = {}) uniform {} {};",
                sampler.set, sampler.binding, sampler.ty, sampler.name
            ),
            Self::PushConstantBlock(block) => {
                writeln!(out, "layout(push_constant) uniform {}", block.block_name)?;
                write_block_body(out, &block.members, &block.instance_name)
            }
            Self::StageInput(var) => write_stage_variable(out, var, "in"),
            Self::StageOutput(var) => write_stage_variable(out, var, "out"),
        }
    }
}

fn write_block_body(out: &mut String, members: &[Member], instance_name: &str) -> fmt::Result {
    let layout = Std140Layout::compute(members);

    out.push_str("{\n");
    for (member, offset) in members.iter().zip(layout.offsets.iter()) {
        write!(out, "\tlayout(offset = {offset}) {} {}", member.ty, member.name)?;
        if member.array_size > 0 {
            write!(out, "[{}]", member.array_size)?;
        }
        out.push_str(";\n");
    }
    writeln!(out, "}} {instance_name};")
}

fn write_stage_variable(out: &mut String, var: &StageVariable, direction: &str) -> fmt::Result {
    write!(out, "layout(location = {}) ", var.location)?;
    if var.interpolation == Interpolation::Flat {
        out.push_str("flat ");
    }
    writeln!(out, "{direction} {} {};", var.ty, var.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_block_glsl_carries_offsets() {
        let block = UniformBlock::new(1, 0, "Light", "light")
            .with(GlslType::Vec4, "color")
            .with(GlslType::Float, "intensity")
            .with(GlslType::Mat4, "viewProjectionMatrix");

        let mut out = String::new();
        Declaration::UniformBlock(block).write_glsl(&mut out).unwrap();

        assert!(out.starts_with("layout(set = 1, binding = 0, std140) uniform Light\n{\n"));
        assert!(out.contains("\tlayout(offset = 0) vec4 color;\n"));
        assert!(out.contains("\tlayout(offset = 16) float intensity;\n"));
        assert!(out.contains("\tlayout(offset = 32) mat4 viewProjectionMatrix;\n"));
        assert!(out.ends_with("} light;\n"));
    }

    #[test]
    fn test_stage_variables() {
        let mut out = String::new();
        Declaration::StageOutput(StageVariable::new(2, GlslType::Mat3, "ViewTBNMatrix"))
            .write_glsl(&mut out)
            .unwrap();
        Declaration::StageInput(StageVariable::new(5, GlslType::Uint, "vLayer"))
            .write_glsl(&mut out)
            .unwrap();
        assert_eq!(
            out,
            "layout(location = 2) out mat3 ViewTBNMatrix;\nlayout(location = 5) flat in uint vLayer;\n"
        );
    }

    #[test]
    fn test_sampler_dimensions() {
        assert_eq!(
            GlslType::Sampler2DArrayShadow.view_dimension(),
            Some(TextureViewDimension::D2Array)
        );
        assert!(GlslType::Sampler2DShadow.is_comparison());
        assert!(!GlslType::SamplerCube.is_comparison());
        assert_eq!(GlslType::Vec4.view_dimension(), None);
    }
}
