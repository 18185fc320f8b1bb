//! Vertex Buffer Format
//!
//! Attributes live at fixed shader locations and each one is fed from its
//! own buffer. The format of a program lists the buffers its vertex stage
//! actually reads, resolved against what the geometry provides.

use wgpu::VertexStepMode;

use super::declaration::{Declaration, GlslType};
use crate::config::GeometryFlags;
use crate::errors::{Result, SynthError};

/// A vertex attribute with a fixed location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Position,
    Normal,
    Tangent,
    TextureCoordinates,
    VertexColor,
    /// Per-instance model matrix, four consecutive vec4 locations.
    ModelMatrix,
}

impl VertexAttribute {
    pub const ALL: [Self; 6] = [
        Self::Position,
        Self::Normal,
        Self::Tangent,
        Self::TextureCoordinates,
        Self::VertexColor,
        Self::ModelMatrix,
    ];

    /// GLSL name of the attribute input.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Position => "vaPosition",
            Self::Normal => "vaNormal",
            Self::Tangent => "vaTangent",
            Self::TextureCoordinates => "vaTextureCoordinates",
            Self::VertexColor => "vaVertexColor",
            Self::ModelMatrix => "vaModelMatrix",
        }
    }

    #[must_use]
    pub const fn location(self) -> u32 {
        match self {
            Self::Position => 0,
            Self::Normal => 1,
            Self::Tangent => 2,
            Self::TextureCoordinates => 3,
            Self::VertexColor => 4,
            Self::ModelMatrix => 8,
        }
    }

    #[must_use]
    pub const fn ty(self) -> GlslType {
        match self {
            Self::Position | Self::Normal => GlslType::Vec3,
            Self::Tangent | Self::VertexColor => GlslType::Vec4,
            Self::TextureCoordinates => GlslType::Vec2,
            Self::ModelMatrix => GlslType::Mat4,
        }
    }

    #[must_use]
    pub const fn step_mode(self) -> VertexStepMode {
        match self {
            Self::ModelMatrix => VertexStepMode::Instance,
            _ => VertexStepMode::Vertex,
        }
    }

    /// Geometry flag that must be set for the attribute to exist.
    ///
    /// Positions are always present, and the model matrix comes from the
    /// instance buffer rather than the geometry.
    #[must_use]
    pub const fn required_geometry(self) -> Option<GeometryFlags> {
        match self {
            Self::Position | Self::ModelMatrix => None,
            Self::Normal => Some(GeometryFlags::NORMALS),
            Self::Tangent => Some(GeometryFlags::TANGENTS),
            Self::TextureCoordinates => Some(GeometryFlags::TEXCOORDS),
            Self::VertexColor => Some(GeometryFlags::VERTEX_COLORS),
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attribute| attribute.name() == name)
    }

    /// Whether `geometry` can feed this attribute.
    #[inline]
    #[must_use]
    pub fn is_provided_by(self, geometry: GeometryFlags) -> bool {
        self.required_geometry()
            .is_none_or(|flag| geometry.contains(flag))
    }
}

/// One bound vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexBufferLayout {
    pub attribute: VertexAttribute,
    pub array_stride: u64,
    pub step_mode: VertexStepMode,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexBufferLayout {
    #[must_use]
    pub fn for_attribute(attribute: VertexAttribute) -> Self {
        let ty = attribute.ty();
        // `ty` is always a vector or matrix, so the column format exists.
        let format = ty.column_vertex_format().unwrap_or(wgpu::VertexFormat::Float32x4);
        let columns = ty.location_count();
        let column_size = format.size();

        let attributes = (0..columns)
            .map(|column| wgpu::VertexAttribute {
                format,
                offset: u64::from(column) * column_size,
                shader_location: attribute.location() + column,
            })
            .collect();

        Self {
            attribute,
            array_stride: u64::from(columns) * column_size,
            step_mode: attribute.step_mode(),
            attributes,
        }
    }

    #[must_use]
    pub fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }
}

/// The vertex buffers a program reads, in location order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexBufferFormat {
    pub buffers: Vec<VertexBufferLayout>,
}

impl VertexBufferFormat {
    /// Resolves the attribute inputs of a vertex stage against a geometry.
    pub fn resolve(vertex_declarations: &[Declaration], geometry: GeometryFlags) -> Result<Self> {
        let mut buffers = Vec::new();

        for declaration in vertex_declarations {
            let Declaration::StageInput(input) = declaration else {
                continue;
            };
            let attribute = VertexAttribute::from_name(&input.name).ok_or_else(|| {
                SynthError::Synthesis(format!("unknown vertex attribute '{}'", input.name))
            })?;
            if !attribute.is_provided_by(geometry) {
                return Err(SynthError::Synthesis(format!(
                    "vertex stage reads '{}' but the geometry does not provide it",
                    attribute.name()
                )));
            }
            buffers.push(VertexBufferLayout::for_attribute(attribute));
        }

        buffers.sort_by_key(|buffer| buffer.attribute.location());
        Ok(Self { buffers })
    }

    #[must_use]
    pub fn contains(&self, attribute: VertexAttribute) -> bool {
        self.buffers.iter().any(|b| b.attribute == attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::declaration::StageVariable;

    fn input(attribute: VertexAttribute) -> Declaration {
        Declaration::StageInput(StageVariable::new(
            attribute.location(),
            attribute.ty(),
            attribute.name(),
        ))
    }

    #[test]
    fn test_instance_matrix_spans_four_locations() {
        let layout = VertexBufferLayout::for_attribute(VertexAttribute::ModelMatrix);
        assert_eq!(layout.array_stride, 64);
        assert_eq!(layout.step_mode, VertexStepMode::Instance);
        let locations: Vec<u32> = layout.attributes.iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, vec![8, 9, 10, 11]);
        assert_eq!(layout.attributes[3].offset, 48);
    }

    #[test]
    fn test_missing_geometry_attribute_fails() {
        let decls = [input(VertexAttribute::Position), input(VertexAttribute::Tangent)];
        let err = VertexBufferFormat::resolve(&decls, GeometryFlags::NORMALS).unwrap_err();
        assert!(matches!(err, SynthError::Synthesis(_)));
    }

    #[test]
    fn test_resolves_in_location_order() {
        let decls = [
            input(VertexAttribute::TextureCoordinates),
            input(VertexAttribute::Position),
        ];
        let format = VertexBufferFormat::resolve(&decls, GeometryFlags::TEXCOORDS).unwrap();
        assert_eq!(format.buffers.len(), 2);
        assert_eq!(format.buffers[0].attribute, VertexAttribute::Position);
        assert_eq!(format.buffers[1].array_stride, 8);
    }
}
