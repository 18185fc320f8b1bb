//! Synthesized shader variables.
//!
//! Each variable has one producer in the vertex stage. Producers pull their
//! own dependencies, so asking for `ViewTBNMatrix` declares the normal and
//! tangent attributes and resolves the model and view matrices first. A
//! variable is computed at most once per stage.

use std::fmt;

use super::code::Zone;
use super::context::BuildContext;
use super::resources::{self, ViewBlockKind, LIGHT_INSTANCE, VIEW_INSTANCE};
use super::stage::ShaderStage;
use crate::config::{InstancingMode, LightType};
use crate::errors::{Result, SynthError};
use crate::layout::{Declaration, GlslType, StageVariable, VertexAttribute};
use crate::push_constants::MatrixSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SynthVariable {
    // Vertex-only sources.
    ModelMatrix,
    ViewMatrix,

    TextureCoordinates,
    VertexColor,
    PositionWorldSpace,
    PositionViewSpace,
    NormalWorldSpace,
    NormalViewSpace,
    /// Transforms view space into tangent space. Takes three locations.
    ViewTBNMatrix,
    PositionLightSpace,
    /// From the light to the vertex, in world space.
    DirectionWorldSpace,
    /// Normalized, from the vertex towards the light.
    LightDirectionViewSpace,
    /// Unnormalized, from the vertex to the light position.
    RayDirectionViewSpace,
    SpotDirectionViewSpace,
    /// From the camera to the vertex, normalized.
    IncidentWorldSpace,
}

impl SynthVariable {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ModelMatrix => "ModelMatrix",
            Self::ViewMatrix => "ViewMatrix",
            Self::TextureCoordinates => "TextureCoordinates",
            Self::VertexColor => "VertexColor",
            Self::PositionWorldSpace => "PositionWorldSpace",
            Self::PositionViewSpace => "PositionViewSpace",
            Self::NormalWorldSpace => "NormalWorldSpace",
            Self::NormalViewSpace => "NormalViewSpace",
            Self::ViewTBNMatrix => "ViewTBNMatrix",
            Self::PositionLightSpace => "PositionLightSpace",
            Self::DirectionWorldSpace => "DirectionWorldSpace",
            Self::LightDirectionViewSpace => "LightDirectionViewSpace",
            Self::RayDirectionViewSpace => "RayDirectionViewSpace",
            Self::SpotDirectionViewSpace => "SpotDirectionViewSpace",
            Self::IncidentWorldSpace => "IncidentWorldSpace",
        }
    }

    #[must_use]
    pub const fn ty(self) -> GlslType {
        match self {
            Self::ModelMatrix | Self::ViewMatrix => GlslType::Mat4,
            Self::TextureCoordinates => GlslType::Vec2,
            Self::VertexColor
            | Self::PositionWorldSpace
            | Self::PositionViewSpace
            | Self::PositionLightSpace => GlslType::Vec4,
            Self::ViewTBNMatrix => GlslType::Mat3,
            Self::NormalWorldSpace
            | Self::NormalViewSpace
            | Self::DirectionWorldSpace
            | Self::LightDirectionViewSpace
            | Self::RayDirectionViewSpace
            | Self::SpotDirectionViewSpace
            | Self::IncidentWorldSpace => GlslType::Vec3,
        }
    }

    /// Whether the variable can be passed to the fragment stage.
    #[inline]
    #[must_use]
    pub const fn is_forwardable(self) -> bool {
        !matches!(self, Self::ModelMatrix | Self::ViewMatrix)
    }

    /// Name of the variable on the fragment side.
    #[must_use]
    pub fn fragment_name(self) -> String {
        format!("v{}", self.name())
    }
}

impl fmt::Display for SynthVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Sources ─────────────────────────────────────────────────────────────────

/// Declares a vertex attribute after checking the geometry provides it.
pub fn declare_attribute(
    ctx: &BuildContext<'_>,
    vertex: &mut ShaderStage,
    attribute: VertexAttribute,
) -> Result<&'static str> {
    let available = match attribute {
        VertexAttribute::ModelMatrix => ctx.config.instancing_mode == InstancingMode::Multiple,
        other => other.is_provided_by(ctx.config.geometry),
    };
    if !available {
        return Err(SynthError::Synthesis(format!(
            "program '{}' needs the '{}' attribute, which is not available",
            ctx.config.program_name(),
            attribute.name()
        )));
    }

    vertex.declare(Declaration::StageInput(StageVariable::new(
        attribute.location(),
        attribute.ty(),
        attribute.name(),
    )));
    Ok(attribute.name())
}

fn model_matrix(ctx: &BuildContext<'_>, vertex: &mut ShaderStage) -> Result<String> {
    match ctx.config.instancing_mode {
        InstancingMode::Multiple => {
            declare_attribute(ctx, vertex, VertexAttribute::ModelMatrix).map(str::to_string)
        }
        InstancingMode::Unique if ctx.recipe.has(MatrixSlot::Model) => Ok(MatrixSlot::Model.glsl()),
        InstancingMode::Unique => Err(SynthError::Synthesis(format!(
            "program '{}' has no model matrix source with the {:?} recipe",
            ctx.config.program_name(),
            ctx.recipe
        ))),
    }
}

fn view_matrix(ctx: &BuildContext<'_>, vertex: &mut ShaderStage) -> Result<String> {
    match ViewBlockKind::of(ctx) {
        ViewBlockKind::Cubemap => {
            resources::declare_view(ctx, vertex)?;
            Ok(format!("{VIEW_INSTANCE}.viewMatrices[gl_ViewIndex]"))
        }
        ViewBlockKind::Cascaded => Err(SynthError::Synthesis(format!(
            "program '{}' renders cascades, which have no separate view matrix",
            ctx.config.program_name()
        ))),
        ViewBlockKind::Single if ctx.recipe.has(MatrixSlot::View) => Ok(MatrixSlot::View.glsl()),
        ViewBlockKind::Single => Err(SynthError::Synthesis(format!(
            "program '{}' has no view matrix source with the {:?} recipe",
            ctx.config.program_name(),
            ctx.recipe
        ))),
    }
}

// ─── Producers ───────────────────────────────────────────────────────────────

/// Computes `variable` in the vertex stage and returns the expression that
/// holds it there.
pub fn require(
    ctx: &BuildContext<'_>,
    vertex: &mut ShaderStage,
    variable: SynthVariable,
) -> Result<String> {
    match variable {
        SynthVariable::ModelMatrix => return model_matrix(ctx, vertex),
        SynthVariable::ViewMatrix => return view_matrix(ctx, vertex),
        _ => {}
    }

    if vertex.is_computed(variable) {
        return Ok(variable.name().to_string());
    }

    let expression = produce(ctx, vertex, variable)?;
    vertex
        .code(Zone::Main)
        .line(format_args!("{} {} = {expression};", variable.ty(), variable.name()));
    vertex.mark_computed(variable);

    Ok(variable.name().to_string())
}

/// Writes any preliminary statements and returns the initializer of `variable`.
fn produce(
    ctx: &BuildContext<'_>,
    vertex: &mut ShaderStage,
    variable: SynthVariable,
) -> Result<String> {
    use SynthVariable as V;

    let expression = match variable {
        V::ModelMatrix => model_matrix(ctx, vertex)?,
        V::ViewMatrix => view_matrix(ctx, vertex)?,
        V::TextureCoordinates => {
            declare_attribute(ctx, vertex, VertexAttribute::TextureCoordinates)?.to_string()
        }
        V::VertexColor => declare_attribute(ctx, vertex, VertexAttribute::VertexColor)?.to_string(),
        V::PositionWorldSpace => {
            let position = declare_attribute(ctx, vertex, VertexAttribute::Position)?;
            let model = model_matrix(ctx, vertex)?;
            format!("{model} * vec4({position}, 1.0)")
        }
        V::PositionViewSpace => {
            let world = require(ctx, vertex, V::PositionWorldSpace)?;
            let view = view_matrix(ctx, vertex)?;
            format!("{view} * {world}")
        }
        V::NormalWorldSpace => {
            let normal = declare_attribute(ctx, vertex, VertexAttribute::Normal)?;
            let model = model_matrix(ctx, vertex)?;
            format!("normalize(mat3({model}) * {normal})")
        }
        V::NormalViewSpace => {
            let normal = declare_attribute(ctx, vertex, VertexAttribute::Normal)?;
            let model = model_matrix(ctx, vertex)?;
            let view = view_matrix(ctx, vertex)?;
            format!("normalize(mat3({view} * {model}) * {normal})")
        }
        V::ViewTBNMatrix => {
            let normal = declare_attribute(ctx, vertex, VertexAttribute::Normal)?;
            let tangent = declare_attribute(ctx, vertex, VertexAttribute::Tangent)?;
            let model = model_matrix(ctx, vertex)?;
            let view = view_matrix(ctx, vertex)?;

            let mut code = vertex.code(Zone::Main);
            code.line(format_args!("mat3 tbnNormalMatrix = mat3({view} * {model});"));
            code.line(format_args!("vec3 tbnTangent = normalize(tbnNormalMatrix * {tangent}.xyz);"));
            code.line(format_args!("vec3 tbnNormal = normalize(tbnNormalMatrix * {normal});"));
            code.line(format_args!("vec3 tbnBinormal = cross(tbnNormal, tbnTangent) * {tangent}.w;"));
            code.finish();

            "transpose(mat3(tbnTangent, tbnBinormal, tbnNormal))".to_string()
        }
        V::PositionLightSpace => {
            resources::declare_light(ctx, vertex)?;
            let world = require(ctx, vertex, V::PositionWorldSpace)?;
            format!("{LIGHT_INSTANCE}.viewProjectionMatrix * {world}")
        }
        V::DirectionWorldSpace => {
            resources::declare_light(ctx, vertex)?;
            let world = require(ctx, vertex, V::PositionWorldSpace)?;
            format!("{world}.xyz - {LIGHT_INSTANCE}.position.xyz")
        }
        V::RayDirectionViewSpace => {
            resources::declare_light(ctx, vertex)?;
            let position = require(ctx, vertex, V::PositionViewSpace)?;
            let view = view_matrix(ctx, vertex)?;
            format!("({view} * vec4({LIGHT_INSTANCE}.position.xyz, 1.0)).xyz - {position}.xyz")
        }
        V::LightDirectionViewSpace => {
            resources::declare_light(ctx, vertex)?;
            if ctx.config.light_type == LightType::Directional {
                let view = view_matrix(ctx, vertex)?;
                format!("normalize(mat3({view}) * -{LIGHT_INSTANCE}.direction.xyz)")
            } else {
                let ray = require(ctx, vertex, V::RayDirectionViewSpace)?;
                format!("normalize({ray})")
            }
        }
        V::SpotDirectionViewSpace => {
            resources::declare_light(ctx, vertex)?;
            let view = view_matrix(ctx, vertex)?;
            format!("normalize(mat3({view}) * {LIGHT_INSTANCE}.direction.xyz)")
        }
        V::IncidentWorldSpace => {
            resources::declare_view(ctx, vertex)?;
            let world = require(ctx, vertex, V::PositionWorldSpace)?;
            format!("normalize({world}.xyz - {VIEW_INSTANCE}.worldPosition.xyz)")
        }
    };

    Ok(expression)
}

/// Makes `variable` available to the fragment stage and returns its
/// fragment-side name.
///
/// Locations are allocated the first time a variable is forwarded.
pub fn forward_to_fragment(
    ctx: &mut BuildContext<'_>,
    vertex: &mut ShaderStage,
    fragment: &mut ShaderStage,
    variable: SynthVariable,
) -> Result<String> {
    if !variable.is_forwardable() {
        return Err(SynthError::Synthesis(format!(
            "{variable} only exists in the vertex stage"
        )));
    }

    let fragment_name = variable.fragment_name();
    if fragment.is_declared(&fragment_name) {
        return Ok(fragment_name);
    }

    let local = require(ctx, vertex, variable)?;
    ctx.link(vertex, fragment, variable.ty(), &fragment_name);
    vertex
        .code(Zone::Output)
        .line(format_args!("{fragment_name} = {local};"));

    Ok(fragment_name)
}
