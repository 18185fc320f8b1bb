//! Lighting Code
//!
//! One module per [`ShadingModel`], plus the ambient pass. Light passes are
//! additive: each program evaluates a single light and writes its
//! contribution to `outputColor`.
//!
//! Fragment-side light passes share the same prologue:
//!
//! | Local         | Meaning                                           |
//! |---------------|---------------------------------------------------|
//! | `shadowFactor`| Shadow visibility, only in shadowed passes        |
//! | `N`           | Shading normal in view space                      |
//! | `V`           | Direction towards the camera                      |
//! | `L`           | Direction towards the light                       |
//! | `lightFactor` | Distance attenuation and spot cone                |

pub mod ambient;
mod gouraud;
mod pbr;
mod phong;

use super::code::{Code, Zone};
use super::context::BuildContext;
use super::resources::{self, LIGHT_INSTANCE};
use super::stage::ShaderStage;
use super::surface::SurfaceDescription;
use super::variables::{SynthVariable, forward_to_fragment};
use crate::config::{LightType, MaterialCaps, ShadingModel};
use crate::errors::Result;

/// What the lighting code knows about the material being lit.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceInputs<'a> {
    /// Material name, for error messages.
    pub material: &'a str,
    pub surface: &'a SurfaceDescription,
    /// Resolved capabilities. May differ from the material's own.
    pub caps: MaterialCaps,
}

/// Emits a per-light pass with the configured shading model.
pub fn emit_light_pass(
    ctx: &mut BuildContext<'_>,
    vertex: &mut ShaderStage,
    fragment: &mut ShaderStage,
    inputs: &SurfaceInputs<'_>,
) -> Result<()> {
    match ctx.config.shading_model {
        ShadingModel::Gouraud => gouraud::emit(ctx, vertex, fragment, inputs),
        ShadingModel::PhongBlinn => phong::emit(ctx, vertex, fragment, inputs),
        ShadingModel::Pbr => pbr::emit(ctx, vertex, fragment, inputs),
    }
}

/// Forwards the per-vertex inputs surface expressions may read.
pub fn forward_surface_inputs(
    ctx: &mut BuildContext<'_>,
    vertex: &mut ShaderStage,
    fragment: &mut ShaderStage,
    caps: MaterialCaps,
) -> Result<()> {
    if caps.intersects(MaterialCaps::TEXTURED) {
        forward_to_fragment(ctx, vertex, fragment, SynthVariable::TextureCoordinates)?;
    }
    if caps.contains(MaterialCaps::VERTEX_COLOR) {
        forward_to_fragment(ctx, vertex, fragment, SynthVariable::VertexColor)?;
    }
    Ok(())
}

/// Light direction and attenuation sources in one stage.
struct LightVectors {
    /// Expression of the normalized direction towards the light.
    direction: String,
    /// Unnormalized vector to the light, for point and spot lights.
    ray: Option<String>,
    /// Spot axis, for spot lights.
    spot: Option<String>,
}

/// Writes `L` and `lightFactor`.
fn write_attenuation(code: &mut Code<'_>, vectors: &LightVectors) {
    code.line(format_args!("vec3 L = {};", vectors.direction));
    code.line("float lightFactor = 1.0;");

    if let Some(ray) = &vectors.ray {
        code.line(format_args!("vec3 DR = {ray} / {LIGHT_INSTANCE}.radius;"));
        code.line("lightFactor = max(1.0 - dot(DR, DR), 0.0);");
    }

    if let Some(spot) = &vectors.spot {
        code.line(format_args!("float theta = dot(-L, normalize({spot}));"));
        code.line(format_args!(
            "lightFactor *= clamp((theta - {LIGHT_INSTANCE}.outerCosAngle) / ({LIGHT_INSTANCE}.innerCosAngle - {LIGHT_INSTANCE}.outerCosAngle), 0.0, 1.0);"
        ));
    }
}

/// `light.color.rgb * light.intensity`, optionally scaled.
fn light_color(factors: &[&str]) -> String {
    let mut expression = format!("{LIGHT_INSTANCE}.color.rgb * {LIGHT_INSTANCE}.intensity");
    for factor in factors {
        expression.push_str(" * ");
        expression.push_str(factor);
    }
    expression
}

/// Emits the per-fragment prologue: `N`, `V`, `L` and `lightFactor`.
fn emit_fragment_vectors(
    ctx: &mut BuildContext<'_>,
    vertex: &mut ShaderStage,
    fragment: &mut ShaderStage,
    inputs: &SurfaceInputs<'_>,
) -> Result<()> {
    let normal = if inputs.caps.contains(MaterialCaps::NORMAL_MAP) {
        let tbn = forward_to_fragment(ctx, vertex, fragment, SynthVariable::ViewTBNMatrix)?;
        let tangent_normal = inputs.surface.normal_expr(inputs.material)?;
        format!("normalize(transpose({tbn}) * ({tangent_normal}))")
    } else {
        let normal = forward_to_fragment(ctx, vertex, fragment, SynthVariable::NormalViewSpace)?;
        format!("normalize({normal})")
    };
    let position = forward_to_fragment(ctx, vertex, fragment, SynthVariable::PositionViewSpace)?;

    let light_type = ctx.config.render_pass_type.light_type();
    let vectors = match light_type {
        LightType::Directional => {
            let direction =
                forward_to_fragment(ctx, vertex, fragment, SynthVariable::LightDirectionViewSpace)?;
            LightVectors {
                direction: format!("normalize({direction})"),
                ray: None,
                spot: None,
            }
        }
        LightType::Point | LightType::Spot | LightType::None => {
            let ray =
                forward_to_fragment(ctx, vertex, fragment, SynthVariable::RayDirectionViewSpace)?;
            let spot = if light_type == LightType::Spot {
                Some(forward_to_fragment(
                    ctx,
                    vertex,
                    fragment,
                    SynthVariable::SpotDirectionViewSpace,
                )?)
            } else {
                None
            };
            LightVectors {
                direction: format!("normalize({ray})"),
                ray: Some(ray),
                spot,
            }
        }
    };
    resources::declare_light(ctx, fragment)?;

    let mut code = fragment.code(Zone::Main);
    code.comment("Lighting vectors.");
    code.line(format_args!("vec3 N = {normal};"));
    code.line(format_args!("vec3 V = normalize(-{position}.xyz);"));
    write_attenuation(&mut code, &vectors);
    if ctx.config.discard_unlit {
        code.line("if ( lightFactor <= 0.0 ) { discard; }");
    }
    code.blank();
    code.finish();

    Ok(())
}
