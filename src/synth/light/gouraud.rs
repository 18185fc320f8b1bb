//! Per-vertex Blinn-Phong.
//!
//! The vertex stage computes scalar diffuse and specular factors. The
//! fragment stage only applies colors, textures and shadows.

use super::{LightVectors, SurfaceInputs, light_color, write_attenuation};
use crate::config::{LightType, MaterialCaps, ShadingModel};
use crate::errors::Result;
use crate::layout::GlslType;
use crate::synth::code::Zone;
use crate::synth::context::BuildContext;
use crate::synth::resources;
use crate::synth::shadow::emit_shadow_resolution;
use crate::synth::stage::ShaderStage;
use crate::synth::surface::emit_surface_locals;
use crate::synth::variables::{SynthVariable, require};

const DIFFUSE_FACTOR: &str = "vDiffuseFactor";
const SPECULAR_FACTOR: &str = "vSpecularFactor";

fn vertex_light_vectors(ctx: &BuildContext<'_>, vertex: &mut ShaderStage) -> Result<LightVectors> {
    let light_type = ctx.config.render_pass_type.light_type();
    if light_type == LightType::Directional {
        return Ok(LightVectors {
            direction: require(ctx, vertex, SynthVariable::LightDirectionViewSpace)?,
            ray: None,
            spot: None,
        });
    }

    let ray = require(ctx, vertex, SynthVariable::RayDirectionViewSpace)?;
    let spot = if light_type == LightType::Spot {
        Some(require(ctx, vertex, SynthVariable::SpotDirectionViewSpace)?)
    } else {
        None
    };
    Ok(LightVectors {
        direction: format!("normalize({ray})"),
        ray: Some(ray),
        spot,
    })
}

pub(super) fn emit(
    ctx: &mut BuildContext<'_>,
    vertex: &mut ShaderStage,
    fragment: &mut ShaderStage,
    inputs: &SurfaceInputs<'_>,
) -> Result<()> {
    let specular = inputs.caps.contains(MaterialCaps::SPECULAR);

    // Vertex stage.
    resources::declare_light(ctx, vertex)?;
    let normal = require(ctx, vertex, SynthVariable::NormalViewSpace)?;
    let position = require(ctx, vertex, SynthVariable::PositionViewSpace)?;
    let vectors = vertex_light_vectors(ctx, vertex)?;

    {
        let mut code = vertex.code(Zone::Main);
        code.comment("Gouraud lighting.");
        code.line(format_args!("vec3 N = {normal};"));
        write_attenuation(&mut code, &vectors);
        code.line("float diffuseFactor = max(dot(N, L), 0.0) * lightFactor;");
        if specular {
            code.line(format_args!("vec3 V = normalize(-{position}.xyz);"));
            code.line("vec3 H = normalize(L + V);");
            code.line(format_args!(
                "float specularFactor = diffuseFactor > 0.0 ? pow(max(dot(N, H), 0.0), {}) * lightFactor : 0.0;",
                inputs.surface.shininess_expr()
            ));
        }
    }

    ctx.link(vertex, fragment, GlslType::Float, DIFFUSE_FACTOR);
    vertex
        .code(Zone::Output)
        .line(format_args!("{DIFFUSE_FACTOR} = diffuseFactor;"));
    if specular {
        ctx.link(vertex, fragment, GlslType::Float, SPECULAR_FACTOR);
        vertex
            .code(Zone::Output)
            .line(format_args!("{SPECULAR_FACTOR} = specularFactor;"));
    }

    // Fragment stage.
    let shadowed = emit_shadow_resolution(ctx, vertex, fragment)?;
    resources::declare_light(ctx, fragment)?;

    emit_surface_locals(
        &mut fragment.code(Zone::Main),
        inputs.surface,
        inputs.caps,
        ShadingModel::Gouraud,
    );

    let factors: &[&str] = if shadowed { &["shadowFactor"] } else { &[] };

    let mut code = fragment.code(Zone::Main);
    if ctx.config.discard_unlit {
        code.line(format_args!("if ( {DIFFUSE_FACTOR} <= 0.0 ) {{ discard; }}"));
    }
    code.line(format_args!("vec3 lightColor = {};", light_color(factors)));
    code.line(format_args!(
        "vec3 color = surfaceDiffuse.rgb * {DIFFUSE_FACTOR} * lightColor;"
    ));
    if specular {
        code.line(format_args!(
            "color += surfaceSpecular * {SPECULAR_FACTOR} * lightColor;"
        ));
    }
    code.finish();

    fragment
        .code(Zone::Output)
        .line("outputColor = vec4(color, surfaceOpacity);");

    Ok(())
}
