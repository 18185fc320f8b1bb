//! Per-fragment Cook-Torrance.

use super::{SurfaceInputs, emit_fragment_vectors, light_color};
use crate::config::{LightType, ShadingModel};
use crate::errors::{Result, SynthError};
use crate::synth::chunks::{self, BrdfChunk};
use crate::synth::code::Zone;
use crate::synth::context::BuildContext;
use crate::synth::shadow::emit_shadow_resolution;
use crate::synth::stage::ShaderStage;
use crate::synth::surface::emit_surface_locals;

/// Dielectric reflectance at normal incidence.
pub const DIELECTRIC_F0: f32 = 0.04;

pub(super) fn emit(
    ctx: &mut BuildContext<'_>,
    vertex: &mut ShaderStage,
    fragment: &mut ShaderStage,
    inputs: &SurfaceInputs<'_>,
) -> Result<()> {
    let pass = ctx.config.render_pass_type;
    if pass.is_shadowed() && pass.light_type() == LightType::Point {
        return Err(SynthError::Unsupported(format!(
            "program '{}': PBR shading has no point-light shadow path",
            ctx.config.program_name()
        )));
    }

    let brdf = chunks::render("brdf", &BrdfChunk { with_ibl: false })?;
    fragment.code(Zone::Top).raw(&brdf);

    let shadowed = emit_shadow_resolution(ctx, vertex, fragment)?;

    emit_surface_locals(
        &mut fragment.code(Zone::Main),
        inputs.surface,
        inputs.caps,
        ShadingModel::Pbr,
    );
    emit_fragment_vectors(ctx, vertex, fragment, inputs)?;

    let mut code = fragment.code(Zone::Main);
    code.comment("Cook-Torrance.");
    code.line("vec3 albedo = surfaceDiffuse.rgb;");
    code.line(format_args!(
        "vec3 F0 = mix(vec3({DIELECTRIC_F0:?}), albedo, surfaceMetalness);"
    ));
    code.line("vec3 H = normalize(V + L);");
    code.line("float NdotL = max(dot(N, L), 0.0);");
    code.line("float NdotV = max(dot(N, V), 0.0);");
    code.line("float NDF = distributionGGX(N, H, surfaceRoughness);");
    code.line("float G = geometrySmith(N, V, L, surfaceRoughness);");
    code.line("vec3 F = fresnelSchlick(max(dot(H, V), 0.0), F0);");
    code.line("vec3 specular = (NDF * G * F) / (4.0 * NdotV * NdotL + 0.0001);");
    code.line("vec3 kD = (vec3(1.0) - F) * (1.0 - surfaceMetalness);");
    code.line(format_args!(
        "vec3 radiance = {};",
        light_color(&["lightFactor"])
    ));
    if shadowed {
        code.line("vec3 color = (kD * albedo / PI + specular) * radiance * NdotL * shadowFactor;");
    } else {
        code.line("vec3 color = (kD * albedo / PI + specular) * radiance * NdotL;");
    }
    code.finish();

    fragment
        .code(Zone::Output)
        .line("outputColor = vec4(color, surfaceOpacity);");

    Ok(())
}
