//! Ambient pass.
//!
//! Writes the base color every light pass adds onto: ambient light,
//! environment reflection and refraction, image-based lighting for PBR,
//! emission and ambient occlusion. Never reads the per-light block.

use super::SurfaceInputs;
use super::pbr::DIELECTRIC_F0;
use crate::config::{MaterialCaps, ShadingModel};
use crate::errors::Result;
use crate::synth::chunks::{self, BrdfChunk};
use crate::synth::code::Zone;
use crate::synth::context::BuildContext;
use crate::synth::resources::{self, VIEW_INSTANCE};
use crate::synth::stage::ShaderStage;
use crate::synth::surface::emit_surface_locals;
use crate::synth::variables::{SynthVariable, forward_to_fragment};

pub fn emit(
    ctx: &mut BuildContext<'_>,
    vertex: &mut ShaderStage,
    fragment: &mut ShaderStage,
    inputs: &SurfaceInputs<'_>,
) -> Result<()> {
    let caps = inputs.caps;
    let shading = ctx.config.shading_model;
    let environment = caps.intersects(MaterialCaps::ENVIRONMENT);

    resources::declare_view(ctx, fragment)?;

    let env_vectors = if environment {
        let normal = forward_to_fragment(ctx, vertex, fragment, SynthVariable::NormalWorldSpace)?;
        let incident =
            forward_to_fragment(ctx, vertex, fragment, SynthVariable::IncidentWorldSpace)?;
        let sampler = inputs.surface.environment_sampler(inputs.material)?;
        Some((normal, incident, sampler))
    } else {
        None
    };

    if shading == ShadingModel::Pbr && environment {
        let brdf = chunks::render("brdf", &BrdfChunk { with_ibl: true })?;
        fragment.code(Zone::Top).raw(&brdf);
    }

    emit_surface_locals(&mut fragment.code(Zone::Main), inputs.surface, caps, shading);

    let surface = inputs.surface;
    let mut code = fragment.code(Zone::Main);
    code.comment("Ambient.");
    code.line(format_args!(
        "vec3 color = ({}) * {VIEW_INSTANCE}.ambientLightColor.rgb * {VIEW_INSTANCE}.ambientLightIntensity;",
        surface.ambient_expr()
    ));

    if let Some((normal, incident, sampler)) = &env_vectors {
        code.line(format_args!("vec3 envNormal = normalize({normal});"));
        code.line(format_args!("vec3 envIncident = normalize({incident});"));

        if shading == ShadingModel::Pbr {
            code.comment("Image-based lighting.");
            code.line(format_args!(
                "vec3 iblF0 = mix(vec3({DIELECTRIC_F0:?}), surfaceDiffuse.rgb, surfaceMetalness);"
            ));
            code.line("float iblNdotV = max(dot(envNormal, -envIncident), 0.0);");
            code.line("vec3 iblF = fresnelSchlickRoughness(iblNdotV, iblF0, surfaceRoughness);");
            code.line("vec3 iblKD = (vec3(1.0) - iblF) * (1.0 - surfaceMetalness);");
            code.line(format_args!(
                "float maxLod = float(textureQueryLevels({sampler}) - 1);"
            ));
            code.line(format_args!(
                "vec3 irradiance = textureLod({sampler}, envNormal, maxLod).rgb;"
            ));
            code.line(format_args!(
                "vec3 prefiltered = textureLod({sampler}, reflect(envIncident, envNormal), surfaceRoughness * maxLod).rgb;"
            ));
            code.line(format_args!(
                "color += (iblKD * irradiance * surfaceDiffuse.rgb + prefiltered * iblF) * {};",
                surface.ibl_intensity_expr()
            ));
        } else {
            if caps.contains(MaterialCaps::REFLECTION) {
                code.line(format_args!(
                    "vec3 reflected = texture({sampler}, reflect(envIncident, envNormal)).rgb;"
                ));
                code.line(format_args!(
                    "color = mix(color, reflected, {});",
                    surface.reflection_amount_expr()
                ));
            }
            if caps.contains(MaterialCaps::REFRACTION) {
                code.line(format_args!(
                    "vec3 refracted = texture({sampler}, refract(envIncident, envNormal, 1.0 / {})).rgb;",
                    surface.refraction_ior_expr()
                ));
                code.line(format_args!(
                    "color = mix(color, refracted, {});",
                    surface.refraction_amount_expr()
                ));
            }
        }
    }

    if caps.contains(MaterialCaps::AUTO_ILLUM) {
        let emission = surface.auto_illum.as_deref().unwrap_or("surfaceDiffuse.rgb");
        code.line(format_args!("color += {emission};"));
    }

    if caps.contains(MaterialCaps::AMBIENT_OCCLUSION) {
        let occlusion = surface.ambient_occlusion.as_deref().unwrap_or("1.0");
        code.line(format_args!(
            "color *= mix(1.0, {occlusion}, {});",
            surface.ambient_occlusion_intensity_expr()
        ));
    }
    code.finish();

    fragment
        .code(Zone::Output)
        .line("outputColor = vec4(color, surfaceOpacity);");

    Ok(())
}
