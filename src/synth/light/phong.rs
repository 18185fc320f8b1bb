//! Per-fragment Blinn-Phong.

use super::{SurfaceInputs, emit_fragment_vectors, light_color};
use crate::config::{MaterialCaps, ShadingModel};
use crate::errors::Result;
use crate::synth::code::Zone;
use crate::synth::context::BuildContext;
use crate::synth::shadow::emit_shadow_resolution;
use crate::synth::stage::ShaderStage;
use crate::synth::surface::emit_surface_locals;

pub(super) fn emit(
    ctx: &mut BuildContext<'_>,
    vertex: &mut ShaderStage,
    fragment: &mut ShaderStage,
    inputs: &SurfaceInputs<'_>,
) -> Result<()> {
    let shadowed = emit_shadow_resolution(ctx, vertex, fragment)?;

    emit_surface_locals(
        &mut fragment.code(Zone::Main),
        inputs.surface,
        inputs.caps,
        ShadingModel::PhongBlinn,
    );
    emit_fragment_vectors(ctx, vertex, fragment, inputs)?;

    let factors: &[&str] = if shadowed {
        &["lightFactor", "shadowFactor"]
    } else {
        &["lightFactor"]
    };

    let mut code = fragment.code(Zone::Main);
    code.comment("Blinn-Phong.");
    code.line(format_args!("vec3 lightColor = {};", light_color(factors)));
    code.line("float NdotL = max(dot(N, L), 0.0);");
    code.line("vec3 color = surfaceDiffuse.rgb * NdotL * lightColor;");
    if inputs.caps.contains(MaterialCaps::SPECULAR) {
        code.line("vec3 H = normalize(L + V);");
        code.line(
            "float specularFactor = NdotL > 0.0 ? pow(max(dot(N, H), 0.0), surfaceShininess) : 0.0;",
        );
        code.line("color += surfaceSpecular * specularFactor * lightColor;");
    }
    code.finish();

    fragment
        .code(Zone::Output)
        .line("outputColor = vec4(color, surfaceOpacity);");

    Ok(())
}
