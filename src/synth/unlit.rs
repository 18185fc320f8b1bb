//! Passes without lighting: unlit color, tangent-space debug output and
//! shadow casting.

use super::code::Zone;
use super::context::BuildContext;
use super::light::SurfaceInputs;
use super::resources::{self, VIEW_INSTANCE};
use super::stage::ShaderStage;
use super::surface::emit_surface_locals;
use super::variables::{SynthVariable, forward_to_fragment};
use crate::config::{GeometryFlags, MaterialCaps};
use crate::errors::{Result, SynthError};

pub fn emit_simple(
    ctx: &BuildContext<'_>,
    fragment: &mut ShaderStage,
    inputs: &SurfaceInputs<'_>,
) {
    emit_surface_locals(
        &mut fragment.code(Zone::Main),
        inputs.surface,
        inputs.caps,
        ctx.config.shading_model,
    );
    fragment
        .code(Zone::Output)
        .line("outputColor = vec4(surfaceDiffuse.rgb, surfaceOpacity);");
}

/// Writes the view-space shading normal remapped to `[0, 1]`.
pub fn emit_tbn_space(
    ctx: &mut BuildContext<'_>,
    vertex: &mut ShaderStage,
    fragment: &mut ShaderStage,
    inputs: &SurfaceInputs<'_>,
) -> Result<()> {
    let required = GeometryFlags::NORMALS | GeometryFlags::TANGENTS;
    if !ctx.config.geometry.contains(required) {
        return Err(SynthError::Synthesis(format!(
            "program '{}' displays the tangent space of a geometry without normals and tangents",
            ctx.config.program_name()
        )));
    }

    let tbn = forward_to_fragment(ctx, vertex, fragment, SynthVariable::ViewTBNMatrix)?;
    let tangent_normal = if inputs.caps.contains(MaterialCaps::NORMAL_MAP) {
        inputs.surface.normal_expr(inputs.material)?
    } else {
        "vec3(0.0, 0.0, 1.0)"
    };

    fragment.code(Zone::Main).line(format_args!(
        "vec3 N = normalize(transpose({tbn}) * ({tangent_normal}));"
    ));
    fragment
        .code(Zone::Output)
        .line("outputColor = vec4(N * 0.5 + 0.5, 1.0);");

    Ok(())
}

/// Depth-only rendering.
///
/// Cubemap targets store the linear distance to the light, normalized by the
/// far plane in `view.viewProperties.w`. Other targets keep the rasterized
/// depth and have an empty fragment body.
pub fn emit_shadow_casting(
    ctx: &mut BuildContext<'_>,
    vertex: &mut ShaderStage,
    fragment: &mut ShaderStage,
) -> Result<()> {
    if !ctx.config.is_cubemap_multiview || ctx.config.is_csm {
        return Ok(());
    }

    let position = forward_to_fragment(ctx, vertex, fragment, SynthVariable::PositionWorldSpace)?;
    resources::declare_view(ctx, fragment)?;

    fragment.code(Zone::Output).line(format_args!(
        "gl_FragDepth = length({position}.xyz - {VIEW_INSTANCE}.worldPosition.xyz) / {VIEW_INSTANCE}.viewProperties.w;"
    ));

    Ok(())
}
