//! Shadow resolution in the fragment stage.
//!
//! Every shadowed light pass ends up with a `float shadowFactor` local in
//! `[0, 1]`. The vertex stage forwards what the lookup needs: the
//! light-space position for 2D maps, the light-to-fragment direction for
//! cube maps, and the world and view-space positions for cascades.
//!
//! Every lookup compares against the fragment depth minus the light's
//! `shadowBias`. Cube maps clamp the bias to at least `0.005`.

use super::chunks::{self, ShadowChunk};
use super::code::Zone;
use super::context::BuildContext;
use super::resources::{self, LIGHT_INSTANCE, SHADOW_MAP};
use super::stage::ShaderStage;
use super::variables::{SynthVariable, forward_to_fragment};
use crate::config::{RenderPassType, ShadowFilter};
use crate::errors::{Result, SynthError};
use crate::shadow::{MAX_CASCADES, pcf_sample_count_2d, pcf_sample_count_cube};

/// Emits the shadow lookup of a shadowed pass. Does nothing otherwise.
///
/// Returns `true` when a `shadowFactor` local was written.
pub fn emit_shadow_resolution(
    ctx: &mut BuildContext<'_>,
    vertex: &mut ShaderStage,
    fragment: &mut ShaderStage,
) -> Result<bool> {
    let pass = ctx.config.render_pass_type;
    if !pass.is_shadowed() {
        return Ok(false);
    }

    resources::declare_light(ctx, fragment)?;
    resources::declare_shadow_map(ctx, fragment)?;

    let filter = ctx.config.shadow_filter;
    let radius = ctx.config.pcf_kernel_radius.max(1);
    let mut chunk = ShadowChunk {
        filter: filter.as_str(),
        radius,
        sample_count: 1,
        gather_offset: radius + 1,
        max_cascades: MAX_CASCADES,
        shadow_map: SHADOW_MAP,
        light: LIGHT_INSTANCE,
        position: "",
        direction: "",
        world_position: "",
        view_position: "",
        discard_unlit: ctx.config.discard_unlit,
    };

    let source = match pass {
        RenderPassType::Directional | RenderPassType::Spot => {
            let position =
                forward_to_fragment(ctx, vertex, fragment, SynthVariable::PositionLightSpace)?;
            chunk.position = &position;
            chunk.sample_count = pcf_sample_count_2d(filter, radius);
            chunks::render("shadow_2d", &chunk)?
        }
        RenderPassType::Point => {
            let direction =
                forward_to_fragment(ctx, vertex, fragment, SynthVariable::DirectionWorldSpace)?;
            chunk.direction = &direction;
            chunk.sample_count = pcf_sample_count_cube(filter, radius);
            chunks::render("shadow_cube", &chunk)?
        }
        RenderPassType::DirectionalCSM => {
            let world =
                forward_to_fragment(ctx, vertex, fragment, SynthVariable::PositionWorldSpace)?;
            let view =
                forward_to_fragment(ctx, vertex, fragment, SynthVariable::PositionViewSpace)?;
            chunk.world_position = &world;
            chunk.view_position = &view;
            // Cascades always filter on the grid kernel.
            chunk.sample_count = pcf_sample_count_2d(
                if filter == ShadowFilter::None {
                    ShadowFilter::None
                } else {
                    ShadowFilter::Grid
                },
                radius,
            );
            chunks::render("shadow_csm", &chunk)?
        }
        other => {
            return Err(SynthError::Synthesis(format!(
                "{other} pass has no shadow resolution"
            )));
        }
    };

    let mut code = fragment.code(Zone::Main);
    code.raw(&source);
    code.blank();
    code.finish();

    Ok(true)
}
