//! Per-view and per-light resource declarations.
//!
//! Member order is the std140 order of the uniform buffers the renderer
//! fills. Changing it changes every offset after the edited member.

use super::context::BuildContext;
use super::stage::ShaderStage;
use crate::config::{LightType, RenderPassType};
use crate::errors::{Result, SynthError};
use crate::layout::{Declaration, GlslType, SamplerDeclaration, SetRole, UniformBlock};
use crate::shadow::MAX_CASCADES;

pub const VIEW_BLOCK: &str = "ViewMatrices";
pub const VIEW_INSTANCE: &str = "view";
pub const LIGHT_BLOCK: &str = "Light";
pub const LIGHT_INSTANCE: &str = "light";
pub const SHADOW_MAP: &str = "shadowMap";
pub const MATERIAL_INSTANCE: &str = "material";

/// Faces rendered by a cubemap multiview pass.
pub const CUBEMAP_FACES: u32 = 6;

/// Shape of the per-view uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewBlockKind {
    Single,
    /// Six faces indexed by `gl_ViewIndex`.
    Cubemap,
    /// One orthographic view per cascade, indexed by `gl_ViewIndex`.
    Cascaded,
}

impl ViewBlockKind {
    #[must_use]
    pub const fn of(ctx: &BuildContext<'_>) -> Self {
        match (ctx.config.is_cubemap_multiview, ctx.config.is_csm) {
            (false, _) => Self::Single,
            (true, false) => Self::Cubemap,
            (true, true) => Self::Cascaded,
        }
    }
}

// ─── View ────────────────────────────────────────────────────────────────────

#[must_use]
pub fn view_block(set: u32, kind: ViewBlockKind) -> UniformBlock {
    let block = UniformBlock::new(set, 0, VIEW_BLOCK, VIEW_INSTANCE);

    match kind {
        ViewBlockKind::Single => block
            .with(GlslType::Mat4, "projectionMatrix")
            .with(GlslType::Vec4, "worldPosition")
            .with(GlslType::Vec4, "viewProperties")
            .with(GlslType::Vec4, "ambientLightColor")
            .with(GlslType::Float, "ambientLightIntensity"),
        ViewBlockKind::Cubemap => block
            .with_array(GlslType::Mat4, "viewMatrices", CUBEMAP_FACES)
            .with_array(GlslType::Mat4, "viewProjectionMatrices", CUBEMAP_FACES)
            .with(GlslType::Mat4, "projectionMatrix")
            .with(GlslType::Vec4, "worldPosition")
            .with(GlslType::Vec4, "viewProperties")
            .with(GlslType::Vec4, "ambientLightColor")
            .with(GlslType::Float, "ambientLightIntensity"),
        ViewBlockKind::Cascaded => block
            .with_array(GlslType::Mat4, "viewProjectionMatrices", MAX_CASCADES)
            .with(GlslType::Vec4, "splitDistances")
            .with(GlslType::Vec4, "worldPosition")
            .with(GlslType::Vec4, "viewProperties"),
    }
}

/// Declares the view block in `stage`.
pub fn declare_view(ctx: &BuildContext<'_>, stage: &mut ShaderStage) -> Result<()> {
    let set = ctx.set(SetRole::PerView)?;
    stage.declare(Declaration::UniformBlock(view_block(set, ViewBlockKind::of(ctx))));
    Ok(())
}

// ─── Light ───────────────────────────────────────────────────────────────────

#[must_use]
pub fn light_block(set: u32, light_type: LightType, shadowed: bool, csm: bool) -> UniformBlock {
    let block = UniformBlock::new(set, 0, LIGHT_BLOCK, LIGHT_INSTANCE);

    if csm {
        return block
            .with_array(GlslType::Mat4, "cascadeViewProjectionMatrices", MAX_CASCADES)
            .with(GlslType::Vec4, "splitDistances")
            .with(GlslType::Vec4, "color")
            .with(GlslType::Vec4, "direction")
            .with(GlslType::Float, "intensity")
            .with(GlslType::Uint, "cascadeCount")
            .with(GlslType::Float, "shadowBias")
            .with(GlslType::Float, "pcfRadius");
    }

    match light_type {
        LightType::Directional => {
            let block = block
                .with(GlslType::Vec4, "color")
                .with(GlslType::Vec4, "direction")
                .with(GlslType::Float, "intensity");
            if shadowed {
                block
                    .with(GlslType::Float, "pcfRadius")
                    .with(GlslType::Float, "shadowBias")
                    .with(GlslType::Mat4, "viewProjectionMatrix")
            } else {
                block
            }
        }
        LightType::Point => {
            let block = block
                .with(GlslType::Vec4, "color")
                .with(GlslType::Vec4, "position")
                .with(GlslType::Float, "intensity")
                .with(GlslType::Float, "radius");
            if shadowed {
                block
                    .with(GlslType::Float, "pcfRadius")
                    .with(GlslType::Float, "shadowBias")
            } else {
                block
            }
        }
        LightType::Spot => {
            let block = block
                .with(GlslType::Vec4, "color")
                .with(GlslType::Vec4, "position")
                .with(GlslType::Vec4, "direction")
                .with(GlslType::Float, "intensity")
                .with(GlslType::Float, "radius")
                .with(GlslType::Float, "innerCosAngle")
                .with(GlslType::Float, "outerCosAngle");
            if shadowed {
                block
                    .with(GlslType::Float, "pcfRadius")
                    .with(GlslType::Float, "shadowBias")
                    .with(GlslType::Mat4, "viewProjectionMatrix")
            } else {
                block
            }
        }
        LightType::None => block,
    }
}

fn light_block_for(ctx: &BuildContext<'_>) -> Result<UniformBlock> {
    let pass = ctx.config.render_pass_type;
    if !pass.is_light_pass() {
        return Err(SynthError::Synthesis(format!(
            "{pass} pass requested light resources"
        )));
    }
    let set = ctx.set(SetRole::PerLight)?;
    Ok(light_block(
        set,
        pass.light_type(),
        pass.is_shadowed(),
        pass == RenderPassType::DirectionalCSM,
    ))
}

/// Declares the light block in `stage`.
pub fn declare_light(ctx: &BuildContext<'_>, stage: &mut ShaderStage) -> Result<()> {
    let block = light_block_for(ctx)?;
    stage.declare(Declaration::UniformBlock(block));
    Ok(())
}

/// Declares the shadow map sampler of a shadowed light pass.
pub fn declare_shadow_map(ctx: &BuildContext<'_>, stage: &mut ShaderStage) -> Result<()> {
    let ty = match ctx.config.render_pass_type {
        RenderPassType::Directional | RenderPassType::Spot => GlslType::Sampler2DShadow,
        RenderPassType::DirectionalCSM => GlslType::Sampler2DArrayShadow,
        RenderPassType::Point => GlslType::SamplerCube,
        pass => {
            return Err(SynthError::Synthesis(format!(
                "{pass} pass has no shadow map"
            )));
        }
    };
    let set = ctx.set(SetRole::PerLight)?;
    stage.declare(Declaration::Sampler(SamplerDeclaration::new(set, 1, ty, SHADOW_MAP)));
    Ok(())
}
