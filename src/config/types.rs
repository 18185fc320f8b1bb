//! Closed-set configuration vocabulary.
//!
//! Every enum in this module is a fixed set decided at design time. Code
//! generation dispatches on them with plain `match` statements, so adding a
//! variant is a compile error everywhere it needs handling.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::push_constants::PushConstantRecipe;

// ─── Render Pass ─────────────────────────────────────────────────────────────

/// The render pass a program is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderPassType {
    /// Ambient, emissive and image-based lighting. No per-light computation.
    Ambient,
    DirectionalNoShadow,
    Directional,
    /// Directional light with cascaded shadow maps.
    DirectionalCSM,
    PointNoShadow,
    Point,
    SpotNoShadow,
    Spot,
    /// Unlit rendering.
    Simple,
    /// Depth-only rendering into a shadow map.
    ShadowCasting,
    /// Debug visualization of the tangent space.
    TBNSpace,
}

impl RenderPassType {
    pub const ALL: [Self; 11] = [
        Self::Ambient,
        Self::DirectionalNoShadow,
        Self::Directional,
        Self::DirectionalCSM,
        Self::PointNoShadow,
        Self::Point,
        Self::SpotNoShadow,
        Self::Spot,
        Self::Simple,
        Self::ShadowCasting,
        Self::TBNSpace,
    ];

    /// The light type whose contribution this pass accumulates.
    #[must_use]
    pub const fn light_type(self) -> LightType {
        match self {
            Self::DirectionalNoShadow | Self::Directional | Self::DirectionalCSM => {
                LightType::Directional
            }
            Self::PointNoShadow | Self::Point => LightType::Point,
            Self::SpotNoShadow | Self::Spot => LightType::Spot,
            Self::Ambient | Self::Simple | Self::ShadowCasting | Self::TBNSpace => LightType::None,
        }
    }

    /// Returns `true` for the per-light additive passes.
    #[inline]
    #[must_use]
    pub const fn is_light_pass(self) -> bool {
        !matches!(self.light_type(), LightType::None)
    }

    /// Returns `true` when the pass samples a shadow map.
    #[inline]
    #[must_use]
    pub const fn is_shadowed(self) -> bool {
        matches!(
            self,
            Self::Directional | Self::DirectionalCSM | Self::Point | Self::Spot
        )
    }

    /// The same light pass without shadow sampling.
    #[must_use]
    pub const fn no_shadow_variant(self) -> Self {
        match self {
            Self::Directional | Self::DirectionalCSM => Self::DirectionalNoShadow,
            Self::Point => Self::PointNoShadow,
            Self::Spot => Self::SpotNoShadow,
            other => other,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ambient => "Ambient",
            Self::DirectionalNoShadow => "DirectionalNoShadow",
            Self::Directional => "Directional",
            Self::DirectionalCSM => "DirectionalCSM",
            Self::PointNoShadow => "PointNoShadow",
            Self::Point => "Point",
            Self::SpotNoShadow => "SpotNoShadow",
            Self::Spot => "Spot",
            Self::Simple => "Simple",
            Self::ShadowCasting => "ShadowCasting",
            Self::TBNSpace => "TBNSpace",
        }
    }
}

impl fmt::Display for RenderPassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Light ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LightType {
    #[default]
    None,
    Directional,
    Point,
    Spot,
}

impl LightType {
    /// The unshadowed pass for this light. `None` maps to the unlit pass.
    #[must_use]
    pub const fn no_shadow_pass(self) -> RenderPassType {
        match self {
            Self::None => RenderPassType::Simple,
            Self::Directional => RenderPassType::DirectionalNoShadow,
            Self::Point => RenderPassType::PointNoShadow,
            Self::Spot => RenderPassType::SpotNoShadow,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Directional => "Directional",
            Self::Point => "Point",
            Self::Spot => "Spot",
        }
    }
}

impl fmt::Display for LightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Shading ─────────────────────────────────────────────────────────────────

/// Lighting evaluation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShadingModel {
    /// Per-vertex diffuse/specular factors, interpolated.
    Gouraud,
    /// Per-fragment Blinn-Phong.
    #[default]
    PhongBlinn,
    /// Per-fragment Cook-Torrance.
    Pbr,
}

impl ShadingModel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gouraud => "Gouraud",
            Self::PhongBlinn => "PhongBlinn",
            Self::Pbr => "PBR",
        }
    }
}

/// How a material wants to be lit. The resolver maps it to a [`ShadingModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaterialShading {
    #[default]
    Standard,
    Physical,
}

// ─── Shadow Filter ───────────────────────────────────────────────────────────

/// Percentage-closer filtering method used when sampling shadow maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShadowFilter {
    /// Single hardware comparison.
    None,
    /// Regular (2R+1)² grid.
    Grid,
    /// Golden-angle spiral with per-fragment rotation.
    #[default]
    VogelDisk,
    /// 16 fixed Poisson samples with per-fragment rotation.
    PoissonDisk,
    /// `textureGather` quads, four comparisons per fetch.
    OptimizedGather,
}

impl ShadowFilter {
    /// Maps a user-facing quality name to a filter.
    ///
    /// Unknown names fall back to [`ShadowFilter::VogelDisk`].
    #[must_use]
    pub fn from_quality_name(name: &str) -> Self {
        match name {
            "Performance" => Self::Grid,
            "Quality" => Self::PoissonDisk,
            "Ultra" => Self::OptimizedGather,
            _ => Self::VogelDisk,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Grid => "grid",
            Self::VogelDisk => "vogel",
            Self::PoissonDisk => "poisson",
            Self::OptimizedGather => "gather",
        }
    }
}

// ─── Instancing ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InstancingMode {
    /// One model matrix, pushed per draw.
    #[default]
    Unique,
    /// Model matrices streamed from a per-instance vertex buffer.
    Multiple,
}

// ─── Capability Flags ────────────────────────────────────────────────────────

bitflags! {
    /// Material features that influence generated code and bindings.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MaterialCaps: u16 {
        const TEXTURE           = 1 << 0;
        const VERTEX_COLOR      = 1 << 1;
        const NORMAL_MAP        = 1 << 2;
        const SPECULAR          = 1 << 3;
        const OPACITY           = 1 << 4;
        const REFLECTION        = 1 << 5;
        const REFRACTION        = 1 << 6;
        const AUTO_ILLUM        = 1 << 7;
        const AMBIENT_OCCLUSION = 1 << 8;
    }
}

impl MaterialCaps {
    /// Capabilities that sample the environment cubemap.
    pub const ENVIRONMENT: Self = Self::REFLECTION.union(Self::REFRACTION);

    /// Capabilities that need texture coordinates.
    pub const TEXTURED: Self = Self::TEXTURE
        .union(Self::NORMAL_MAP)
        .union(Self::OPACITY)
        .union(Self::AUTO_ILLUM)
        .union(Self::AMBIENT_OCCLUSION);
}

bitflags! {
    /// Vertex attributes present in a geometry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GeometryFlags: u8 {
        const NORMALS       = 1 << 0;
        const TANGENTS      = 1 << 1;
        const TEXCOORDS     = 1 << 2;
        const VERTEX_COLORS = 1 << 3;
    }
}

// ─── Render Configuration ────────────────────────────────────────────────────

/// A fully resolved, closed-set description of one program.
///
/// Two equal configurations always synthesize byte-identical shader text
/// and resource layouts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderConfiguration {
    pub render_pass_type: RenderPassType,
    pub light_type: LightType,
    pub shading_model: ShadingModel,
    pub shadow_filter: ShadowFilter,
    pub instancing_mode: InstancingMode,
    /// Layered rendering through `gl_ViewIndex` (cubemaps and cascaded shadow maps).
    pub is_cubemap_multiview: bool,
    pub is_csm: bool,
    pub material_caps: MaterialCaps,
    pub layer_index: u32,
    pub geometry: GeometryFlags,
    pub billboarding: bool,
    pub is_lighting_enabled: bool,
    pub is_depth_test_disabled: bool,
    pub is_depth_write_disabled: bool,
    pub discard_unlit: bool,
    /// Half-width of the PCF kernel in texels.
    pub pcf_kernel_radius: u32,
    pub cascade_count: u32,
}

impl Default for RenderConfiguration {
    fn default() -> Self {
        Self {
            render_pass_type: RenderPassType::Simple,
            light_type: LightType::None,
            shading_model: ShadingModel::PhongBlinn,
            shadow_filter: ShadowFilter::None,
            instancing_mode: InstancingMode::Unique,
            is_cubemap_multiview: false,
            is_csm: false,
            material_caps: MaterialCaps::empty(),
            layer_index: 0,
            geometry: GeometryFlags::NORMALS,
            billboarding: false,
            is_lighting_enabled: true,
            is_depth_test_disabled: false,
            is_depth_write_disabled: false,
            discard_unlit: false,
            pcf_kernel_radius: 1,
            cascade_count: 0,
        }
    }
}

impl RenderConfiguration {
    /// Whether the vertex stage needs the view and model matrices separately
    /// instead of a single combined transform.
    #[must_use]
    pub fn uses_advanced_matrices(&self) -> bool {
        match self.render_pass_type {
            RenderPassType::TBNSpace => true,
            RenderPassType::Ambient => self.material_caps.intersects(MaterialCaps::ENVIRONMENT),
            pass => pass.is_light_pass(),
        }
    }

    /// The push-constant upload recipe for this configuration.
    #[must_use]
    pub fn push_constant_recipe(&self) -> PushConstantRecipe {
        PushConstantRecipe::select(
            self.instancing_mode,
            self.is_cubemap_multiview,
            self.uses_advanced_matrices(),
            self.billboarding,
        )
    }

    /// Whether the material (PerModelLayer) resources are bound.
    #[inline]
    #[must_use]
    pub const fn uses_material(&self) -> bool {
        !matches!(self.render_pass_type, RenderPassType::ShadowCasting)
    }

    /// Human-readable program name, used for logging and pipeline labels.
    #[must_use]
    pub fn program_name(&self) -> String {
        let instancing = match self.instancing_mode {
            InstancingMode::Unique => "Unique",
            InstancingMode::Multiple => "Multiple",
        };

        let mut name = format!(
            "{}.{}.{}",
            self.render_pass_type,
            self.shading_model.as_str(),
            instancing
        );

        if self.render_pass_type.is_shadowed() {
            name.push('.');
            name.push_str(self.shadow_filter.as_str());
        }
        if self.is_cubemap_multiview {
            name.push_str(".multiview");
        }
        format!("{name}.L{}", self.layer_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_shadow_variants() {
        assert_eq!(
            RenderPassType::DirectionalCSM.no_shadow_variant(),
            RenderPassType::DirectionalNoShadow
        );
        assert_eq!(
            RenderPassType::Spot.no_shadow_variant(),
            RenderPassType::SpotNoShadow
        );
        assert_eq!(
            RenderPassType::Ambient.no_shadow_variant(),
            RenderPassType::Ambient
        );
    }

    #[test]
    fn test_light_pass_classification() {
        for pass in RenderPassType::ALL {
            if pass.is_shadowed() {
                assert!(pass.is_light_pass(), "{pass} is shadowed but not a light pass");
            }
        }
        assert!(!RenderPassType::Ambient.is_light_pass());
        assert!(!RenderPassType::ShadowCasting.is_light_pass());
    }

    #[test]
    fn test_quality_names() {
        assert_eq!(ShadowFilter::from_quality_name("Performance"), ShadowFilter::Grid);
        assert_eq!(ShadowFilter::from_quality_name("Quality"), ShadowFilter::PoissonDisk);
        assert_eq!(ShadowFilter::from_quality_name("Ultra"), ShadowFilter::OptimizedGather);
        assert_eq!(ShadowFilter::from_quality_name("whatever"), ShadowFilter::VogelDisk);
    }

    #[test]
    fn test_advanced_matrices() {
        let mut config = RenderConfiguration::default();
        assert!(!config.uses_advanced_matrices());

        config.render_pass_type = RenderPassType::PointNoShadow;
        assert!(config.uses_advanced_matrices());

        config.render_pass_type = RenderPassType::Ambient;
        assert!(!config.uses_advanced_matrices());
        config.material_caps = MaterialCaps::REFLECTION;
        assert!(config.uses_advanced_matrices());
    }
}
