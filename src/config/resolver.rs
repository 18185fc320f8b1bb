//! Configuration Resolver
//!
//! Turns what a renderable wants to do this frame ([`RenderIntent`]) into the
//! closed-set [`RenderConfiguration`] a program is synthesized from.
//!
//! # Rules
//!
//! - Without an explicit pass, the pass follows the light. Static lights and
//!   lights that cast no shadow use their `NoShadow` pass.
//! - Point and spot lights never use cascades. Asking for it is an error,
//!   not a silent downgrade.
//! - Disabled shadow maps turn every shadowed pass into its `NoShadow`
//!   variant.
//! - Standard materials are lit with Blinn-Phong, or Gouraud in low quality.
//!   Physical materials use PBR, which has no point-light shadow path.

use log::debug;

use super::types::{
    GeometryFlags, InstancingMode, LightType, MaterialCaps, MaterialShading, RenderConfiguration,
    RenderPassType, ShadingModel, ShadowFilter,
};
use crate::errors::{Result, SynthError};
use crate::interfaces::{MaterialInterface, RenderTargetInterface};
use crate::settings::SynthSettings;

/// What the resolver needs to know about a light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LightDescriptor {
    pub light_type: LightType,
    pub casts_shadows: bool,
    /// Baked into lightmaps, never shadowed at runtime.
    pub is_static: bool,
    /// Cascaded shadow maps. Directional lights only.
    pub use_csm: bool,
}

impl LightDescriptor {
    #[must_use]
    pub const fn new(light_type: LightType) -> Self {
        Self {
            light_type,
            casts_shadows: false,
            is_static: false,
            use_csm: false,
        }
    }

    #[must_use]
    pub const fn with_shadows(mut self) -> Self {
        self.casts_shadows = true;
        self
    }

    #[must_use]
    pub const fn with_csm(mut self) -> Self {
        self.casts_shadows = true;
        self.use_csm = true;
        self
    }

    #[must_use]
    pub const fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.use_csm && self.light_type != LightType::Directional {
            return Err(SynthError::InvalidConfiguration(format!(
                "{} lights cannot use cascaded shadow maps",
                self.light_type
            )));
        }
        Ok(())
    }

    /// The pass this light renders with.
    #[must_use]
    pub const fn pass(&self, dynamic_lighting: bool) -> RenderPassType {
        if self.is_static || !dynamic_lighting || !self.casts_shadows {
            return self.light_type.no_shadow_pass();
        }
        match self.light_type {
            LightType::None => RenderPassType::Simple,
            LightType::Directional if self.use_csm => RenderPassType::DirectionalCSM,
            LightType::Directional => RenderPassType::Directional,
            LightType::Point => RenderPassType::Point,
            LightType::Spot => RenderPassType::Spot,
        }
    }
}

/// Shape of the render target a program draws into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TargetShape {
    pub is_cubemap: bool,
    /// Layered depth target, one layer per cascade.
    pub is_cascaded: bool,
}

impl TargetShape {
    #[must_use]
    pub fn of(target: &dyn RenderTargetInterface) -> Self {
        Self {
            is_cubemap: target.is_cubemap(),
            is_cascaded: target.is_cascaded_shadow_map(),
        }
    }
}

/// A renderable's request for one program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderIntent {
    /// Forces a pass. `None` derives it from `light`.
    pub render_pass: Option<RenderPassType>,
    pub light: Option<LightDescriptor>,
    /// When `false`, lights are treated as static.
    pub dynamic_lighting: bool,
    pub material_shading: MaterialShading,
    pub material_caps: MaterialCaps,
    pub geometry: GeometryFlags,
    pub instancing_mode: InstancingMode,
    pub target: TargetShape,
    pub layer_index: u32,
    pub billboarding: bool,
    pub is_lighting_enabled: bool,
    pub is_depth_test_disabled: bool,
    pub is_depth_write_disabled: bool,
}

impl Default for RenderIntent {
    fn default() -> Self {
        Self {
            render_pass: None,
            light: None,
            dynamic_lighting: true,
            material_shading: MaterialShading::Standard,
            material_caps: MaterialCaps::empty(),
            geometry: GeometryFlags::NORMALS,
            instancing_mode: InstancingMode::Unique,
            target: TargetShape::default(),
            layer_index: 0,
            billboarding: false,
            is_lighting_enabled: true,
            is_depth_test_disabled: false,
            is_depth_write_disabled: false,
        }
    }
}

impl RenderIntent {
    /// An intent for `pass`, with the material's shading and capabilities.
    #[must_use]
    pub fn for_material(pass: Option<RenderPassType>, material: &dyn MaterialInterface) -> Self {
        Self {
            render_pass: pass,
            material_shading: material.shading(),
            material_caps: material.caps(),
            ..Default::default()
        }
    }
}

fn resolve_pass(intent: &RenderIntent) -> Result<RenderPassType> {
    if let Some(light) = &intent.light {
        light.validate()?;
    }

    match (intent.render_pass, intent.light) {
        (Some(pass), light) if pass.is_light_pass() => {
            let Some(light) = light else {
                return Err(SynthError::InvalidConfiguration(format!(
                    "{pass} pass requested without a light"
                )));
            };
            if light.light_type != pass.light_type() {
                return Err(SynthError::InvalidConfiguration(format!(
                    "{pass} pass requested for a {} light",
                    light.light_type
                )));
            }
            Ok(pass)
        }
        (Some(pass), _) => Ok(pass),
        (None, Some(light)) if intent.is_lighting_enabled => Ok(light.pass(intent.dynamic_lighting)),
        (None, _) => Ok(RenderPassType::Simple),
    }
}

fn shading_model_for(shading: MaterialShading, settings: &SynthSettings) -> ShadingModel {
    match shading {
        MaterialShading::Standard if settings.high_quality_lighting => ShadingModel::PhongBlinn,
        MaterialShading::Standard => ShadingModel::Gouraud,
        MaterialShading::Physical => ShadingModel::Pbr,
    }
}

/// Resolves `intent` into a concrete configuration.
pub fn resolve(intent: &RenderIntent, settings: &SynthSettings) -> Result<RenderConfiguration> {
    let mut pass = resolve_pass(intent)?;

    if pass.is_shadowed() && !settings.shadow_maps_enabled {
        let downgraded = pass.no_shadow_variant();
        debug!("Shadow maps disabled: {pass} resolved to {downgraded}");
        pass = downgraded;
    }

    if intent.target.is_cascaded && pass != RenderPassType::ShadowCasting {
        return Err(SynthError::InvalidConfiguration(format!(
            "{pass} pass cannot render into a cascaded shadow map"
        )));
    }

    let shading_model = shading_model_for(intent.material_shading, settings);
    if shading_model == ShadingModel::Pbr && pass == RenderPassType::Point {
        return Err(SynthError::Unsupported(
            "PBR shading with point-light shadows".to_string(),
        ));
    }

    let mut material_caps = intent.material_caps;
    if shading_model == ShadingModel::Gouraud || !settings.normal_mapping_enabled {
        material_caps.remove(MaterialCaps::NORMAL_MAP);
    }

    let is_csm = pass == RenderPassType::DirectionalCSM
        || (pass == RenderPassType::ShadowCasting && intent.target.is_cascaded);

    let config = RenderConfiguration {
        render_pass_type: pass,
        light_type: pass.light_type(),
        shading_model,
        shadow_filter: if pass.is_shadowed() {
            settings.shadow_filter
        } else {
            ShadowFilter::None
        },
        instancing_mode: intent.instancing_mode,
        is_cubemap_multiview: intent.target.is_cubemap || intent.target.is_cascaded,
        is_csm,
        material_caps,
        layer_index: intent.layer_index,
        geometry: intent.geometry,
        billboarding: intent.billboarding,
        is_lighting_enabled: intent.is_lighting_enabled,
        is_depth_test_disabled: intent.is_depth_test_disabled,
        is_depth_write_disabled: intent.is_depth_write_disabled,
        discard_unlit: settings.discard_unlit_fragments,
        pcf_kernel_radius: settings.pcf_kernel_radius.max(1),
        cascade_count: if is_csm {
            settings.effective_cascade_count()
        } else {
            0
        },
    };

    debug!("Resolved render configuration '{}'", config.program_name());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(light: LightDescriptor) -> RenderIntent {
        RenderIntent {
            light: Some(light),
            ..Default::default()
        }
    }

    #[test]
    fn test_pass_follows_light() {
        let settings = SynthSettings::default();
        let cases = [
            (LightDescriptor::new(LightType::Directional), RenderPassType::DirectionalNoShadow),
            (LightDescriptor::new(LightType::Directional).with_shadows(), RenderPassType::Directional),
            (LightDescriptor::new(LightType::Directional).with_csm(), RenderPassType::DirectionalCSM),
            (LightDescriptor::new(LightType::Point).with_shadows(), RenderPassType::Point),
            (LightDescriptor::new(LightType::Spot).with_shadows().as_static(), RenderPassType::SpotNoShadow),
        ];
        for (light, expected) in cases {
            let config = resolve(&lit(light), &settings).unwrap();
            assert_eq!(config.render_pass_type, expected, "{light:?}");
            assert_eq!(config.light_type, light.light_type);
        }
    }

    #[test]
    fn test_inactive_dynamic_lighting_drops_shadows() {
        let intent = RenderIntent {
            dynamic_lighting: false,
            ..lit(LightDescriptor::new(LightType::Point).with_shadows())
        };
        let config = resolve(&intent, &SynthSettings::default()).unwrap();
        assert_eq!(config.render_pass_type, RenderPassType::PointNoShadow);
        assert_eq!(config.shadow_filter, ShadowFilter::None);
    }

    #[test]
    fn test_no_light_is_simple() {
        let config = resolve(&RenderIntent::default(), &SynthSettings::default()).unwrap();
        assert_eq!(config.render_pass_type, RenderPassType::Simple);
        assert_eq!(config.light_type, LightType::None);
    }

    #[test]
    fn test_spot_csm_is_rejected() {
        let light = LightDescriptor {
            light_type: LightType::Spot,
            casts_shadows: true,
            is_static: false,
            use_csm: true,
        };
        let err = resolve(&lit(light), &SynthSettings::default()).unwrap_err();
        assert!(matches!(err, SynthError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_explicit_pass_must_match_light() {
        let intent = RenderIntent {
            render_pass: Some(RenderPassType::SpotNoShadow),
            ..lit(LightDescriptor::new(LightType::Point))
        };
        let err = resolve(&intent, &SynthSettings::default()).unwrap_err();
        assert!(matches!(err, SynthError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_shadow_maps_disabled() {
        let settings = SynthSettings {
            shadow_maps_enabled: false,
            ..Default::default()
        };
        let config = resolve(&lit(LightDescriptor::new(LightType::Directional).with_csm()), &settings)
            .unwrap();
        assert_eq!(config.render_pass_type, RenderPassType::DirectionalNoShadow);
        assert!(!config.is_csm);
    }

    #[test]
    fn test_shading_model_and_normal_maps() {
        let intent = RenderIntent {
            material_caps: MaterialCaps::TEXTURE | MaterialCaps::NORMAL_MAP,
            ..Default::default()
        };

        let config = resolve(&intent, &SynthSettings::default()).unwrap();
        assert_eq!(config.shading_model, ShadingModel::PhongBlinn);
        assert!(config.material_caps.contains(MaterialCaps::NORMAL_MAP));

        let low = SynthSettings {
            high_quality_lighting: false,
            ..Default::default()
        };
        let config = resolve(&intent, &low).unwrap();
        assert_eq!(config.shading_model, ShadingModel::Gouraud);
        assert_eq!(config.material_caps, MaterialCaps::TEXTURE);

        let physical = RenderIntent {
            material_shading: MaterialShading::Physical,
            ..intent
        };
        let config = resolve(&physical, &low).unwrap();
        assert_eq!(config.shading_model, ShadingModel::Pbr);
    }

    #[test]
    fn test_pbr_point_shadows_are_unsupported() {
        let intent = RenderIntent {
            material_shading: MaterialShading::Physical,
            ..lit(LightDescriptor::new(LightType::Point).with_shadows())
        };
        let err = resolve(&intent, &SynthSettings::default()).unwrap_err();
        assert!(matches!(err, SynthError::Unsupported(_)));
    }

    #[test]
    fn test_shadow_casting_into_cascades() {
        let intent = RenderIntent {
            render_pass: Some(RenderPassType::ShadowCasting),
            target: TargetShape {
                is_cubemap: false,
                is_cascaded: true,
            },
            ..Default::default()
        };
        let config = resolve(&intent, &SynthSettings::default()).unwrap();
        assert!(config.is_csm);
        assert!(config.is_cubemap_multiview);
        assert_eq!(config.cascade_count, 4);

        let lit_into_cascades = RenderIntent {
            render_pass: None,
            ..intent
        };
        assert!(resolve(&lit_into_cascades, &SynthSettings::default()).is_err());
    }

    #[test]
    fn test_kernel_radius_never_zero() {
        let settings = SynthSettings {
            pcf_kernel_radius: 0,
            ..Default::default()
        };
        let config = resolve(&RenderIntent::default(), &settings).unwrap();
        assert_eq!(config.pcf_kernel_radius, 1);
    }
}
