//! Program cache keys.
//!
//! The key is coarse: it names the pass, the pipeline state and the
//! lighting model, but not the material shape. Cache hits are confirmed
//! against the [`ProgramCompatibility`] stored with each program.

use std::hash::{Hash, Hasher};

use crate::config::{InstancingMode, RenderConfiguration, RenderPassType, ShadingModel, ShadowFilter};
use crate::synth::SurfaceDescription;

/// Identity of a render target. Programs are cached per target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTargetId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramCacheKey {
    pub render_pass_type: RenderPassType,
    /// API render pass the pipeline is compatible with.
    pub render_pass_handle: u64,
    pub layer_index: u32,
    pub is_instancing: bool,
    pub is_lighting_enabled: bool,
    pub is_depth_test_disabled: bool,
    pub is_depth_write_disabled: bool,
    pub shading_model: ShadingModel,
    pub shadow_filter: ShadowFilter,
    pub billboarding: bool,
}

impl ProgramCacheKey {
    #[must_use]
    pub fn new(config: &RenderConfiguration, render_pass_handle: u64) -> Self {
        Self {
            render_pass_type: config.render_pass_type,
            render_pass_handle,
            layer_index: config.layer_index,
            is_instancing: config.instancing_mode == InstancingMode::Multiple,
            is_lighting_enabled: config.is_lighting_enabled,
            is_depth_test_disabled: config.is_depth_test_disabled,
            is_depth_write_disabled: config.is_depth_write_disabled,
            shading_model: config.shading_model,
            shadow_filter: config.shadow_filter,
            billboarding: config.billboarding,
        }
    }

    /// Compact fingerprint, used in labels and log lines.
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        fx_hash_key(self)
    }
}

/// Secondary check applied to every program stored under a key.
///
/// `material_layout_hash` is the hash of the per-model-layer set layout.
/// `variant_hash` covers the rest of the configuration and the surface
/// expressions, which change the shader text without changing the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramCompatibility {
    pub material_layout_hash: Option<u64>,
    pub variant_hash: u64,
}

impl ProgramCompatibility {
    #[must_use]
    pub fn new(
        config: &RenderConfiguration,
        material_layout_hash: Option<u64>,
        surface: Option<&SurfaceDescription>,
    ) -> Self {
        Self {
            material_layout_hash,
            variant_hash: fx_hash_key(&(config, surface)),
        }
    }
}

/// Compute a `u64` hash of any `Hash`-able value using `FxHasher`.
#[inline]
pub fn fx_hash_key<K: Hash>(key: &K) -> u64 {
    let mut hasher = rustc_hash::FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_material_shape() {
        let a = RenderConfiguration::default();
        let b = RenderConfiguration {
            material_caps: crate::config::MaterialCaps::TEXTURE,
            ..Default::default()
        };
        assert_eq!(ProgramCacheKey::new(&a, 7), ProgramCacheKey::new(&b, 7));
        assert_ne!(ProgramCacheKey::new(&a, 7), ProgramCacheKey::new(&a, 8));

        let surface = SurfaceDescription::default();
        assert_ne!(
            ProgramCompatibility::new(&a, Some(1), Some(&surface)),
            ProgramCompatibility::new(&b, Some(1), Some(&surface))
        );
    }
}
