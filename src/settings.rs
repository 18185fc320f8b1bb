//! Synthesis Settings
//!
//! Global toggles that influence how render intents are resolved into
//! concrete program configurations and how the generated code is tuned.
//!
//! Settings are read when a program is *built*. Programs that are already
//! cached keep the code they were generated with; clear the
//! [`ProgramCache`](crate::cache::ProgramCache) after changing settings.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_synth::{SynthSettings, ShadowFilter};
//!
//! // Defaults: shadows on, per-fragment lighting, Vogel PCF.
//! let settings = SynthSettings::default();
//!
//! // Cheap preset for low-end hardware.
//! let settings = SynthSettings {
//!     high_quality_lighting: false,
//!     shadow_filter: ShadowFilter::from_quality_name("Performance"),
//!     ..Default::default()
//! };
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ShadowFilter;
use crate::shadow::MAX_CASCADES;

// ---------------------------------------------------------------------------
// SynthSettings
// ---------------------------------------------------------------------------

/// Global configuration for program synthesis.
///
/// # Fields
///
/// | Field                     | Description                                   | Default     |
/// |---------------------------|-----------------------------------------------|-------------|
/// | `shadow_maps_enabled`     | Shadowed passes sample shadow maps            | `true`      |
/// | `high_quality_lighting`   | Standard materials use per-fragment lighting  | `true`      |
/// | `normal_mapping_enabled`  | Normal maps are honored                       | `true`      |
/// | `shadow_filter`           | PCF method for shadowed passes                | `VogelDisk` |
/// | `pcf_kernel_radius`       | PCF half-width in texels                      | `1`         |
/// | `discard_unlit_fragments` | Discard fragments with zero light             | `true`      |
/// | `show_source_code`        | Log generated sources at debug level          | `false`     |
/// | `glsl_version`            | `#version` directive                          | `"450 core"`|
/// | `cascade_count`           | CSM cascades per directional light            | `4`         |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthSettings {
    // === Lighting ===
    /// When `false`, every shadowed pass is resolved to its `NoShadow` variant.
    pub shadow_maps_enabled: bool,

    /// Standard materials are lit per fragment (Blinn-Phong) when `true`,
    /// per vertex (Gouraud) otherwise. Physical materials always use PBR.
    pub high_quality_lighting: bool,

    /// Allows materials with a normal map to perturb the shading normal.
    ///
    /// Ignored by Gouraud shading, which has no per-fragment normal.
    pub normal_mapping_enabled: bool,

    // === Shadows ===
    /// Filtering method for shadow map lookups.
    pub shadow_filter: ShadowFilter,

    /// Half-width of the PCF kernel, baked into the generated code.
    ///
    /// A radius of `1` yields a 3×3 grid. The light's `pcfRadius` uniform
    /// scales the spacing between taps at runtime.
    pub pcf_kernel_radius: u32,

    /// Emit `discard` once the accumulated light or shadow factor reaches zero.
    pub discard_unlit_fragments: bool,

    /// Number of cascades used by directional lights with CSM enabled.
    ///
    /// Clamped to [`MAX_CASCADES`].
    pub cascade_count: u32,

    // === Debugging ===
    /// Print every generated stage through `log::debug!`.
    pub show_source_code: bool,

    /// Value of the `#version` directive.
    pub glsl_version: String,
}

impl Default for SynthSettings {
    fn default() -> Self {
        Self {
            shadow_maps_enabled: true,
            high_quality_lighting: true,
            normal_mapping_enabled: true,
            shadow_filter: ShadowFilter::default(),
            pcf_kernel_radius: 1,
            discard_unlit_fragments: true,
            cascade_count: MAX_CASCADES,
            show_source_code: false,
            glsl_version: String::from("450 core"),
        }
    }
}

impl SynthSettings {
    /// Cascade count clamped to the supported range.
    #[inline]
    #[must_use]
    pub fn effective_cascade_count(&self) -> u32 {
        self.cascade_count.clamp(1, MAX_CASCADES)
    }
}
