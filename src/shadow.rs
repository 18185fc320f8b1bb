//! Shadow Utilities
//!
//! CPU-side shadow math shared with the generated shaders.
//!
//! - Cascade splits for a resolved CSM configuration, and the cascade
//!   selection rule the CSM fragment code mirrors
//! - Packing of the cascaded light block
//! - PCF sample counts for the baked kernel radius

use glam::{Mat4, Vec3, Vec4};

use crate::config::{LightType, RenderConfiguration, ShadowFilter};
use crate::errors::{Result, SynthError};
use crate::layout::Std140Layout;
use crate::layout::std140::array_stride;
use crate::synth::resources::light_block;

/// Maximum cascade count per directional light.
pub const MAX_CASCADES: u32 = 4;

/// Samples in the fixed 2D Poisson disk.
pub const POISSON_DISK_SAMPLES: u32 = 16;

/// Samples in the fixed 3D Poisson sphere used by cube shadows.
pub const POISSON_SPHERE_SAMPLES: u32 = 20;

// ============================================================================
// Cascade Splits
// ============================================================================

/// View-space far distance of each cascade of a directional light.
///
/// Lanes past `count` repeat the far plane, so the packed `vec4` stays
/// non-decreasing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeSplits {
    far_distances: [f32; MAX_CASCADES as usize],
    count: u32,
}

impl CascadeSplits {
    /// Partitions `[near, far]` with the practical split scheme.
    ///
    /// `log_weight` blends a uniform partition (`0.0`) with a logarithmic
    /// one (`1.0`). The last cascade always ends at `far`.
    #[must_use]
    pub fn practical(count: u32, near: f32, far: f32, log_weight: f32) -> Self {
        let count = count.clamp(1, MAX_CASCADES);
        let mut far_distances = [far; MAX_CASCADES as usize];

        for cascade in 1..count {
            let t = cascade as f32 / count as f32;
            let uniform = near + (far - near) * t;
            let logarithmic = near * (far / near).powf(t);
            far_distances[(cascade - 1) as usize] = uniform + (logarithmic - uniform) * log_weight;
        }

        Self {
            far_distances,
            count,
        }
    }

    /// Splits for a resolved cascaded configuration, one per configured
    /// cascade.
    pub fn for_configuration(
        config: &RenderConfiguration,
        near: f32,
        far: f32,
        log_weight: f32,
    ) -> Result<Self> {
        if !config.is_csm {
            return Err(SynthError::InvalidConfiguration(format!(
                "'{}' does not use cascaded shadow maps",
                config.program_name()
            )));
        }
        Ok(Self::practical(config.cascade_count, near, far, log_weight))
    }

    /// Splits given explicitly, nearest first. At most [`MAX_CASCADES`] are
    /// kept.
    #[must_use]
    pub fn from_distances(distances: &[f32]) -> Self {
        let count = (distances.len() as u32).clamp(1, MAX_CASCADES);
        let last = distances.last().copied().unwrap_or(f32::MAX);
        let mut far_distances = [last; MAX_CASCADES as usize];
        for (lane, &distance) in far_distances.iter_mut().zip(distances) {
            *lane = distance;
        }
        Self {
            far_distances,
            count,
        }
    }

    #[inline]
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// The used splits, nearest first.
    #[must_use]
    pub fn distances(&self) -> &[f32] {
        &self.far_distances[..self.count as usize]
    }

    /// All lanes of the `splitDistances` vector.
    #[inline]
    #[must_use]
    pub const fn lanes(&self) -> [f32; MAX_CASCADES as usize] {
        self.far_distances
    }

    /// Picks the cascade for a fragment at `view_depth`.
    ///
    /// The first cascade whose split lies beyond the depth wins. Depths past
    /// the last split stay in the last cascade. The CSM fragment code
    /// evaluates the same rule.
    #[must_use]
    pub fn select(&self, view_depth: f32) -> u32 {
        let depth = view_depth.abs();
        self.distances()
            .iter()
            .position(|&split| depth < split)
            .map_or(self.count - 1, |cascade| cascade as u32)
    }
}

// ============================================================================
// Cascaded Light Block
// ============================================================================

/// Values uploaded into the light block of a `DirectionalCSM` pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadedLight {
    pub view_projections: [Mat4; MAX_CASCADES as usize],
    pub splits: CascadeSplits,
    pub color: Vec4,
    pub direction: Vec3,
    pub intensity: f32,
    pub shadow_bias: f32,
    pub pcf_radius: f32,
}

impl CascadedLight {
    #[must_use]
    pub fn new(splits: CascadeSplits) -> Self {
        Self {
            view_projections: [Mat4::IDENTITY; MAX_CASCADES as usize],
            splits,
            color: Vec4::ONE,
            direction: Vec3::NEG_Y,
            intensity: 1.0,
            shadow_bias: 0.0,
            pcf_radius: 1.0,
        }
    }

    /// The light block contents, packed with the std140 offsets the shader
    /// declares.
    #[must_use]
    pub fn uniform_bytes(&self) -> Vec<u8> {
        let block = light_block(0, LightType::Directional, true, true);
        let layout = Std140Layout::compute(&block.members);
        let mut bytes = vec![0u8; layout.size as usize];

        for (member, &offset) in block.members.iter().zip(layout.offsets.iter()) {
            let offset = offset as usize;
            match member.name.as_str() {
                "cascadeViewProjectionMatrices" => {
                    let stride = array_stride(member.ty) as usize;
                    for (cascade, matrix) in self.view_projections.iter().enumerate() {
                        write_at(&mut bytes, offset + cascade * stride, bytemuck::bytes_of(matrix));
                    }
                }
                "splitDistances" => {
                    write_at(&mut bytes, offset, bytemuck::cast_slice(&self.splits.lanes()));
                }
                "color" => write_at(&mut bytes, offset, bytemuck::bytes_of(&self.color)),
                "direction" => {
                    write_at(&mut bytes, offset, bytemuck::bytes_of(&self.direction.extend(0.0)));
                }
                "intensity" => write_at(&mut bytes, offset, bytemuck::bytes_of(&self.intensity)),
                "cascadeCount" => {
                    write_at(&mut bytes, offset, bytemuck::bytes_of(&self.splits.count()));
                }
                "shadowBias" => write_at(&mut bytes, offset, bytemuck::bytes_of(&self.shadow_bias)),
                "pcfRadius" => write_at(&mut bytes, offset, bytemuck::bytes_of(&self.pcf_radius)),
                _ => {}
            }
        }

        bytes
    }
}

fn write_at(bytes: &mut [u8], offset: usize, src: &[u8]) {
    bytes[offset..offset + src.len()].copy_from_slice(src);
}

// ============================================================================
// PCF Sample Counts
// ============================================================================

/// Number of shadow-map taps a 2D filter takes for kernel radius `radius`.
#[must_use]
pub const fn pcf_sample_count_2d(filter: ShadowFilter, radius: u32) -> u32 {
    let width = 2 * radius + 1;
    match filter {
        ShadowFilter::None => 1,
        ShadowFilter::Grid | ShadowFilter::VogelDisk => width * width,
        ShadowFilter::PoissonDisk => POISSON_DISK_SAMPLES,
        // One gather returns a 2x2 quad.
        ShadowFilter::OptimizedGather => {
            let gathers = 2 * (radius + 1) + 1;
            gathers * gathers * 4
        }
    }
}

/// Number of cubemap lookups a cube filter takes for kernel radius `radius`.
#[must_use]
pub const fn pcf_sample_count_cube(filter: ShadowFilter, radius: u32) -> u32 {
    let width = 2 * radius + 1;
    match filter {
        ShadowFilter::None => 1,
        ShadowFilter::Grid => width * width * width,
        ShadowFilter::VogelDisk => width * width,
        ShadowFilter::PoissonDisk | ShadowFilter::OptimizedGather => POISSON_SPHERE_SAMPLES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_counts() {
        assert_eq!(pcf_sample_count_2d(ShadowFilter::Grid, 1), 9);
        assert_eq!(pcf_sample_count_2d(ShadowFilter::VogelDisk, 2), 25);
        assert_eq!(pcf_sample_count_2d(ShadowFilter::PoissonDisk, 3), 16);
        assert_eq!(pcf_sample_count_cube(ShadowFilter::Grid, 1), 27);
        assert_eq!(pcf_sample_count_cube(ShadowFilter::OptimizedGather, 1), 20);
    }

    #[test]
    fn test_uniform_weight_splits_evenly() {
        let splits = CascadeSplits::practical(4, 1.0, 101.0, 0.0);
        assert_eq!(splits.count(), 4);
        assert_eq!(splits.distances(), &[26.0, 51.0, 76.0, 101.0]);
    }

    #[test]
    fn test_log_weight_splits_geometrically() {
        let splits = CascadeSplits::practical(4, 1.0, 16.0, 1.0);
        for (split, expected) in splits.distances().iter().zip([2.0, 4.0, 8.0, 16.0]) {
            assert!((split - expected).abs() < 1e-4, "{split} != {expected}");
        }
    }

    #[test]
    fn test_unused_lanes_repeat_far() {
        let splits = CascadeSplits::practical(2, 0.5, 80.0, 0.5);
        assert_eq!(splits.distances().len(), 2);
        assert_eq!(splits.lanes()[1..], [80.0, 80.0, 80.0]);
        assert!(splits.lanes()[0] < 80.0);
    }

    #[test]
    fn test_selection_falls_back_to_last_cascade() {
        let splits = CascadeSplits::from_distances(&[10.0, 25.0, 60.0, 150.0]);
        assert_eq!(splits.select(0.0), 0);
        assert_eq!(splits.select(9.99), 0);
        assert_eq!(splits.select(10.0), 1);
        assert_eq!(splits.select(-30.0), 2);
        assert_eq!(splits.select(1000.0), 3);
        assert_eq!(CascadeSplits::from_distances(&[10.0, 25.0]).select(1000.0), 1);
    }
}
