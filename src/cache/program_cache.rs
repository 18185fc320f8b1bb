//! Program Cache
//!
//! Programs are stored per render target, then by [`ProgramCacheKey`].
//! Because the key does not describe the material shape, each key maps to a
//! small bucket of programs told apart by their [`ProgramCompatibility`].
//!
//! # Lookup
//!
//! ```text
//! get_or_build(target, key, compatibility)
//!   ├─ bucket has a compatible program ─► reuse
//!   ├─ bucket exists, none compatible ─► warn (collision), build, store alongside
//!   └─ no bucket ─► build, store
//! ```
//!
//! The lock is released while the program is built; a concurrent build of
//! the same entry is resolved at insertion by keeping the first one stored.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{trace, warn};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::key::{ProgramCacheKey, ProgramCompatibility, RenderTargetId};
use super::program::CompiledProgram;
use crate::errors::Result;

type ProgramBucket = SmallVec<[Arc<CompiledProgram>; 1]>;
type TargetPrograms = FxHashMap<ProgramCacheKey, ProgramBucket>;

#[derive(Default)]
pub struct ProgramCache {
    programs: Mutex<FxHashMap<RenderTargetId, TargetPrograms>>,

    // ── Statistics ──
    reuse_count: AtomicU64,
    build_count: AtomicU64,
    collision_count: AtomicU64,
}

impl ProgramCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached program for `(target, key)` matching
    /// `compatibility`, building it with `build` if there is none.
    pub fn get_or_build<F>(
        &self,
        target: RenderTargetId,
        key: ProgramCacheKey,
        compatibility: &ProgramCompatibility,
        build: F,
    ) -> Result<Arc<CompiledProgram>>
    where
        F: FnOnce() -> Result<CompiledProgram>,
    {
        let collided = {
            let programs = self.programs.lock();
            match programs.get(&target).and_then(|by_key| by_key.get(&key)) {
                Some(bucket) => {
                    if let Some(program) = find_compatible(bucket, compatibility) {
                        self.reuse_count.fetch_add(1, Ordering::Relaxed);
                        trace!("Reusing program '{}' on {target:?}", program.name);
                        return Ok(Arc::clone(program));
                    }
                    true
                }
                None => false,
            }
        };

        if collided {
            self.collision_count.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Program cache key collision on {target:?} ({} pass, key {:#018x}): incompatible material or variant, building a separate program",
                key.render_pass_type,
                key.fingerprint()
            );
        }

        let program = Arc::new(build()?);
        self.build_count.fetch_add(1, Ordering::Relaxed);

        let mut programs = self.programs.lock();
        let bucket = programs.entry(target).or_default().entry(key).or_default();
        if let Some(existing) = find_compatible(bucket, compatibility) {
            return Ok(Arc::clone(existing));
        }
        bucket.push(Arc::clone(&program));
        Ok(program)
    }

    /// Lookup without building.
    #[must_use]
    pub fn find(
        &self,
        target: RenderTargetId,
        key: &ProgramCacheKey,
        compatibility: &ProgramCompatibility,
    ) -> Option<Arc<CompiledProgram>> {
        let programs = self.programs.lock();
        let bucket = programs.get(&target)?.get(key)?;
        find_compatible(bucket, compatibility).cloned()
    }

    /// Drops every program built for `target`. Returns how many were dropped.
    pub fn remove_render_target(&self, target: RenderTargetId) -> usize {
        self.programs
            .lock()
            .remove(&target)
            .map_or(0, |by_key| by_key.values().map(SmallVec::len).sum())
    }

    pub fn clear(&self) {
        self.programs.lock().clear();
    }

    #[must_use]
    pub fn program_count(&self) -> usize {
        self.programs
            .lock()
            .values()
            .flat_map(FxHashMap::values)
            .map(SmallVec::len)
            .sum()
    }

    #[must_use]
    pub fn reuse_count(&self) -> u64 {
        self.reuse_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn build_count(&self) -> u64 {
        self.build_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn collision_count(&self) -> u64 {
        self.collision_count.load(Ordering::Relaxed)
    }
}

fn find_compatible<'a>(
    bucket: &'a ProgramBucket,
    compatibility: &ProgramCompatibility,
) -> Option<&'a Arc<CompiledProgram>> {
    bucket
        .iter()
        .find(|program| program.is_compatible_with(compatibility))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfiguration;
    use crate::errors::SynthError;
    use crate::interfaces::{PipelineHandle, PipelineLayoutHandle};
    use crate::layout::{ProgramLayout, SetIndexes, VertexBufferFormat};
    use crate::push_constants::{PushConstantLayout, PushConstantRecipe};

    fn compat(hash: Option<u64>) -> ProgramCompatibility {
        ProgramCompatibility::new(&RenderConfiguration::default(), hash, None)
    }

    fn program(hash: Option<u64>, pipeline: u64) -> CompiledProgram {
        let config = RenderConfiguration::default();
        CompiledProgram {
            name: config.program_name(),
            key: ProgramCacheKey::new(&config, 1),
            vertex_source: String::new(),
            fragment_source: String::new(),
            layout: ProgramLayout::default(),
            push_constant_layout: PushConstantLayout::default(),
            recipe: PushConstantRecipe::ModelViewProjection,
            vertex_format: VertexBufferFormat::default(),
            set_indexes: SetIndexes::default(),
            compatibility: compat(hash),
            pipeline_layout: PipelineLayoutHandle(pipeline),
            pipeline: PipelineHandle(pipeline),
        }
    }

    fn key() -> ProgramCacheKey {
        ProgramCacheKey::new(&RenderConfiguration::default(), 1)
    }

    #[test]
    fn test_reuse_same_hash() {
        let cache = ProgramCache::new();
        let target = RenderTargetId(1);
        let a = cache
            .get_or_build(target, key(), &compat(Some(5)), || Ok(program(Some(5), 1)))
            .unwrap();
        let b = cache
            .get_or_build(target, key(), &compat(Some(5)), || panic!("must not rebuild"))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.reuse_count(), 1);
        assert_eq!(cache.build_count(), 1);
    }

    #[test]
    fn test_collision_stores_side_by_side() {
        let cache = ProgramCache::new();
        let target = RenderTargetId(1);
        cache
            .get_or_build(target, key(), &compat(Some(5)), || Ok(program(Some(5), 1)))
            .unwrap();
        let other = cache
            .get_or_build(target, key(), &compat(Some(6)), || Ok(program(Some(6), 2)))
            .unwrap();
        assert_eq!(other.pipeline, PipelineHandle(2));
        assert_eq!(cache.collision_count(), 1);
        assert_eq!(cache.program_count(), 2);
        assert!(cache.find(target, &key(), &compat(Some(5))).is_some());
        assert!(cache.find(target, &key(), &compat(None)).is_none());
    }

    #[test]
    fn test_targets_are_isolated() {
        let cache = ProgramCache::new();
        cache
            .get_or_build(RenderTargetId(1), key(), &compat(None), || Ok(program(None, 1)))
            .unwrap();
        cache
            .get_or_build(RenderTargetId(2), key(), &compat(None), || Ok(program(None, 2)))
            .unwrap();
        assert_eq!(cache.build_count(), 2);
        assert_eq!(cache.remove_render_target(RenderTargetId(1)), 1);
        assert_eq!(cache.program_count(), 1);
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let cache = ProgramCache::new();
        let result = cache.get_or_build(RenderTargetId(1), key(), &compat(None), || {
            Err(SynthError::Synthesis("no producer".into()))
        });
        assert!(result.is_err());
        assert_eq!(cache.program_count(), 0);
    }
}
