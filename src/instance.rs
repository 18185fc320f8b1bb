//! Renderable Instances
//!
//! A [`Renderable`] is geometry plus one material per layer. A
//! [`RenderableInstance`] places it in the world and owns the programs it
//! draws with, looked up by (render target, pass request, layer).
//!
//! # Lifecycle
//!
//! ```text
//! get_ready_for_render ──► programs built or reused ──► render (lookups only)
//!          │
//!          └─ build failure ──► broken (skipped by RenderList) ──► reset_broken
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bitflags::bitflags;
use glam::{Mat4, Quat};
use log::{debug, error};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::cache::{
    CompiledProgram, ProgramBuilder, ProgramCache, ProgramCacheKey, ProgramCompatibility,
    RenderTargetId,
};
use crate::config::{InstancingMode, LightDescriptor, RenderIntent, RenderPassType, TargetShape, resolve};
use crate::errors::{Result, SynthError};
use crate::interfaces::{
    CommandRecorder, GeometryInterface, MaterialInterface, PipelineCompiler, RenderTargetInterface,
};
use crate::push_constants::MatrixInputs;
use crate::state::{DoubleBuffered, SlotAllocator, StateIndex};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InstanceFlags: u8 {
        const VISIBLE              = 1 << 0;
        const CASTS_SHADOWS        = 1 << 1;
        const BILLBOARD            = 1 << 2;
        const LIGHTING_DISABLED    = 1 << 3;
        const DEPTH_TEST_DISABLED  = 1 << 4;
        const DEPTH_WRITE_DISABLED = 1 << 5;
    }
}

impl Default for InstanceFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::CASTS_SHADOWS
    }
}

// ─── Renderable ──────────────────────────────────────────────────────────────

pub struct Renderable {
    pub name: String,
    pub geometry: Arc<dyn GeometryInterface>,
    /// One material per geometry layer. Layers past the end draw without a
    /// material.
    pub materials: Vec<Arc<dyn MaterialInterface>>,
    pub instancing_mode: InstancingMode,
}

impl Renderable {
    pub fn new(
        name: impl Into<String>,
        geometry: Arc<dyn GeometryInterface>,
        materials: Vec<Arc<dyn MaterialInterface>>,
    ) -> Self {
        Self {
            name: name.into(),
            geometry,
            materials,
            instancing_mode: InstancingMode::Unique,
        }
    }

    #[must_use]
    pub fn with_instancing(mut self) -> Self {
        self.instancing_mode = InstancingMode::Multiple;
        self
    }

    pub fn material(&self, layer: u32) -> Option<&dyn MaterialInterface> {
        self.materials.get(layer as usize).map(AsRef::as_ref)
    }
}

// ─── Per-Frame State ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceState {
    pub transform: Mat4,
    pub flags: InstanceFlags,
}

impl Default for InstanceState {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY,
            flags: InstanceFlags::default(),
        }
    }
}

/// View and projection shared by every draw of a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMatrices {
    pub view: Mat4,
    pub projection: Mat4,
}

impl Default for FrameMatrices {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

/// What a pass asks of an instance. Also names the prepared programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PassRequest {
    /// Forced pass; `None` derives it from `light`.
    pub render_pass: Option<RenderPassType>,
    pub light: Option<LightDescriptor>,
    pub dynamic_lighting: bool,
}

impl PassRequest {
    #[must_use]
    pub const fn simple() -> Self {
        Self {
            render_pass: Some(RenderPassType::Simple),
            light: None,
            dynamic_lighting: true,
        }
    }

    #[must_use]
    pub const fn ambient() -> Self {
        Self {
            render_pass: Some(RenderPassType::Ambient),
            light: None,
            dynamic_lighting: true,
        }
    }

    #[must_use]
    pub const fn light(light: LightDescriptor) -> Self {
        Self {
            render_pass: None,
            light: Some(light),
            dynamic_lighting: true,
        }
    }

    #[must_use]
    pub const fn shadow_casting() -> Self {
        Self {
            render_pass: Some(RenderPassType::ShadowCasting),
            light: None,
            dynamic_lighting: true,
        }
    }
}

type ProgramSlot = (RenderTargetId, PassRequest, u32);

// ─── Instance ────────────────────────────────────────────────────────────────

pub struct RenderableInstance {
    renderable: Arc<Renderable>,
    state: DoubleBuffered<InstanceState>,
    programs: RwLock<FxHashMap<ProgramSlot, Arc<CompiledProgram>>>,
    broken: AtomicBool,
    broken_reason: Mutex<Option<String>>,
}

impl RenderableInstance {
    pub fn new(renderable: Arc<Renderable>) -> Self {
        Self {
            renderable,
            state: DoubleBuffered::default(),
            programs: RwLock::new(FxHashMap::default()),
            broken: AtomicBool::new(false),
            broken_reason: Mutex::new(None),
        }
    }

    pub fn renderable(&self) -> &Renderable {
        &self.renderable
    }

    pub fn name(&self) -> &str {
        &self.renderable.name
    }

    // ── State (logic thread) ──

    pub fn set_transform(&self, index: &StateIndex, transform: Mat4) {
        self.state.update(index, |state| state.transform = transform);
    }

    pub fn set_flags(&self, index: &StateIndex, flags: InstanceFlags) {
        self.state.update(index, |state| state.flags = flags);
    }

    /// Published state, as seen by the render thread.
    pub fn state(&self, index: &StateIndex) -> InstanceState {
        *self.state.read(index)
    }

    // ── Broken state ──

    #[inline]
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    pub fn broken_reason(&self) -> Option<String> {
        self.broken_reason.lock().clone()
    }

    /// Marks the instance as unusable until [`reset_broken`](Self::reset_broken).
    pub fn set_broken(&self, reason: impl Into<String>) {
        let reason = reason.into();
        error!("Renderable instance '{}' is broken: {reason}", self.name());
        *self.broken_reason.lock() = Some(reason);
        self.broken.store(true, Ordering::Release);
    }

    /// Clears the broken state and forgets prepared programs, so the next
    /// preparation tries again.
    pub fn reset_broken(&self) {
        *self.broken_reason.lock() = None;
        self.programs.write().clear();
        self.broken.store(false, Ordering::Release);
    }

    // ── Preparation ──

    /// Builds or reuses one program per geometry layer for `request` on
    /// `target`. A failure marks the instance broken.
    pub fn get_ready_for_render<C: PipelineCompiler>(
        &self,
        request: &PassRequest,
        target: &dyn RenderTargetInterface,
        index: &StateIndex,
        cache: &ProgramCache,
        builder: &ProgramBuilder<C>,
    ) -> Result<()> {
        if let Some(reason) = self.broken_reason() {
            return Err(SynthError::InvalidConfiguration(format!(
                "instance '{}' is broken: {reason}",
                self.name()
            )));
        }

        let result = self.prepare(request, target, index, cache, builder);
        if let Err(err) = &result {
            self.set_broken(err.to_string());
        }
        result
    }

    /// Prepares the depth-only program when the instance casts shadows.
    pub fn get_ready_for_shadow_casting<C: PipelineCompiler>(
        &self,
        target: &dyn RenderTargetInterface,
        index: &StateIndex,
        cache: &ProgramCache,
        builder: &ProgramBuilder<C>,
    ) -> Result<()> {
        if !self.state(index).flags.contains(InstanceFlags::CASTS_SHADOWS) {
            return Ok(());
        }
        self.get_ready_for_render(&PassRequest::shadow_casting(), target, index, cache, builder)
    }

    fn prepare<C: PipelineCompiler>(
        &self,
        request: &PassRequest,
        target: &dyn RenderTargetInterface,
        index: &StateIndex,
        cache: &ProgramCache,
        builder: &ProgramBuilder<C>,
    ) -> Result<()> {
        let flags = self.state(index).flags;
        let target_id = target.id();
        let geometry = self.renderable.geometry.as_ref();

        for layer in 0..geometry.layer_count() {
            let slot = (target_id, *request, layer);
            if self.programs.read().contains_key(&slot) {
                continue;
            }

            let material = self.renderable.material(layer);
            let intent = RenderIntent {
                render_pass: request.render_pass,
                light: request.light,
                dynamic_lighting: request.dynamic_lighting,
                material_shading: material.map(MaterialInterface::shading).unwrap_or_default(),
                material_caps: material.map(MaterialInterface::caps).unwrap_or_default(),
                geometry: geometry.flags(),
                instancing_mode: self.renderable.instancing_mode,
                target: TargetShape::of(target),
                layer_index: layer,
                billboarding: flags.contains(InstanceFlags::BILLBOARD),
                is_lighting_enabled: !flags.contains(InstanceFlags::LIGHTING_DISABLED),
                is_depth_test_disabled: flags.contains(InstanceFlags::DEPTH_TEST_DISABLED),
                is_depth_write_disabled: flags.contains(InstanceFlags::DEPTH_WRITE_DISABLED),
            };
            let config = resolve(&intent, builder.settings())?;

            let material = material.filter(|_| config.uses_material());
            let key = ProgramCacheKey::new(&config, target.render_pass_handle());
            let surface = material.map(MaterialInterface::surface);
            let compatibility = ProgramCompatibility::new(
                &config,
                material.map(MaterialInterface::layout_hash),
                surface.as_ref(),
            );
            let program = cache.get_or_build(target_id, key, &compatibility, || {
                builder.build(&config, material, target)
            })?;

            debug!(
                "Instance '{}' layer {layer} ready with '{}'",
                self.name(),
                program.name
            );
            self.programs.write().insert(slot, program);
        }
        Ok(())
    }

    // ── Drawing (render thread) ──

    pub fn program(
        &self,
        target: RenderTargetId,
        request: &PassRequest,
        layer: u32,
    ) -> Option<Arc<CompiledProgram>> {
        self.programs.read().get(&(target, *request, layer)).cloned()
    }

    /// Records the draws of every prepared layer. Returns the number of
    /// draws recorded; layers not prepared for this request are skipped.
    pub fn render(
        &self,
        request: &PassRequest,
        target: RenderTargetId,
        frame: &FrameMatrices,
        index: &StateIndex,
        recorder: &mut dyn CommandRecorder,
        instance_count: u32,
    ) -> u32 {
        if self.is_broken() {
            return 0;
        }

        let state = self.state(index);
        let model = if state.flags.contains(InstanceFlags::BILLBOARD) {
            billboard_matrix(state.transform, frame.view)
        } else {
            state.transform
        };
        let inputs = MatrixInputs {
            model,
            view: frame.view,
            projection: frame.projection,
        };

        let mut draws = 0;
        for layer in 0..self.renderable.geometry.layer_count() {
            let Some(program) = self.program(target, request, layer) else {
                continue;
            };
            program.bind(recorder);
            program.push_matrices(recorder, &inputs);
            recorder.draw(layer, instance_count);
            draws += 1;
        }
        draws
    }
}

/// Replaces the rotation of `model` so the object faces the camera.
pub fn billboard_matrix(model: Mat4, view: Mat4) -> Mat4 {
    let (scale, _, translation) = model.to_scale_rotation_translation();
    let camera_rotation = Quat::from_mat4(&view.inverse());
    Mat4::from_scale_rotation_translation(scale, camera_rotation.normalize(), translation)
}

// ─── Render List ─────────────────────────────────────────────────────────────

/// Instances drawn by a pass, addressed by slot.
pub struct RenderList {
    slots: SlotAllocator,
    entries: RwLock<Vec<Option<Arc<RenderableInstance>>>>,
}

impl RenderList {
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            slots: SlotAllocator::new(capacity),
            entries: RwLock::new(vec![None; capacity as usize]),
        }
    }

    /// Adds `instance`; returns its slot, or `None` when full.
    pub fn add(&self, instance: Arc<RenderableInstance>) -> Option<u32> {
        let slot = self.slots.allocate()?;
        self.entries.write()[slot as usize] = Some(instance);
        Some(slot)
    }

    pub fn remove(&self, slot: u32) -> Option<Arc<RenderableInstance>> {
        let instance = self.entries.write().get_mut(slot as usize)?.take();
        self.slots.free(slot);
        instance
    }

    pub fn len(&self) -> usize {
        self.slots.capacity() - self.slots.available()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visible instances that are not broken, in slot order.
    pub fn collect(&self, index: &StateIndex) -> Vec<Arc<RenderableInstance>> {
        self.entries
            .read()
            .iter()
            .flatten()
            .filter(|instance| !instance.is_broken())
            .filter(|instance| instance.state(index).flags.contains(InstanceFlags::VISIBLE))
            .cloned()
            .collect()
    }

    /// Records every drawable instance. Returns the number of draws.
    pub fn render(
        &self,
        request: &PassRequest,
        target: RenderTargetId,
        frame: &FrameMatrices,
        index: &StateIndex,
        recorder: &mut dyn CommandRecorder,
    ) -> u32 {
        self.collect(index)
            .iter()
            .map(|instance| instance.render(request, target, frame, index, recorder, 1))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4};

    use super::*;

    #[test]
    fn test_billboard_faces_camera() {
        let view = Mat4::look_at_rh(Vec3::new(3.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y);
        let model = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::from_rotation_y(1.0),
            Vec3::new(1.0, 0.0, 0.0),
        );
        let model_view = view * billboard_matrix(model, view);

        // The model's rotation is cancelled: +Z maps to view-space +Z.
        let forward = model_view * Vec4::new(0.0, 0.0, 1.0, 0.0);
        let forward = forward.truncate().normalize();
        assert!((forward - Vec3::Z).length() < 1e-4);
    }

    #[test]
    fn test_default_flags() {
        let flags = InstanceFlags::default();
        assert!(flags.contains(InstanceFlags::VISIBLE));
        assert!(!flags.contains(InstanceFlags::BILLBOARD));
    }
}
