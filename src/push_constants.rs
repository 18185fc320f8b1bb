//! Push-Constant Strategy
//!
//! Decides which matrices a program receives through push constants and
//! writes them per draw.
//!
//! The decision is a fixed table over the configuration:
//!
//! | Instancing | Multiview | Advanced / billboard | Upload                      |
//! |------------|-----------|----------------------|-----------------------------|
//! | Unique     | yes       | any                  | Model                       |
//! | Unique     | no        | yes                  | View + Model                |
//! | Unique     | no        | no                   | ModelViewProjection         |
//! | Multiple   | yes       | any                  | nothing                     |
//! | Multiple   | no        | yes                  | View + ViewProjection       |
//! | Multiple   | no        | no                   | ViewProjection              |
//!
//! In multiview the view matrices come from the view uniform block, indexed
//! by `gl_ViewIndex`. With instancing the model matrix comes from the
//! instance vertex buffer.

use glam::Mat4;
use smallvec::SmallVec;
use wgpu::ShaderStages;

use crate::config::InstancingMode;
use crate::errors::{Result, SynthError};
use crate::layout::{GlslType, Member, PushConstantBlock, Std140Layout};

/// GLSL name of the push-constant block.
pub const PUSH_BLOCK_NAME: &str = "Matrices";
/// GLSL instance name of the push-constant block.
pub const PUSH_INSTANCE_NAME: &str = "pc";

// ─── Slots ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixSlot {
    Model,
    View,
    ViewProjection,
    ModelViewProjection,
}

impl MatrixSlot {
    pub const ALL: [Self; 4] = [
        Self::Model,
        Self::View,
        Self::ViewProjection,
        Self::ModelViewProjection,
    ];

    /// Member name inside the push-constant block.
    #[must_use]
    pub const fn member_name(self) -> &'static str {
        match self {
            Self::Model => "modelMatrix",
            Self::View => "viewMatrix",
            Self::ViewProjection => "viewProjectionMatrix",
            Self::ModelViewProjection => "modelViewProjectionMatrix",
        }
    }

    #[must_use]
    pub fn from_member_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.member_name() == name)
    }

    /// `pc.<member>` expression for generated code.
    #[must_use]
    pub fn glsl(self) -> String {
        format!("{PUSH_INSTANCE_NAME}.{}", self.member_name())
    }
}

// ─── Recipe ──────────────────────────────────────────────────────────────────

/// Which matrices a program expects per draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushConstantRecipe {
    ModelOnly,
    ViewModel,
    ModelViewProjection,
    Nothing,
    ViewViewProjection,
    ViewProjectionOnly,
}

impl PushConstantRecipe {
    #[must_use]
    pub const fn select(
        instancing: InstancingMode,
        multiview: bool,
        advanced: bool,
        billboarding: bool,
    ) -> Self {
        let separate_view = advanced || billboarding;
        match (instancing, multiview, separate_view) {
            (InstancingMode::Unique, true, _) => Self::ModelOnly,
            (InstancingMode::Unique, false, true) => Self::ViewModel,
            (InstancingMode::Unique, false, false) => Self::ModelViewProjection,
            (InstancingMode::Multiple, true, _) => Self::Nothing,
            (InstancingMode::Multiple, false, true) => Self::ViewViewProjection,
            (InstancingMode::Multiple, false, false) => Self::ViewProjectionOnly,
        }
    }

    /// Matrices in block order.
    #[must_use]
    pub fn slots(self) -> SmallVec<[MatrixSlot; 2]> {
        match self {
            Self::ModelOnly => smallvec::smallvec![MatrixSlot::Model],
            Self::ViewModel => smallvec::smallvec![MatrixSlot::View, MatrixSlot::Model],
            Self::ModelViewProjection => smallvec::smallvec![MatrixSlot::ModelViewProjection],
            Self::Nothing => SmallVec::new(),
            Self::ViewViewProjection => {
                smallvec::smallvec![MatrixSlot::View, MatrixSlot::ViewProjection]
            }
            Self::ViewProjectionOnly => smallvec::smallvec![MatrixSlot::ViewProjection],
        }
    }

    #[inline]
    #[must_use]
    pub fn has(self, slot: MatrixSlot) -> bool {
        self.slots().contains(&slot)
    }

    /// Bytes uploaded per draw.
    #[must_use]
    pub fn byte_size(self) -> u32 {
        self.slots().len() as u32 * 64
    }

    /// The block the vertex stage declares, or `None` when nothing is pushed.
    #[must_use]
    pub fn push_constant_block(self) -> Option<PushConstantBlock> {
        let slots = self.slots();
        if slots.is_empty() {
            return None;
        }
        Some(PushConstantBlock {
            block_name: PUSH_BLOCK_NAME.to_string(),
            instance_name: PUSH_INSTANCE_NAME.to_string(),
            members: slots
                .iter()
                .map(|slot| Member::new(GlslType::Mat4, slot.member_name()))
                .collect(),
        })
    }
}

// ─── Layout ──────────────────────────────────────────────────────────────────

/// Byte offsets of the pushed matrices, computed once per program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PushConstantLayout {
    offsets: [Option<u32>; 4],
    pub total_bytes: u32,
    pub stages: ShaderStages,
}

impl Default for PushConstantLayout {
    fn default() -> Self {
        Self {
            offsets: [None; 4],
            total_bytes: 0,
            stages: ShaderStages::empty(),
        }
    }
}

impl PushConstantLayout {
    /// Derives the layout from the declared block using std140.
    pub fn from_block(block: Option<&PushConstantBlock>, stages: ShaderStages) -> Result<Self> {
        let Some(block) = block else {
            return Ok(Self::default());
        };

        let std140 = Std140Layout::compute(&block.members);
        let mut offsets = [None; 4];
        for (member, &offset) in block.members.iter().zip(std140.offsets.iter()) {
            let slot = MatrixSlot::from_member_name(&member.name).ok_or_else(|| {
                SynthError::Layout(format!(
                    "push-constant member '{}' is not a known matrix",
                    member.name
                ))
            })?;
            offsets[slot as usize] = Some(offset);
        }

        Ok(Self {
            offsets,
            total_bytes: std140.end,
            stages,
        })
    }

    #[inline]
    #[must_use]
    pub fn offset(&self, slot: MatrixSlot) -> Option<u32> {
        self.offsets[slot as usize]
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_bytes == 0
    }
}

// ─── Strategy ────────────────────────────────────────────────────────────────

/// Per-draw matrix inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixInputs {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

impl Default for MatrixInputs {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }
}

impl MatrixInputs {
    #[must_use]
    pub fn matrix(&self, slot: MatrixSlot) -> Mat4 {
        match slot {
            MatrixSlot::Model => self.model,
            MatrixSlot::View => self.view,
            MatrixSlot::ViewProjection => self.projection * self.view,
            MatrixSlot::ModelViewProjection => self.projection * self.view * self.model,
        }
    }
}

pub struct PushConstantStrategy;

impl PushConstantStrategy {
    /// Writes the payload for one draw. Its length is `layout.total_bytes`.
    #[must_use]
    pub fn write(layout: &PushConstantLayout, inputs: &MatrixInputs) -> SmallVec<[u8; 128]> {
        let mut payload: SmallVec<[u8; 128]> = smallvec::smallvec![0; layout.total_bytes as usize];

        for slot in MatrixSlot::ALL {
            let Some(offset) = layout.offset(slot) else {
                continue;
            };
            let matrix = inputs.matrix(slot);
            let bytes = bytemuck::bytes_of(&matrix);
            let start = offset as usize;
            payload[start..start + bytes.len()].copy_from_slice(bytes);
        }

        payload
    }
}
