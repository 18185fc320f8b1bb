//! The std140 memory-layout rule.
//!
//! This is the only piece of shared truth between generated shader text and
//! the CPU-side layouts: both the `layout(offset = N)` qualifiers written
//! into GLSL and the buffer/push-constant sizes handed to the pipeline layout
//! come from [`Std140Layout::compute`].
//!
//! | Type                 | Base alignment | Size |
//! |----------------------|----------------|------|
//! | `float`/`int`/`uint` | 4              | 4    |
//! | `vec2`               | 8              | 8    |
//! | `vec3`               | 16             | 12   |
//! | `vec4`               | 16             | 16   |
//! | `mat3`               | 16             | 48   |
//! | `mat4`               | 16             | 64   |
//!
//! Array elements are aligned and strided to a multiple of 16 bytes. Block
//! sizes are rounded up to 16.

use smallvec::SmallVec;

use super::declaration::{GlslType, Member};

/// Alignment of array elements and of whole blocks.
pub const VEC4_ALIGNMENT: u32 = 16;

/// Rounds `value` up to the next multiple of `alignment` (a power of two).
#[inline]
#[must_use]
pub const fn round_up(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) & !(alignment - 1)
}

/// Base alignment of a single (non-array) value.
#[must_use]
pub const fn base_alignment(ty: GlslType) -> u32 {
    match ty {
        GlslType::Float | GlslType::Int | GlslType::Uint => 4,
        GlslType::Vec2 => 8,
        GlslType::Vec3 | GlslType::Vec4 | GlslType::Mat3 | GlslType::Mat4 => 16,
        // Opaque types never live in a block.
        GlslType::Sampler2D
        | GlslType::Sampler2DShadow
        | GlslType::Sampler2DArrayShadow
        | GlslType::SamplerCube => 0,
    }
}

/// Size in bytes of a single (non-array) value.
#[must_use]
pub const fn size_of(ty: GlslType) -> u32 {
    match ty {
        GlslType::Float | GlslType::Int | GlslType::Uint => 4,
        GlslType::Vec2 => 8,
        GlslType::Vec3 => 12,
        GlslType::Vec4 => 16,
        // Three columns, each padded to a vec4.
        GlslType::Mat3 => 48,
        GlslType::Mat4 => 64,
        GlslType::Sampler2D
        | GlslType::Sampler2DShadow
        | GlslType::Sampler2DArrayShadow
        | GlslType::SamplerCube => 0,
    }
}

/// Distance between two consecutive elements of an array of `ty`.
#[inline]
#[must_use]
pub const fn array_stride(ty: GlslType) -> u32 {
    round_up(size_of(ty), VEC4_ALIGNMENT)
}

/// Alignment of a member, accounting for the array rule.
#[inline]
#[must_use]
pub const fn member_alignment(member: &Member) -> u32 {
    let alignment = base_alignment(member.ty);
    if member.array_size > 0 && alignment < VEC4_ALIGNMENT {
        VEC4_ALIGNMENT
    } else {
        alignment
    }
}

/// Bytes occupied by a member, accounting for the array rule.
#[inline]
#[must_use]
pub const fn member_size(member: &Member) -> u32 {
    if member.array_size > 0 {
        array_stride(member.ty) * member.array_size
    } else {
        size_of(member.ty)
    }
}

/// Offsets of every member of a block, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Std140Layout {
    pub offsets: SmallVec<[u32; 16]>,
    /// Byte just past the last member.
    pub end: u32,
    /// `end` rounded up to the block alignment.
    pub size: u32,
}

impl Std140Layout {
    #[must_use]
    pub fn compute(members: &[Member]) -> Self {
        let mut offsets = SmallVec::with_capacity(members.len());
        let mut cursor = 0u32;

        for member in members {
            let alignment = member_alignment(member);
            if alignment > 0 {
                cursor = round_up(cursor, alignment);
            }
            offsets.push(cursor);
            cursor += member_size(member);
        }

        Self {
            offsets,
            end: cursor,
            size: round_up(cursor, VEC4_ALIGNMENT),
        }
    }

    /// Offset of the member called `name`, if present.
    #[must_use]
    pub fn offset_of(&self, members: &[Member], name: &str) -> Option<u32> {
        members
            .iter()
            .position(|m| m.name == name)
            .map(|index| self.offsets[index])
    }
}
