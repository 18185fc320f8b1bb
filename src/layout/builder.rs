//! Resource Layout Builder
//!
//! Consumes the per-stage declaration lists and produces, in one pass, the
//! GLSL interface text of each stage and the [`ProgramLayout`] that matches
//! it. Block offsets on both sides come from the std140 module.

use smallvec::SmallVec;
use wgpu::ShaderStages;

use super::declaration::{Declaration, PushConstantBlock};
use super::std140::Std140Layout;
use super::{DescriptorBinding, DescriptorKind, DescriptorSetLayout, ProgramLayout, PushConstantRange};
use crate::errors::{Result, SynthError};

pub struct ResourceLayoutBuilder {
    set_layouts: Vec<DescriptorSetLayout>,
    push_block: Option<PushConstantBlock>,
    push_stages: ShaderStages,
}

impl ResourceLayoutBuilder {
    /// Creates a builder for a program with `set_count` allocated sets.
    ///
    /// Every allocated set gets a layout, even when nothing binds to it.
    #[must_use]
    pub fn new(set_count: u32) -> Self {
        Self {
            set_layouts: (0..set_count).map(DescriptorSetLayout::new).collect(),
            push_block: None,
            push_stages: ShaderStages::empty(),
        }
    }

    /// Registers the declarations of one stage and returns their GLSL text.
    pub fn add_stage(&mut self, stage: ShaderStages, declarations: &[Declaration]) -> Result<String> {
        let mut glsl = String::new();

        for declaration in declarations {
            match declaration {
                Declaration::UniformBlock(block) => {
                    let kind = DescriptorKind::UniformBuffer {
                        size: block.byte_size(),
                    };
                    self.bind(block.set, block.binding, kind, stage, &block.instance_name)?;
                }
                Declaration::Sampler(sampler) => {
                    let dimension = sampler.ty.view_dimension().ok_or_else(|| {
                        SynthError::Layout(format!(
                            "'{}' is declared as a sampler with non-sampler type {}",
                            sampler.name, sampler.ty
                        ))
                    })?;
                    let kind = DescriptorKind::CombinedImageSampler {
                        dimension,
                        comparison: sampler.ty.is_comparison(),
                    };
                    self.bind(sampler.set, sampler.binding, kind, stage, &sampler.name)?;
                }
                Declaration::PushConstantBlock(block) => self.push_constants(block, stage)?,
                Declaration::StageInput(_) | Declaration::StageOutput(_) => {}
            }

            declaration
                .write_glsl(&mut glsl)
                .map_err(|e| SynthError::Layout(format!("failed to format declaration: {e}")))?;
        }

        Ok(glsl)
    }

    fn bind(
        &mut self,
        set: u32,
        binding: u32,
        kind: DescriptorKind,
        stage: ShaderStages,
        name: &str,
    ) -> Result<()> {
        let set_count = self.set_layouts.len();
        let layout = self.set_layouts.get_mut(set as usize).ok_or_else(|| {
            SynthError::Layout(format!(
                "'{name}' binds to set {set}, but only {set_count} sets are allocated"
            ))
        })?;

        if let Some(existing) = layout.bindings.iter_mut().find(|b| b.binding == binding) {
            if existing.kind != kind {
                return Err(SynthError::Layout(format!(
                    "set {set} binding {binding}: '{}' is {:?} but '{name}' is {:?}",
                    existing.name, existing.kind, kind
                )));
            }
            existing.visibility |= stage;
            return Ok(());
        }

        let position = layout
            .bindings
            .iter()
            .position(|b| b.binding > binding)
            .unwrap_or(layout.bindings.len());
        layout.bindings.insert(
            position,
            DescriptorBinding {
                binding,
                kind,
                visibility: stage,
                name: name.to_string(),
            },
        );
        Ok(())
    }

    fn push_constants(&mut self, block: &PushConstantBlock, stage: ShaderStages) -> Result<()> {
        match &self.push_block {
            Some(existing) if existing.members != block.members => Err(SynthError::Layout(format!(
                "push-constant block '{}' differs between stages",
                block.block_name
            ))),
            Some(_) => {
                self.push_stages |= stage;
                Ok(())
            }
            None => {
                self.push_block = Some(block.clone());
                self.push_stages = stage;
                Ok(())
            }
        }
    }

    /// The push-constant block registered so far, if any.
    #[must_use]
    pub fn push_constant_block(&self) -> Option<&PushConstantBlock> {
        self.push_block.as_ref()
    }

    /// Stages that declared the push-constant block.
    #[must_use]
    pub fn push_constant_stages(&self) -> ShaderStages {
        self.push_stages
    }

    #[must_use]
    pub fn build(self) -> ProgramLayout {
        let mut push_constant_ranges = SmallVec::new();
        if let Some(block) = &self.push_block {
            let layout = Std140Layout::compute(&block.members);
            if layout.end > 0 {
                push_constant_ranges.push(PushConstantRange {
                    stages: self.push_stages,
                    offset: 0,
                    size: layout.end,
                });
            }
        }

        ProgramLayout {
            set_layouts: self.set_layouts,
            push_constant_ranges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::declaration::{GlslType, Member, SamplerDeclaration, UniformBlock};

    fn material_block(size_hint: GlslType) -> Declaration {
        Declaration::UniformBlock(
            UniformBlock::new(0, 0, "Material", "material").with(size_hint, "diffuse"),
        )
    }

    #[test]
    fn test_visibility_merges_across_stages() {
        let mut builder = ResourceLayoutBuilder::new(1);
        builder.add_stage(ShaderStages::VERTEX, &[material_block(GlslType::Vec4)]).unwrap();
        builder
            .add_stage(
                ShaderStages::FRAGMENT,
                &[
                    material_block(GlslType::Vec4),
                    Declaration::Sampler(SamplerDeclaration::new(0, 1, GlslType::Sampler2D, "diffuseMap")),
                ],
            )
            .unwrap();

        let layout = builder.build();
        let set = layout.set_layout(0).unwrap();
        assert_eq!(set.bindings.len(), 2);
        assert_eq!(set.bindings[0].visibility, ShaderStages::VERTEX_FRAGMENT);
        assert_eq!(set.bindings[1].visibility, ShaderStages::FRAGMENT);
    }

    #[test]
    fn test_conflicting_binding_is_rejected() {
        let mut builder = ResourceLayoutBuilder::new(1);
        builder.add_stage(ShaderStages::VERTEX, &[material_block(GlslType::Vec4)]).unwrap();
        let err = builder
            .add_stage(ShaderStages::FRAGMENT, &[material_block(GlslType::Mat4)])
            .unwrap_err();
        assert!(matches!(err, SynthError::Layout(_)));
    }

    #[test]
    fn test_unallocated_set_is_rejected() {
        let mut builder = ResourceLayoutBuilder::new(1);
        let decl = Declaration::UniformBlock(
            UniformBlock::new(3, 0, "Light", "light").with(GlslType::Vec4, "color"),
        );
        assert!(matches!(
            builder.add_stage(ShaderStages::FRAGMENT, &[decl]),
            Err(SynthError::Layout(_))
        ));
    }

    #[test]
    fn test_push_constant_range_spans_block() {
        let block = PushConstantBlock {
            block_name: "Matrices".into(),
            instance_name: "pc".into(),
            members: vec![
                Member::new(GlslType::Mat4, "viewMatrix"),
                Member::new(GlslType::Mat4, "modelMatrix"),
            ],
        };
        let mut builder = ResourceLayoutBuilder::new(0);
        builder
            .add_stage(ShaderStages::VERTEX, &[Declaration::PushConstantBlock(block)])
            .unwrap();
        let layout = builder.build();
        assert_eq!(
            layout.push_constant_ranges.as_slice(),
            &[PushConstantRange {
                stages: ShaderStages::VERTEX,
                offset: 0,
                size: 128
            }]
        );
        assert_eq!(layout.push_constant_size(), 128);
    }

    #[test]
    fn test_set_hash_ignores_names() {
        let mut a = ResourceLayoutBuilder::new(1);
        a.add_stage(ShaderStages::FRAGMENT, &[material_block(GlslType::Vec4)]).unwrap();
        let mut b = ResourceLayoutBuilder::new(1);
        b.add_stage(
            ShaderStages::FRAGMENT,
            &[Declaration::UniformBlock(
                UniformBlock::new(0, 0, "Other", "other").with(GlslType::Vec4, "tint"),
            )],
        )
        .unwrap();
        assert_eq!(
            a.build().set_layouts[0].hash(),
            b.build().set_layouts[0].hash()
        );
    }
}
