//! Program Synthesis
//!
//! Turns one [`RenderConfiguration`] (plus the material it is built for)
//! into a vertex and fragment source pair and the resource layout both
//! stages agree on.
//!
//! # Pipeline
//!
//! 1. Allocate descriptor sets: per-view, per-light, per-model-layer.
//! 2. Declare the push-constant block chosen by the recipe.
//! 3. Declare material resources and the fragment color output.
//! 4. Emit `gl_Position`, then the pass-specific code. Producers pull their
//!    own dependencies and forward them across the stage boundary.
//! 5. Feed both declaration lists to the [`ResourceLayoutBuilder`], which
//!    returns the interface text and the [`ProgramLayout`].
//!
//! Synthesis is a pure function of its inputs: equal inputs give
//! byte-identical sources and equal layouts.

use log::debug;
use wgpu::ShaderStages;

use super::code::Zone;
use super::context::BuildContext;
use super::light::{self, SurfaceInputs, ambient, forward_surface_inputs};
use super::resources::{self, VIEW_INSTANCE};
use super::stage::{ShaderStage, StageKind};
use super::surface::SurfaceDescription;
use super::unlit;
use super::variables::{SynthVariable, declare_attribute, require};
use crate::config::{RenderConfiguration, RenderPassType};
use crate::errors::{Result, SynthError};
use crate::interfaces::MaterialInterface;
use crate::layout::{
    Declaration, GlslType, ProgramLayout, ResourceLayoutBuilder, SetIndexes, SetRole,
    StageVariable, VertexAttribute,
};
use crate::push_constants::{MatrixSlot, PushConstantLayout, PushConstantRecipe};
use crate::settings::SynthSettings;

/// Fragment color output of every pass but shadow casting.
pub const OUTPUT_COLOR: &str = "outputColor";
pub const MULTIVIEW_EXTENSION: &str = "GL_EXT_multiview";

/// A synthesized, not yet compiled, program.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedProgram {
    pub name: String,
    pub vertex_source: String,
    pub fragment_source: String,
    pub vertex_declarations: Vec<Declaration>,
    pub fragment_declarations: Vec<Declaration>,
    pub layout: ProgramLayout,
    pub push_constant_layout: PushConstantLayout,
    pub recipe: PushConstantRecipe,
    pub set_indexes: SetIndexes,
}

impl SynthesizedProgram {
    /// Set index of the material resources, if the program binds any.
    #[must_use]
    pub fn material_set(&self) -> Option<u32> {
        self.set_indexes.get(SetRole::PerModelLayer)
    }

    /// Hash of the material descriptor-set layout the program was built
    /// against. `None` when no material set is bound.
    #[must_use]
    pub fn material_layout_hash(&self) -> Option<u64> {
        let set = self.material_set()?;
        self.layout.set_layout(set).map(crate::layout::DescriptorSetLayout::hash)
    }

    /// Verifies the program can be handed to a compiler.
    ///
    /// Both stages must have source, the vertex stage must write
    /// `gl_Position`, and every fragment input must match a vertex output
    /// in name, location and type.
    pub fn check_completeness(&self) -> Result<()> {
        let incomplete = |reason: String| SynthError::IncompleteProgram {
            program: self.name.clone(),
            reason,
        };

        if self.vertex_source.is_empty() {
            return Err(incomplete("no vertex stage".into()));
        }
        if self.fragment_source.is_empty() {
            return Err(incomplete("no fragment stage".into()));
        }
        if !self.vertex_source.contains("gl_Position =") {
            return Err(incomplete("vertex stage never writes gl_Position".into()));
        }

        for declaration in &self.fragment_declarations {
            let Declaration::StageInput(input) = declaration else {
                continue;
            };
            let output = self.vertex_declarations.iter().find_map(|d| match d {
                Declaration::StageOutput(output) if output.name == input.name => Some(output),
                _ => None,
            });
            match output {
                None => {
                    return Err(incomplete(format!(
                        "fragment input '{}' has no vertex output",
                        input.name
                    )));
                }
                Some(output) if output.location != input.location || output.ty != input.ty => {
                    return Err(incomplete(format!(
                        "'{}' is {} at location {} in the vertex stage but {} at location {} in the fragment stage",
                        input.name, output.ty, output.location, input.ty, input.location
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

/// Whether the program reads the per-view uniform block.
#[must_use]
pub fn needs_view_block(config: &RenderConfiguration, recipe: PushConstantRecipe) -> bool {
    config.is_cubemap_multiview
        || recipe == PushConstantRecipe::ViewModel
        || config.render_pass_type == RenderPassType::Ambient
}

fn allocate_sets(ctx: &mut BuildContext<'_>, has_material: bool) {
    if needs_view_block(ctx.config, ctx.recipe) {
        ctx.sets.allocate(SetRole::PerView);
    }
    if ctx.config.render_pass_type.is_light_pass() {
        ctx.sets.allocate(SetRole::PerLight);
    }
    if ctx.config.uses_material() && has_material {
        ctx.sets.allocate(SetRole::PerModelLayer);
    }
}

fn emit_position(ctx: &BuildContext<'_>, vertex: &mut ShaderStage) -> Result<()> {
    let expression = if ctx.config.is_cubemap_multiview {
        resources::declare_view(ctx, vertex)?;
        let world = require(ctx, vertex, SynthVariable::PositionWorldSpace)?;
        format!("{VIEW_INSTANCE}.viewProjectionMatrices[gl_ViewIndex] * {world}")
    } else {
        match ctx.recipe {
            PushConstantRecipe::ModelViewProjection => {
                let position = declare_attribute(ctx, vertex, VertexAttribute::Position)?;
                format!(
                    "{} * vec4({position}, 1.0)",
                    MatrixSlot::ModelViewProjection.glsl()
                )
            }
            PushConstantRecipe::ViewProjectionOnly | PushConstantRecipe::ViewViewProjection => {
                let world = require(ctx, vertex, SynthVariable::PositionWorldSpace)?;
                format!("{} * {world}", MatrixSlot::ViewProjection.glsl())
            }
            PushConstantRecipe::ViewModel => {
                resources::declare_view(ctx, vertex)?;
                let view_position = require(ctx, vertex, SynthVariable::PositionViewSpace)?;
                format!("{VIEW_INSTANCE}.projectionMatrix * {view_position}")
            }
            PushConstantRecipe::ModelOnly | PushConstantRecipe::Nothing => {
                return Err(SynthError::Synthesis(format!(
                    "program '{}' has no projection source with the {:?} recipe",
                    ctx.config.program_name(),
                    ctx.recipe
                )));
            }
        }
    };

    vertex
        .code(Zone::Output)
        .line(format_args!("gl_Position = {expression};"));
    Ok(())
}

/// Synthesizes the program for `config`.
///
/// `material` is required by every pass that binds material resources; it
/// may be `None` for shadow casting or when drawing without a material.
pub fn synthesize(
    config: &RenderConfiguration,
    material: Option<&dyn MaterialInterface>,
    settings: &SynthSettings,
) -> Result<SynthesizedProgram> {
    let name = config.program_name();
    let mut ctx = BuildContext::new(config, settings);
    allocate_sets(&mut ctx, material.is_some());

    let mut vertex = ShaderStage::new(StageKind::Vertex);
    let mut fragment = ShaderStage::new(StageKind::Fragment);

    if config.is_cubemap_multiview {
        vertex.enable_extension(MULTIVIEW_EXTENSION);
    }

    if let Some(block) = ctx.recipe.push_constant_block() {
        vertex.declare(Declaration::PushConstantBlock(block));
    }

    if let (Some(set), Some(material)) = (ctx.sets.get(SetRole::PerModelLayer), material) {
        let (vertex_decls, fragment_decls) = material.declarations(set);
        for declaration in vertex_decls {
            vertex.declare(declaration);
        }
        for declaration in fragment_decls {
            fragment.declare(declaration);
        }
    }

    let pass = config.render_pass_type;
    if pass != RenderPassType::ShadowCasting {
        fragment.declare(Declaration::StageOutput(StageVariable::new(
            0,
            GlslType::Vec4,
            OUTPUT_COLOR,
        )));
    }

    emit_position(&ctx, &mut vertex)?;

    let surface = material.map(MaterialInterface::surface).unwrap_or_default();
    let inputs = SurfaceInputs {
        material: material.map_or("<none>", MaterialInterface::name),
        surface: &surface,
        caps: config.material_caps,
    };

    if pass != RenderPassType::ShadowCasting {
        forward_surface_inputs(&mut ctx, &mut vertex, &mut fragment, inputs.caps)?;
    }

    match pass {
        RenderPassType::Simple => unlit::emit_simple(&ctx, &mut fragment, &inputs),
        RenderPassType::TBNSpace => {
            unlit::emit_tbn_space(&mut ctx, &mut vertex, &mut fragment, &inputs)?;
        }
        RenderPassType::ShadowCasting => {
            unlit::emit_shadow_casting(&mut ctx, &mut vertex, &mut fragment)?;
        }
        RenderPassType::Ambient => ambient::emit(&mut ctx, &mut vertex, &mut fragment, &inputs)?,
        RenderPassType::DirectionalNoShadow
        | RenderPassType::Directional
        | RenderPassType::DirectionalCSM
        | RenderPassType::PointNoShadow
        | RenderPassType::Point
        | RenderPassType::SpotNoShadow
        | RenderPassType::Spot => {
            light::emit_light_pass(&mut ctx, &mut vertex, &mut fragment, &inputs)?;
        }
    }

    let mut builder = ResourceLayoutBuilder::new(ctx.sets.count());
    let vertex_interface = builder.add_stage(ShaderStages::VERTEX, vertex.declarations())?;
    let fragment_interface = builder.add_stage(ShaderStages::FRAGMENT, fragment.declarations())?;
    let push_constant_layout = PushConstantLayout::from_block(
        builder.push_constant_block(),
        builder.push_constant_stages(),
    )?;
    let layout = builder.build();

    let glsl_version = ctx.settings.glsl_version.as_str();
    let program = SynthesizedProgram {
        vertex_source: vertex.assemble(glsl_version, &vertex_interface),
        fragment_source: fragment.assemble(glsl_version, &fragment_interface),
        vertex_declarations: vertex.declarations().to_vec(),
        fragment_declarations: fragment.declarations().to_vec(),
        layout,
        push_constant_layout,
        recipe: ctx.recipe,
        set_indexes: ctx.sets.assignments(),
        name,
    };

    debug!(
        "Synthesized program '{}': {} sets, {} stage links, {} push-constant bytes",
        program.name,
        program.set_indexes.len(),
        ctx.location_count(),
        program.push_constant_layout.total_bytes
    );

    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GeometryFlags, InstancingMode, LightType};

    fn config(pass: RenderPassType) -> RenderConfiguration {
        RenderConfiguration {
            render_pass_type: pass,
            light_type: pass.light_type(),
            geometry: GeometryFlags::NORMALS | GeometryFlags::TANGENTS | GeometryFlags::TEXCOORDS,
            ..Default::default()
        }
    }

    #[test]
    fn test_simple_pass_uses_mvp() {
        let program =
            synthesize(&config(RenderPassType::Simple), None, &SynthSettings::default()).unwrap();
        assert!(
            program
                .vertex_source
                .contains("gl_Position = pc.modelViewProjectionMatrix * vec4(vaPosition, 1.0);")
        );
        assert!(program.fragment_source.contains("layout(location = 0) out vec4 outputColor;"));
        assert_eq!(program.push_constant_layout.total_bytes, 64);
        assert!(program.set_indexes.is_empty());
        program.check_completeness().unwrap();
    }

    #[test]
    fn test_light_pass_sets() {
        let program = synthesize(
            &config(RenderPassType::PointNoShadow),
            None,
            &SynthSettings::default(),
        )
        .unwrap();
        assert_eq!(program.set_indexes.get(SetRole::PerView), Some(0));
        assert_eq!(program.set_indexes.get(SetRole::PerLight), Some(1));
        assert_eq!(program.set_indexes.get(SetRole::PerModelLayer), None);
        assert!(program.vertex_source.contains("view.projectionMatrix * PositionViewSpace"));
        program.check_completeness().unwrap();
    }

    #[test]
    fn test_cube_shadow_casting_writes_linear_depth() {
        let config = RenderConfiguration {
            is_cubemap_multiview: true,
            ..config(RenderPassType::ShadowCasting)
        };
        let program = synthesize(&config, None, &SynthSettings::default()).unwrap();
        assert!(program.vertex_source.contains("#extension GL_EXT_multiview : enable"));
        assert!(
            program
                .vertex_source
                .contains("view.viewProjectionMatrices[gl_ViewIndex] * PositionWorldSpace")
        );
        assert!(program.fragment_source.contains(
            "gl_FragDepth = length(vPositionWorldSpace.xyz - view.worldPosition.xyz) / view.viewProperties.w;"
        ));
        assert!(!program.fragment_source.contains(OUTPUT_COLOR));
    }

    #[test]
    fn test_instanced_multiview_pushes_nothing() {
        let config = RenderConfiguration {
            is_cubemap_multiview: true,
            instancing_mode: InstancingMode::Multiple,
            ..config(RenderPassType::ShadowCasting)
        };
        let program = synthesize(&config, None, &SynthSettings::default()).unwrap();
        assert!(program.push_constant_layout.is_empty());
        assert!(program.layout.push_constant_ranges.is_empty());
        assert!(program.vertex_source.contains("vaModelMatrix"));
    }

    #[test]
    fn test_pbr_point_shadow_is_unsupported() {
        let config = RenderConfiguration {
            shading_model: crate::config::ShadingModel::Pbr,
            light_type: LightType::Point,
            ..config(RenderPassType::Point)
        };
        let err = synthesize(&config, None, &SynthSettings::default()).unwrap_err();
        assert!(matches!(err, SynthError::Unsupported(_)));
    }

    #[test]
    fn test_mismatched_link_is_incomplete() {
        let mut program = synthesize(
            &config(RenderPassType::DirectionalNoShadow),
            None,
            &SynthSettings::default(),
        )
        .unwrap();
        program.check_completeness().unwrap();

        program
            .vertex_declarations
            .retain(|d| !matches!(d, Declaration::StageOutput(_)));
        let err = program.check_completeness().unwrap_err();
        assert!(matches!(err, SynthError::IncompleteProgram { .. }));
    }
}
