use super::stage::ShaderStage;
use crate::config::RenderConfiguration;
use crate::errors::{Result, SynthError};
use crate::layout::{Declaration, GlslType, SetIndexAllocator, SetRole, StageVariable};
use crate::push_constants::PushConstantRecipe;
use crate::settings::SynthSettings;

/// Per-program synthesis state.
///
/// One context is created per program build and dropped with it. It owns
/// the stage-IO location counter and the set-index allocator, so concurrent
/// builds never share mutable state.
pub struct BuildContext<'a> {
    pub config: &'a RenderConfiguration,
    pub settings: SynthSettings,
    pub recipe: PushConstantRecipe,
    pub sets: SetIndexAllocator,
    next_location: u32,
}

impl<'a> BuildContext<'a> {
    #[must_use]
    pub fn new(config: &'a RenderConfiguration, settings: &SynthSettings) -> Self {
        Self {
            config,
            settings: settings.clone(),
            recipe: config.push_constant_recipe(),
            sets: SetIndexAllocator::new(),
            next_location: 0,
        }
    }

    /// Reserves `count` consecutive stage-IO locations.
    ///
    /// Locations are never handed out twice within a program.
    pub fn allocate_locations(&mut self, count: u32) -> u32 {
        let location = self.next_location;
        self.next_location += count;
        location
    }

    /// Locations handed out so far.
    #[inline]
    #[must_use]
    pub fn location_count(&self) -> u32 {
        self.next_location
    }

    /// Set index of an already allocated role.
    pub fn set(&self, role: SetRole) -> Result<u32> {
        self.sets.get(role).ok_or_else(|| {
            SynthError::Synthesis(format!(
                "program '{}' uses {role} resources but no set was allocated for them",
                self.config.program_name()
            ))
        })
    }

    /// Declares a matching vertex output and fragment input named `name`.
    ///
    /// Returns the name, which is the same on both sides. Linking the same
    /// name twice returns it without allocating new locations.
    pub fn link(
        &mut self,
        vertex: &mut ShaderStage,
        fragment: &mut ShaderStage,
        ty: GlslType,
        name: &str,
    ) -> String {
        if !fragment.is_declared(name) {
            let location = self.allocate_locations(ty.location_count());
            vertex.declare(Declaration::StageOutput(StageVariable::new(location, ty, name)));
            fragment.declare(Declaration::StageInput(StageVariable::new(location, ty, name)));
        }
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::stage::StageKind;

    #[test]
    fn test_locations_are_monotonic() {
        let config = RenderConfiguration::default();
        let mut ctx = BuildContext::new(&config, &SynthSettings::default());
        let mut vs = ShaderStage::new(StageKind::Vertex);
        let mut fs = ShaderStage::new(StageKind::Fragment);

        ctx.link(&mut vs, &mut fs, GlslType::Mat3, "vViewTBNMatrix");
        ctx.link(&mut vs, &mut fs, GlslType::Vec2, "vTextureCoordinates");
        ctx.link(&mut vs, &mut fs, GlslType::Vec2, "vTextureCoordinates");

        assert_eq!(ctx.location_count(), 4);
        let Declaration::StageInput(uv) = &fs.declarations()[1] else {
            panic!("expected a stage input");
        };
        assert_eq!(uv.location, 3);
        assert_eq!(vs.declarations().len(), 2);
    }
}
