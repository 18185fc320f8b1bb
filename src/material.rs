//! Standard Material
//!
//! A capability-driven material covering the Blinn-Phong and PBR surface
//! models. Its uniform block and sampler list depend on its capabilities,
//! so two materials with the same capabilities share a layout hash and can
//! share programs.
//!
//! ```rust,ignore
//! use myth_synth::{MaterialCaps, StandardMaterial};
//!
//! let brick = StandardMaterial::phong("brick", MaterialCaps::TEXTURE | MaterialCaps::NORMAL_MAP);
//! let gold = StandardMaterial::physical("gold", MaterialCaps::empty());
//! ```

use glam::{Vec3, Vec4};
use smallvec::{SmallVec, smallvec};

use crate::config::{MaterialCaps, MaterialShading};
use crate::interfaces::MaterialInterface;
use crate::layout::{GlslType, SamplerDeclaration, Std140Layout, UniformBlock};
use crate::synth::SurfaceDescription;
use crate::synth::resources::MATERIAL_INSTANCE;
use crate::synth::surface::{
    DEFAULT_REFLECTION_AMOUNT, DEFAULT_REFRACTION_AMOUNT, DEFAULT_REFRACTION_IOR, DEFAULT_SHININESS,
};

pub const MATERIAL_BLOCK: &str = "Material";

const UV: &str = "vTextureCoordinates";

/// Sampler slots in binding order. The first slot whose capability is set
/// gets the first sampler binding.
const TEXTURE_SLOTS: [(MaterialCaps, GlslType, &str); 5] = [
    (MaterialCaps::TEXTURE, GlslType::Sampler2D, "diffuseMap"),
    (MaterialCaps::NORMAL_MAP, GlslType::Sampler2D, "normalMap"),
    (MaterialCaps::OPACITY, GlslType::Sampler2D, "opacityMap"),
    (MaterialCaps::AUTO_ILLUM, GlslType::Sampler2D, "autoIllumMap"),
    (MaterialCaps::AMBIENT_OCCLUSION, GlslType::Sampler2D, "ambientOcclusionMap"),
];
const ENVIRONMENT_MAP: &str = "environmentMap";

/// Values uploaded into the material uniform block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialParams {
    pub diffuse_color: Vec4,
    pub specular_color: Vec3,
    pub shininess: f32,
    pub metalness: f32,
    pub roughness: f32,
    pub reflection_amount: f32,
    pub refraction_amount: f32,
    pub refraction_ior: f32,
    pub ambient_occlusion_intensity: f32,
    pub ibl_intensity: f32,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            diffuse_color: Vec4::ONE,
            specular_color: Vec3::splat(1.0),
            shininess: DEFAULT_SHININESS,
            metalness: 0.0,
            roughness: 0.5,
            reflection_amount: DEFAULT_REFLECTION_AMOUNT,
            refraction_amount: DEFAULT_REFRACTION_AMOUNT,
            refraction_ior: DEFAULT_REFRACTION_IOR,
            ambient_occlusion_intensity: 1.0,
            ibl_intensity: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StandardMaterial {
    name: String,
    shading: MaterialShading,
    caps: MaterialCaps,
    pub params: MaterialParams,
}

impl StandardMaterial {
    #[must_use]
    pub fn new(name: impl Into<String>, shading: MaterialShading, caps: MaterialCaps) -> Self {
        Self {
            name: name.into(),
            shading,
            caps,
            params: MaterialParams::default(),
        }
    }

    #[must_use]
    pub fn phong(name: impl Into<String>, caps: MaterialCaps) -> Self {
        Self::new(name, MaterialShading::Standard, caps)
    }

    #[must_use]
    pub fn physical(name: impl Into<String>, caps: MaterialCaps) -> Self {
        Self::new(name, MaterialShading::Physical, caps)
    }

    #[inline]
    fn is_physical(&self) -> bool {
        self.shading == MaterialShading::Physical
    }

    #[inline]
    fn has_specular(&self) -> bool {
        !self.is_physical() && self.caps.contains(MaterialCaps::SPECULAR)
    }

    /// The uniform block contents, packed with the std140 offsets the
    /// shader declares.
    #[must_use]
    pub fn uniform_bytes(&self) -> Vec<u8> {
        let block = self.block(0, 0);
        let layout = Std140Layout::compute(&block.members);
        let mut bytes = vec![0u8; layout.size as usize];

        for (member, &offset) in block.members.iter().zip(layout.offsets.iter()) {
            let p = &self.params;
            let value: SmallVec<[f32; 4]> = match member.name.as_str() {
                "diffuseColor" => SmallVec::from_slice(&p.diffuse_color.to_array()),
                "specularColor" => SmallVec::from_slice(&p.specular_color.to_array()),
                "shininess" => smallvec![p.shininess],
                "metalness" => smallvec![p.metalness],
                "roughness" => smallvec![p.roughness],
                "reflectionAmount" => smallvec![p.reflection_amount],
                "refractionAmount" => smallvec![p.refraction_amount],
                "refractionIOR" => smallvec![p.refraction_ior],
                "ambientOcclusionIntensity" => smallvec![p.ambient_occlusion_intensity],
                "iblIntensity" => smallvec![p.ibl_intensity],
                _ => continue,
            };
            let src: &[u8] = bytemuck::cast_slice(value.as_slice());
            let start = offset as usize;
            bytes[start..start + src.len()].copy_from_slice(src);
        }

        bytes
    }

    fn block(&self, set: u32, binding: u32) -> UniformBlock {
        let mut block = UniformBlock::new(set, binding, MATERIAL_BLOCK, MATERIAL_INSTANCE)
            .with(GlslType::Vec4, "diffuseColor");

        if self.has_specular() {
            block = block
                .with(GlslType::Vec3, "specularColor")
                .with(GlslType::Float, "shininess");
        }
        if self.is_physical() {
            block = block
                .with(GlslType::Float, "metalness")
                .with(GlslType::Float, "roughness");
            if self.caps.intersects(MaterialCaps::ENVIRONMENT) {
                block = block.with(GlslType::Float, "iblIntensity");
            }
        } else {
            if self.caps.contains(MaterialCaps::REFLECTION) {
                block = block.with(GlslType::Float, "reflectionAmount");
            }
            if self.caps.contains(MaterialCaps::REFRACTION) {
                block = block
                    .with(GlslType::Float, "refractionAmount")
                    .with(GlslType::Float, "refractionIOR");
            }
        }
        if self.caps.contains(MaterialCaps::AMBIENT_OCCLUSION) {
            block = block.with(GlslType::Float, "ambientOcclusionIntensity");
        }

        block
    }
}

impl MaterialInterface for StandardMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn shading(&self) -> MaterialShading {
        self.shading
    }

    fn caps(&self) -> MaterialCaps {
        self.caps
    }

    fn uniform_block(&self, set: u32, binding: u32) -> Option<UniformBlock> {
        Some(self.block(set, binding))
    }

    fn samplers(&self, set: u32, first_binding: u32) -> Vec<SamplerDeclaration> {
        TEXTURE_SLOTS
            .iter()
            .filter(|(cap, _, _)| self.caps.contains(*cap))
            .map(|&(_, ty, name)| (ty, name))
            .chain(
                self.caps
                    .intersects(MaterialCaps::ENVIRONMENT)
                    .then_some((GlslType::SamplerCube, ENVIRONMENT_MAP)),
            )
            .zip(first_binding..)
            .map(|((ty, name), binding)| SamplerDeclaration::new(set, binding, ty, name))
            .collect()
    }

    fn surface(&self) -> SurfaceDescription {
        let caps = self.caps;
        let mut diffuse = format!("{MATERIAL_INSTANCE}.diffuseColor");
        if caps.contains(MaterialCaps::TEXTURE) {
            diffuse.push_str(&format!(" * texture(diffuseMap, {UV})"));
        }
        if caps.contains(MaterialCaps::VERTEX_COLOR) {
            diffuse.push_str(" * vVertexColor");
        }

        let mut surface = SurfaceDescription {
            diffuse: Some(diffuse),
            ..Default::default()
        };

        if caps.contains(MaterialCaps::OPACITY) {
            surface.opacity = Some(format!("surfaceDiffuse.a * texture(opacityMap, {UV}).r"));
        }
        if self.has_specular() {
            surface.specular = Some(format!("{MATERIAL_INSTANCE}.specularColor"));
            surface.shininess = Some(format!("{MATERIAL_INSTANCE}.shininess"));
        }
        if caps.contains(MaterialCaps::NORMAL_MAP) {
            surface.normal = Some(format!("texture(normalMap, {UV}).xyz * 2.0 - 1.0"));
        }
        if caps.contains(MaterialCaps::AUTO_ILLUM) {
            surface.auto_illum = Some(format!("texture(autoIllumMap, {UV}).rgb"));
        }
        if caps.contains(MaterialCaps::AMBIENT_OCCLUSION) {
            surface.ambient_occlusion = Some(format!("texture(ambientOcclusionMap, {UV}).r"));
            surface.ambient_occlusion_intensity =
                Some(format!("{MATERIAL_INSTANCE}.ambientOcclusionIntensity"));
        }
        if caps.intersects(MaterialCaps::ENVIRONMENT) {
            surface.environment = Some(ENVIRONMENT_MAP.to_string());
        }

        if self.is_physical() {
            surface.metalness = Some(format!("{MATERIAL_INSTANCE}.metalness"));
            surface.roughness = Some(format!("{MATERIAL_INSTANCE}.roughness"));
            if caps.intersects(MaterialCaps::ENVIRONMENT) {
                surface.ibl_intensity = Some(format!("{MATERIAL_INSTANCE}.iblIntensity"));
            }
        } else {
            if caps.contains(MaterialCaps::REFLECTION) {
                surface.reflection_amount = Some(format!("{MATERIAL_INSTANCE}.reflectionAmount"));
            }
            if caps.contains(MaterialCaps::REFRACTION) {
                surface.refraction_amount = Some(format!("{MATERIAL_INSTANCE}.refractionAmount"));
                surface.refraction_ior = Some(format!("{MATERIAL_INSTANCE}.refractionIOR"));
            }
        }

        surface
    }
}
