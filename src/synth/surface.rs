//! Surface description of a material.
//!
//! A material describes its surface as GLSL expressions evaluated in the
//! fragment stage. Missing expressions fall back to the defaults below.
//! Expressions may read the fragment inputs `vTextureCoordinates` and
//! `vVertexColor`, the `material` uniform block and the material samplers.

use std::borrow::Cow;

use super::code::Code;
use crate::config::{MaterialCaps, ShadingModel};
use crate::errors::{Result, SynthError};

pub const DEFAULT_SHININESS: f32 = 200.0;
pub const DEFAULT_REFLECTION_AMOUNT: f32 = 0.5;
pub const DEFAULT_REFRACTION_AMOUNT: f32 = 0.0;
pub const DEFAULT_REFRACTION_IOR: f32 = 1.0;
/// Specular tint used by Blinn-Phong when a material enables specular
/// without describing it.
pub const LOW_QUALITY_DIELECTRIC_F0: f32 = 0.5;
/// Share of the diffuse color used as ambient color.
pub const DEFAULT_AMBIENT_FACTOR: f32 = 0.05;

/// Formats a float as a GLSL literal.
#[must_use]
pub fn glsl_float(value: f32) -> String {
    let text = format!("{value:?}");
    if text.contains('.') || text.contains('e') {
        text
    } else {
        format!("{text}.0")
    }
}

/// GLSL expressions describing a surface. `None` selects the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SurfaceDescription {
    /// `vec4` base color.
    pub diffuse: Option<String>,
    /// `float`, defaults to the diffuse alpha.
    pub opacity: Option<String>,
    /// `vec3` specular color.
    pub specular: Option<String>,
    /// `float` Blinn-Phong exponent.
    pub shininess: Option<String>,
    /// `vec3` tangent-space normal in `[-1, 1]`. Required by `NORMAL_MAP`.
    pub normal: Option<String>,
    /// `vec3` ambient color.
    pub ambient: Option<String>,
    /// `vec3` emitted color.
    pub auto_illum: Option<String>,
    /// `float` occlusion term, and the `float` strength it applies with.
    pub ambient_occlusion: Option<String>,
    pub ambient_occlusion_intensity: Option<String>,
    pub reflection_amount: Option<String>,
    pub refraction_amount: Option<String>,
    pub refraction_ior: Option<String>,
    /// Name of the `samplerCube` used for reflection, refraction and IBL.
    pub environment: Option<String>,
    pub metalness: Option<String>,
    pub roughness: Option<String>,
    pub ibl_intensity: Option<String>,
}

fn or_default<'a>(expression: Option<&'a String>, default: &'static str) -> Cow<'a, str> {
    expression.map_or(Cow::Borrowed(default), |e| Cow::Borrowed(e.as_str()))
}

fn or_float(expression: Option<&String>, default: f32) -> Cow<'_, str> {
    expression.map_or_else(|| Cow::Owned(glsl_float(default)), |e| Cow::Borrowed(e.as_str()))
}

impl SurfaceDescription {
    #[must_use]
    pub fn diffuse_expr(&self) -> Cow<'_, str> {
        or_default(self.diffuse.as_ref(), "vec4(1.0)")
    }

    #[must_use]
    pub fn opacity_expr(&self) -> Cow<'_, str> {
        or_default(self.opacity.as_ref(), "surfaceDiffuse.a")
    }

    #[must_use]
    pub fn specular_expr(&self) -> Cow<'_, str> {
        self.specular.as_ref().map_or_else(
            || Cow::Owned(format!("vec3({})", glsl_float(LOW_QUALITY_DIELECTRIC_F0))),
            |e| Cow::Borrowed(e.as_str()),
        )
    }

    #[must_use]
    pub fn shininess_expr(&self) -> Cow<'_, str> {
        or_float(self.shininess.as_ref(), DEFAULT_SHININESS)
    }

    #[must_use]
    pub fn ambient_expr(&self) -> Cow<'_, str> {
        self.ambient.as_ref().map_or_else(
            || Cow::Owned(format!("surfaceDiffuse.rgb * {}", glsl_float(DEFAULT_AMBIENT_FACTOR))),
            |e| Cow::Borrowed(e.as_str()),
        )
    }

    #[must_use]
    pub fn reflection_amount_expr(&self) -> Cow<'_, str> {
        or_float(self.reflection_amount.as_ref(), DEFAULT_REFLECTION_AMOUNT)
    }

    #[must_use]
    pub fn refraction_amount_expr(&self) -> Cow<'_, str> {
        or_float(self.refraction_amount.as_ref(), DEFAULT_REFRACTION_AMOUNT)
    }

    #[must_use]
    pub fn refraction_ior_expr(&self) -> Cow<'_, str> {
        or_float(self.refraction_ior.as_ref(), DEFAULT_REFRACTION_IOR)
    }

    #[must_use]
    pub fn metalness_expr(&self) -> Cow<'_, str> {
        or_default(self.metalness.as_ref(), "0.0")
    }

    #[must_use]
    pub fn roughness_expr(&self) -> Cow<'_, str> {
        or_default(self.roughness.as_ref(), "0.5")
    }

    #[must_use]
    pub fn ibl_intensity_expr(&self) -> Cow<'_, str> {
        or_default(self.ibl_intensity.as_ref(), "1.0")
    }

    #[must_use]
    pub fn ambient_occlusion_intensity_expr(&self) -> Cow<'_, str> {
        or_default(self.ambient_occlusion_intensity.as_ref(), "1.0")
    }

    /// Tangent-space normal expression. Normal-mapped materials must provide one.
    pub fn normal_expr(&self, material: &str) -> Result<&str> {
        self.normal.as_deref().ok_or_else(|| {
            SynthError::Synthesis(format!(
                "material '{material}' enables normal mapping without a normal expression"
            ))
        })
    }

    /// Environment cubemap name. Reflective or refractive materials must provide one.
    pub fn environment_sampler(&self, material: &str) -> Result<&str> {
        self.environment.as_deref().ok_or_else(|| {
            SynthError::Synthesis(format!(
                "material '{material}' reflects or refracts without an environment cubemap"
            ))
        })
    }
}

/// Writes the surface locals every color pass reads:
/// `surfaceDiffuse`, `surfaceOpacity` and, when relevant, `surfaceSpecular`,
/// `surfaceShininess`, `surfaceMetalness` and `surfaceRoughness`.
pub fn emit_surface_locals(
    code: &mut Code<'_>,
    surface: &SurfaceDescription,
    caps: MaterialCaps,
    shading: ShadingModel,
) {
    code.comment("Surface.");
    code.line(format_args!("vec4 surfaceDiffuse = {};", surface.diffuse_expr()));
    code.line(format_args!("float surfaceOpacity = {};", surface.opacity_expr()));

    match shading {
        ShadingModel::Gouraud | ShadingModel::PhongBlinn => {
            if caps.contains(MaterialCaps::SPECULAR) {
                code.line(format_args!("vec3 surfaceSpecular = {};", surface.specular_expr()));
                code.line(format_args!("float surfaceShininess = {};", surface.shininess_expr()));
            }
        }
        ShadingModel::Pbr => {
            code.line(format_args!("float surfaceMetalness = {};", surface.metalness_expr()));
            code.line(format_args!("float surfaceRoughness = {};", surface.roughness_expr()));
        }
    }
    code.blank();
}
