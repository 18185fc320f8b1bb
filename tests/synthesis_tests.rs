//! Program Synthesis Tests
//!
//! Tests for:
//! - Deterministic source and layout generation
//! - Push-constant layout vs per-draw upload for every recipe
//! - Ambient pass isolation from light resources
//! - Shadow resolution code (PCF grid, cascade selection)
//! - Completeness of every resolvable pass

mod common;

use glam::Mat4;

use myth_synth::layout::SetRole;
use myth_synth::shadow::{CascadeSplits, CascadedLight};
use myth_synth::{
    GeometryFlags, InstancingMode, LightDescriptor, LightType, MaterialCaps, MaterialInterface,
    MatrixInputs, PushConstantRecipe, PushConstantStrategy, RenderConfiguration, RenderIntent,
    RenderPassType, ShadowFilter, StandardMaterial, SynthError, SynthSettings, TargetShape,
    resolve, synthesize,
};

fn intent(pass: Option<RenderPassType>, material: &StandardMaterial) -> RenderIntent {
    RenderIntent {
        geometry: GeometryFlags::all(),
        ..RenderIntent::for_material(pass, material)
    }
}

fn lit(light: LightDescriptor, material: &StandardMaterial) -> RenderIntent {
    RenderIntent {
        light: Some(light),
        ..intent(None, material)
    }
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn same_configuration_synthesizes_identical_programs() {
    common::init_logger();
    let settings = SynthSettings::default();
    let material = StandardMaterial::phong(
        "brick",
        MaterialCaps::TEXTURE | MaterialCaps::NORMAL_MAP | MaterialCaps::SPECULAR,
    );
    let config = resolve(
        &lit(LightDescriptor::new(LightType::Spot).with_shadows(), &material),
        &settings,
    )
    .unwrap();

    let first = synthesize(&config, Some(&material), &settings).unwrap();
    let second = synthesize(&config, Some(&material), &settings).unwrap();

    assert_eq!(first.vertex_source, second.vertex_source);
    assert_eq!(first.fragment_source, second.fragment_source);
    assert_eq!(first.layout, second.layout);
    assert_eq!(first, second);
}

#[test]
fn material_set_hash_matches_material_layout_hash() {
    let settings = SynthSettings::default();
    let material = StandardMaterial::physical("gold", MaterialCaps::TEXTURE | MaterialCaps::REFLECTION);
    let config = resolve(&intent(Some(RenderPassType::Ambient), &material), &settings).unwrap();

    let program = synthesize(&config, Some(&material), &settings).unwrap();

    assert!(program.material_set().is_some());
    assert_eq!(program.material_layout_hash(), Some(material.layout_hash()));
}

// ============================================================================
// Layout / Upload Consistency
// ============================================================================

#[test]
fn upload_size_matches_declared_push_constants_for_every_recipe() {
    let settings = SynthSettings::default();
    let material = StandardMaterial::phong("plain", MaterialCaps::empty());
    let point = LightDescriptor::new(LightType::Point);
    let cube = TargetShape {
        is_cubemap: true,
        is_cascaded: false,
    };

    let cases = [
        (intent(Some(RenderPassType::Simple), &material), PushConstantRecipe::ModelViewProjection),
        (lit(point, &material), PushConstantRecipe::ViewModel),
        (
            RenderIntent {
                billboarding: true,
                ..intent(Some(RenderPassType::Simple), &material)
            },
            PushConstantRecipe::ViewModel,
        ),
        (
            RenderIntent {
                target: cube,
                ..intent(Some(RenderPassType::ShadowCasting), &material)
            },
            PushConstantRecipe::ModelOnly,
        ),
        (
            RenderIntent {
                instancing_mode: InstancingMode::Multiple,
                ..intent(Some(RenderPassType::Simple), &material)
            },
            PushConstantRecipe::ViewProjectionOnly,
        ),
        (
            RenderIntent {
                instancing_mode: InstancingMode::Multiple,
                ..lit(point, &material)
            },
            PushConstantRecipe::ViewViewProjection,
        ),
        (
            RenderIntent {
                instancing_mode: InstancingMode::Multiple,
                target: cube,
                ..intent(Some(RenderPassType::ShadowCasting), &material)
            },
            PushConstantRecipe::Nothing,
        ),
    ];

    let inputs = MatrixInputs {
        model: Mat4::from_translation(glam::Vec3::X),
        ..Default::default()
    };

    for (intent, expected) in cases {
        let config = resolve(&intent, &settings).unwrap();
        assert_eq!(config.push_constant_recipe(), expected, "{}", config.program_name());

        let program = synthesize(&config, Some(&material), &settings).unwrap();
        let payload = PushConstantStrategy::write(&program.push_constant_layout, &inputs);

        assert_eq!(payload.len() as u32, program.layout.push_constant_size());
        assert_eq!(payload.len() as u32, expected.byte_size());
        program.check_completeness().unwrap();
    }
}

// ============================================================================
// Ambient Isolation
// ============================================================================

#[test]
fn ambient_pass_never_references_light_resources() {
    let settings = SynthSettings::default();
    let materials = [
        StandardMaterial::phong("plain", MaterialCaps::empty()),
        StandardMaterial::phong(
            "chrome",
            MaterialCaps::REFLECTION | MaterialCaps::REFRACTION | MaterialCaps::AUTO_ILLUM,
        ),
        StandardMaterial::physical("ibl", MaterialCaps::REFLECTION | MaterialCaps::AMBIENT_OCCLUSION),
    ];

    for material in &materials {
        let config = resolve(&intent(Some(RenderPassType::Ambient), material), &settings).unwrap();
        let program = synthesize(&config, Some(material), &settings).unwrap();

        for source in [&program.vertex_source, &program.fragment_source] {
            assert!(!source.contains("uniform Light"), "{}", material.name());
            assert!(!source.contains("light."), "{}", material.name());
        }
        assert_eq!(program.set_indexes.get(SetRole::PerLight), None);
        assert!(program.fragment_source.contains("view.ambientLightColor"));
    }
}

// ============================================================================
// Shadows
// ============================================================================

#[test]
fn grid_pcf_radius_one_accumulates_nine_samples() {
    let settings = SynthSettings {
        shadow_filter: ShadowFilter::Grid,
        pcf_kernel_radius: 1,
        ..Default::default()
    };
    let material = StandardMaterial::phong("plain", MaterialCaps::empty());
    let config = resolve(
        &lit(LightDescriptor::new(LightType::Directional).with_shadows(), &material),
        &settings,
    )
    .unwrap();
    assert_eq!(config.render_pass_type, RenderPassType::Directional);

    let program = synthesize(&config, Some(&material), &settings).unwrap();

    assert!(program.fragment_source.contains("const int offset = 1;"));
    assert!(program.fragment_source.contains("shadowFactor /= 9.0;"));
    assert!(program.vertex_source.contains("light.viewProjectionMatrix"));
}

#[test]
fn shadowed_2d_lookups_apply_light_bias_for_every_filter() {
    let material = StandardMaterial::phong("plain", MaterialCaps::empty());
    let filters = [
        ShadowFilter::None,
        ShadowFilter::Grid,
        ShadowFilter::VogelDisk,
        ShadowFilter::PoissonDisk,
        ShadowFilter::OptimizedGather,
    ];

    for shadow_filter in filters {
        let settings = SynthSettings {
            shadow_filter,
            ..Default::default()
        };
        for light_type in [LightType::Spot, LightType::Directional] {
            let config = resolve(&lit(LightDescriptor::new(light_type).with_shadows(), &material), &settings)
                .unwrap();
            let program = synthesize(&config, Some(&material), &settings).unwrap();

            assert!(
                program
                    .fragment_source
                    .contains("shadowCoords.z -= light.shadowBias * shadowCoords.w;"),
                "{}",
                config.program_name()
            );
        }
    }
}

#[test]
fn cascade_selection_matches_emitted_rule() {
    let settings = SynthSettings::default();
    let material = StandardMaterial::phong("plain", MaterialCaps::empty());
    let config = resolve(
        &lit(LightDescriptor::new(LightType::Directional).with_csm(), &material),
        &settings,
    )
    .unwrap();
    let program = synthesize(&config, Some(&material), &settings).unwrap();

    // The fragment code walks the splits front to back and falls back to the
    // last cascade, the same as `CascadeSplits::select`.
    assert!(program.fragment_source.contains("int cascadeIndex = cascadeCount - 1;"));
    assert!(program.fragment_source.contains("if ( viewDepth < light.splitDistances[i] )"));

    let splits = CascadeSplits::for_configuration(&config, 0.1, 100.0, 0.5).unwrap();
    assert_eq!(splits.count(), settings.effective_cascade_count());
    assert!(splits.distances().windows(2).all(|pair| pair[0] < pair[1]));
    assert!((splits.distances()[3] - 100.0).abs() < f32::EPSILON);
    for (cascade, &split) in splits.distances().iter().enumerate() {
        assert_eq!(splits.select(split - 0.01), cascade as u32);
    }
}

/// Offset of `name` as written in the `layout(offset = N)` qualifiers.
fn declared_offset(source: &str, ty: &str, name: &str) -> usize {
    let suffix = format!(") {ty} {name};");
    let line = source
        .lines()
        .find(|line| line.trim_end().ends_with(&suffix))
        .unwrap_or_else(|| panic!("'{name}' is not declared"));
    let start = line.find("offset = ").unwrap() + "offset = ".len();
    let end = start + line[start..].find(')').unwrap();
    line[start..end].parse().unwrap()
}

#[test]
fn cascaded_light_bytes_match_declared_block() {
    let settings = SynthSettings {
        cascade_count: 3,
        ..Default::default()
    };
    let material = StandardMaterial::phong("plain", MaterialCaps::empty());
    let config = resolve(
        &lit(LightDescriptor::new(LightType::Directional).with_csm(), &material),
        &settings,
    )
    .unwrap();
    let program = synthesize(&config, Some(&material), &settings).unwrap();

    let mut light = CascadedLight::new(CascadeSplits::for_configuration(&config, 0.5, 200.0, 0.75).unwrap());
    light.shadow_bias = 0.002;
    let bytes = light.uniform_bytes();

    let light_set = program.set_indexes.get(SetRole::PerLight).unwrap();
    let binding = program.layout.set_layout(light_set).unwrap().binding(0).unwrap();
    assert_eq!(
        binding.kind,
        myth_synth::layout::DescriptorKind::UniformBuffer { size: bytes.len() as u32 }
    );

    let source = &program.fragment_source;
    let read_f32 = |offset: usize| f32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
    let read_u32 = |offset: usize| u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());

    let splits_at = declared_offset(source, "vec4", "splitDistances");
    assert_eq!(light.splits.count(), 3);
    for (cascade, &split) in light.splits.distances().iter().enumerate() {
        assert_eq!(read_f32(splits_at + cascade * 4), split);
    }
    assert_eq!(read_f32(splits_at + 8), 200.0);

    assert_eq!(read_u32(declared_offset(source, "uint", "cascadeCount")), 3);
    assert_eq!(read_f32(declared_offset(source, "float", "shadowBias")), 0.002);

    let matrices_at = declared_offset(source, "mat4", "cascadeViewProjectionMatrices[4]");
    assert_eq!(read_f32(matrices_at + 64), 1.0);

    let plain = resolve(&lit(LightDescriptor::new(LightType::Directional), &material), &settings).unwrap();
    assert!(CascadeSplits::for_configuration(&plain, 0.5, 200.0, 0.75).is_err());
}

#[test]
fn point_shadows_use_cube_lookup() {
    let settings = SynthSettings::default();
    let material = StandardMaterial::phong("plain", MaterialCaps::empty());
    let config = resolve(
        &lit(LightDescriptor::new(LightType::Point).with_shadows(), &material),
        &settings,
    )
    .unwrap();
    let program = synthesize(&config, Some(&material), &settings).unwrap();

    assert!(program.fragment_source.contains("uniform samplerCube shadowMap;"));
    assert!(program.fragment_source.contains("vDirectionWorldSpace"));
}

#[test]
fn pbr_with_point_shadows_is_unsupported() {
    let material = StandardMaterial::physical("metal", MaterialCaps::empty());
    let result = resolve(
        &lit(LightDescriptor::new(LightType::Point).with_shadows(), &material),
        &SynthSettings::default(),
    );
    assert!(matches!(result, Err(SynthError::Unsupported(_))));
}

// ============================================================================
// Completeness
// ============================================================================

#[test]
fn every_light_pass_is_complete_for_each_shading_model() {
    let lights = [
        LightDescriptor::new(LightType::Directional),
        LightDescriptor::new(LightType::Directional).with_shadows(),
        LightDescriptor::new(LightType::Directional).with_csm(),
        LightDescriptor::new(LightType::Point),
        LightDescriptor::new(LightType::Point).with_shadows(),
        LightDescriptor::new(LightType::Spot),
        LightDescriptor::new(LightType::Spot).with_shadows(),
    ];
    let caps = MaterialCaps::TEXTURE | MaterialCaps::NORMAL_MAP | MaterialCaps::SPECULAR;
    let materials = [
        StandardMaterial::phong("phong", caps),
        StandardMaterial::physical("pbr", caps),
    ];

    for high_quality_lighting in [true, false] {
        let settings = SynthSettings {
            high_quality_lighting,
            ..Default::default()
        };
        for material in &materials {
            for light in lights {
                let config = match resolve(&lit(light, material), &settings) {
                    Ok(config) => config,
                    Err(SynthError::Unsupported(_)) => continue,
                    Err(err) => panic!("{light:?}: {err}"),
                };
                let program = synthesize(&config, Some(material), &settings)
                    .unwrap_or_else(|err| panic!("{}: {err}", config.program_name()));
                program
                    .check_completeness()
                    .unwrap_or_else(|err| panic!("{}: {err}", config.program_name()));
                assert!(program.fragment_source.contains("outputColor ="));
            }
        }
    }
}

#[test]
fn tbn_debug_pass_requires_tangents() {
    let settings = SynthSettings::default();
    let material = StandardMaterial::phong("bumpy", MaterialCaps::NORMAL_MAP | MaterialCaps::TEXTURE);
    let mut config: RenderConfiguration =
        resolve(&intent(Some(RenderPassType::TBNSpace), &material), &settings).unwrap();

    let program = synthesize(&config, Some(&material), &settings).unwrap();
    program.check_completeness().unwrap();

    config.geometry.remove(GeometryFlags::TANGENTS);
    let result = synthesize(&config, Some(&material), &settings);
    assert!(matches!(result, Err(SynthError::Synthesis(_))));
}
