use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};

use criterion::{Criterion, criterion_group, criterion_main};
use wgpu::ShaderStages;

use myth_synth::cache::{
    PipelineHandle, PipelineLayoutHandle, ProgramCompatibility, ShaderModuleHandle,
};
use myth_synth::{
    GeometryFlags, LightDescriptor, LightType, MaterialCaps, MaterialInterface, MatrixInputs,
    PipelineCompiler, PipelineDescriptor, ProgramBuilder, ProgramCache, ProgramCacheKey,
    ProgramLayout, PushConstantStrategy, RenderIntent, RenderPassType, RenderTargetId,
    RenderTargetInterface, Result, StandardMaterial, SynthSettings, resolve, synthesize,
};

#[derive(Default)]
struct NullCompiler {
    next: AtomicU64,
}

impl NullCompiler {
    fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl PipelineCompiler for NullCompiler {
    fn create_shader_module(&self, _: ShaderStages, _: &str, _: &str) -> Result<ShaderModuleHandle> {
        Ok(ShaderModuleHandle(self.next()))
    }

    fn create_pipeline_layout(&self, _: &str, _: &ProgramLayout) -> Result<PipelineLayoutHandle> {
        Ok(PipelineLayoutHandle(self.next()))
    }

    fn create_pipeline(&self, _: &PipelineDescriptor<'_>) -> Result<PipelineHandle> {
        Ok(PipelineHandle(self.next()))
    }
}

struct Screen;

impl RenderTargetInterface for Screen {
    fn id(&self) -> RenderTargetId {
        RenderTargetId(1)
    }
    fn is_cubemap(&self) -> bool {
        false
    }
    fn is_cascaded_shadow_map(&self) -> bool {
        false
    }
    fn cascade_count(&self) -> u32 {
        0
    }
    fn extent(&self) -> (u32, u32) {
        (1920, 1080)
    }
    fn render_pass_handle(&self) -> u64 {
        1
    }
}

fn spot_intent(material: &StandardMaterial) -> RenderIntent {
    RenderIntent {
        light: Some(LightDescriptor::new(LightType::Spot).with_shadows()),
        geometry: GeometryFlags::all(),
        ..RenderIntent::for_material(None, material)
    }
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

fn bench_synthesize_spot_shadow(c: &mut Criterion) {
    let settings = SynthSettings::default();
    let material = StandardMaterial::phong(
        "brick",
        MaterialCaps::TEXTURE | MaterialCaps::NORMAL_MAP | MaterialCaps::SPECULAR,
    );
    let config = resolve(&spot_intent(&material), &settings).unwrap();

    c.bench_function("synthesize_phong_spot_shadow", |b| {
        b.iter(|| black_box(synthesize(black_box(&config), Some(&material), &settings).unwrap()));
    });
}

fn bench_synthesize_pbr_ambient(c: &mut Criterion) {
    let settings = SynthSettings::default();
    let material = StandardMaterial::physical(
        "gold",
        MaterialCaps::TEXTURE | MaterialCaps::REFLECTION | MaterialCaps::AMBIENT_OCCLUSION,
    );
    let intent = RenderIntent {
        geometry: GeometryFlags::all(),
        ..RenderIntent::for_material(Some(RenderPassType::Ambient), &material)
    };
    let config = resolve(&intent, &settings).unwrap();

    c.bench_function("synthesize_pbr_ambient_ibl", |b| {
        b.iter(|| black_box(synthesize(black_box(&config), Some(&material), &settings).unwrap()));
    });
}

// ---------------------------------------------------------------------------
// Cache & draw path
// ---------------------------------------------------------------------------

fn bench_cache_hit(c: &mut Criterion) {
    let settings = SynthSettings::default();
    let builder = ProgramBuilder::new(NullCompiler::default(), settings.clone());
    let cache = ProgramCache::new();
    let material = StandardMaterial::phong("brick", MaterialCaps::TEXTURE);
    let config = resolve(&spot_intent(&material), &settings).unwrap();
    let key = ProgramCacheKey::new(&config, Screen.render_pass_handle());
    let surface = material.surface();
    let compatibility =
        ProgramCompatibility::new(&config, Some(material.layout_hash()), Some(&surface));

    cache
        .get_or_build(Screen.id(), key, &compatibility, || {
            builder.build(&config, Some(&material), &Screen)
        })
        .unwrap();

    c.bench_function("program_cache_hit", |b| {
        b.iter(|| {
            black_box(
                cache
                    .get_or_build(Screen.id(), key, &compatibility, || unreachable!())
                    .unwrap(),
            )
        });
    });

    c.bench_function("program_cache_find", |b| {
        b.iter(|| black_box(cache.find(Screen.id(), &key, &compatibility)));
    });
}

fn bench_push_constant_write(c: &mut Criterion) {
    let settings = SynthSettings::default();
    let material = StandardMaterial::phong("brick", MaterialCaps::empty());
    let config = resolve(&spot_intent(&material), &settings).unwrap();
    let program = synthesize(&config, Some(&material), &settings).unwrap();
    let inputs = MatrixInputs::default();

    c.bench_function("push_constant_write_view_model", |b| {
        b.iter(|| black_box(PushConstantStrategy::write(&program.push_constant_layout, black_box(&inputs))));
    });
}

criterion_group!(
    benches,
    bench_synthesize_spot_shadow,
    bench_synthesize_pbr_ambient,
    bench_cache_hit,
    bench_push_constant_write,
);
criterion_main!(benches);
