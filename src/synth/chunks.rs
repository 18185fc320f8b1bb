//! GLSL Chunk Templates
//!
//! Shadow resolution and BRDF helpers are written as minijinja templates
//! under `src/synth/chunks` and embedded into the binary. Baked parameters
//! (filter, kernel radius, sample counts, resource names) are passed as a
//! serializable context.
//!
//! Template syntax: `{$ ... $}` for blocks and `{{ ... }}` for values, so
//! GLSL braces never need escaping.

use std::borrow::Cow;
use std::sync::OnceLock;

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, UndefinedBehavior};
use rust_embed::RustEmbed;
use serde::Serialize;

use crate::errors::Result;

#[derive(RustEmbed)]
#[folder = "src/synth/chunks"]
struct ChunkAssets;

static CHUNK_ENV: OnceLock<Environment<'static>> = OnceLock::new();

fn build_environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();

    let syntax = SyntaxConfig::builder()
        .block_delimiters("{$", "$}")
        .variable_delimiters("{{", "}}")
        .build()?;

    env.set_syntax(syntax);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_loader(chunk_loader);

    Ok(env)
}

/// The shared template environment.
pub fn environment() -> Result<&'static Environment<'static>> {
    if let Some(env) = CHUNK_ENV.get() {
        return Ok(env);
    }
    let env = build_environment()?;
    Ok(CHUNK_ENV.get_or_init(|| env))
}

fn chunk_loader(name: &str) -> std::result::Result<Option<String>, minijinja::Error> {
    let filename = if std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("glsl"))
    {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.glsl"))
    };

    if let Some(file) = ChunkAssets::get(&filename)
        && let Ok(source) = std::str::from_utf8(file.data.as_ref())
    {
        return Ok(Some(source.to_string()));
    }

    Ok(None)
}

/// Renders the chunk `name` with `context`.
pub fn render<S: Serialize>(name: &str, context: &S) -> Result<String> {
    let template = environment()?.get_template(name)?;
    Ok(template.render(context)?)
}

// ─── Chunk Parameters ────────────────────────────────────────────────────────

/// Parameters shared by the three shadow chunks.
#[derive(Debug, Clone, Serialize)]
pub struct ShadowChunk<'a> {
    /// [`ShadowFilter::as_str`](crate::config::ShadowFilter::as_str).
    pub filter: &'a str,
    pub radius: u32,
    pub sample_count: u32,
    pub gather_offset: u32,
    pub max_cascades: u32,
    pub shadow_map: &'a str,
    pub light: &'a str,
    /// Light-space position (2D maps).
    pub position: &'a str,
    /// Light-to-fragment direction (cube maps).
    pub direction: &'a str,
    /// World and view-space positions (cascades).
    pub world_position: &'a str,
    pub view_position: &'a str,
    pub discard_unlit: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BrdfChunk {
    pub with_ibl: bool,
}
