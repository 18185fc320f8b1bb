//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`SynthError`] covers every way a program build can
//! fail:
//! - Shader synthesis failures (missing producers, unmet preconditions)
//! - Resource layout failures (binding conflicts, API-level layout creation)
//! - Configurations that cannot be resolved
//! - Pipeline creation failures reported by the compiler backend
//!
//! Cache key collisions are *not* errors: the program cache recovers from
//! them by rebuilding and only logs a warning.
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, SynthError>`.
//!
//! ```rust,ignore
//! use myth_synth::errors::{SynthError, Result};
//!
//! fn build() -> Result<()> {
//!     Err(SynthError::Unsupported("PBR point-light shadows".into()))
//! }
//! ```

use thiserror::Error;

/// The main error type for shader program synthesis and caching.
#[derive(Error, Debug)]
pub enum SynthError {
    // ========================================================================
    // Synthesis Errors
    // ========================================================================
    /// A requested shader variable has no producer, or a material/geometry
    /// precondition is not met.
    #[error("Shader synthesis failed: {0}")]
    Synthesis(String),

    /// The generated program is missing a stage or a cross-stage link.
    #[error("Incomplete program '{program}': {reason}")]
    IncompleteProgram {
        /// Name of the program being built
        program: String,
        /// What is missing
        reason: String,
    },

    /// A shader chunk template failed to load or render.
    #[error("Shader template error: {0}")]
    Template(#[from] minijinja::Error),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// The rendering intent cannot be turned into a concrete configuration.
    #[error("Invalid render configuration: {0}")]
    InvalidConfiguration(String),

    /// The combination is valid but not implemented.
    #[error("Unsupported render configuration: {0}")]
    Unsupported(String),

    // ========================================================================
    // Layout & Pipeline Errors
    // ========================================================================
    /// Descriptor-set or pipeline layout could not be derived or created.
    #[error("Resource layout error: {0}")]
    Layout(String),

    /// The compiler backend refused to create a shader module or pipeline.
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),
}

/// Alias for `Result<T, SynthError>`.
pub type Result<T> = std::result::Result<T, SynthError>;
