//! One shader stage under construction.

use std::fmt::Write;

use wgpu::ShaderStages;

use super::code::{Code, CodeBuffer, Zone};
use super::variables::SynthVariable;
use crate::layout::Declaration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl StageKind {
    #[must_use]
    pub const fn shader_stage(self) -> ShaderStages {
        match self {
            Self::Vertex => ShaderStages::VERTEX,
            Self::Fragment => ShaderStages::FRAGMENT,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        }
    }
}

/// Declarations, extensions and code of a stage.
#[derive(Debug, Clone)]
pub struct ShaderStage {
    kind: StageKind,
    extensions: Vec<&'static str>,
    declarations: Vec<Declaration>,
    code: CodeBuffer,
    computed: Vec<SynthVariable>,
}

impl ShaderStage {
    #[must_use]
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            extensions: Vec::new(),
            declarations: Vec::new(),
            code: CodeBuffer::new(),
            computed: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn enable_extension(&mut self, extension: &'static str) {
        if !self.extensions.contains(&extension) {
            self.extensions.push(extension);
        }
    }

    /// Adds a declaration unless one with the same name already exists.
    ///
    /// Returns `true` when the declaration was added.
    pub fn declare(&mut self, declaration: Declaration) -> bool {
        if self.is_declared(declaration.name()) {
            return false;
        }
        self.declarations.push(declaration);
        true
    }

    #[must_use]
    pub fn is_declared(&self, name: &str) -> bool {
        self.declarations.iter().any(|d| d.name() == name)
    }

    #[must_use]
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn code(&mut self, zone: Zone) -> Code<'_> {
        self.code.code(zone)
    }

    #[must_use]
    pub fn zone(&self, zone: Zone) -> &str {
        self.code.zone(zone)
    }

    /// Records `variable` as computed. Returns `false` if it already was.
    pub(crate) fn mark_computed(&mut self, variable: SynthVariable) -> bool {
        if self.computed.contains(&variable) {
            return false;
        }
        self.computed.push(variable);
        true
    }

    #[must_use]
    pub fn is_computed(&self, variable: SynthVariable) -> bool {
        self.computed.contains(&variable)
    }

    /// Assembles the final source.
    ///
    /// `declaration_text` is the interface text produced by the layout
    /// builder from [`Self::declarations`].
    #[must_use]
    pub fn assemble(&self, glsl_version: &str, declaration_text: &str) -> String {
        let mut source = String::with_capacity(
            declaration_text.len()
                + self.zone(Zone::Top).len()
                + self.zone(Zone::Main).len()
                + self.zone(Zone::Output).len()
                + 64,
        );

        let _ = writeln!(source, "#version {glsl_version}");
        for extension in &self.extensions {
            let _ = writeln!(source, "#extension {extension} : enable");
        }
        source.push('\n');

        source.push_str(declaration_text);
        source.push('\n');

        let top = self.zone(Zone::Top);
        if !top.is_empty() {
            source.push_str(top);
            source.push('\n');
        }

        source.push_str("void main ()\n{\n");
        source.push_str(self.zone(Zone::Main));
        source.push_str(self.zone(Zone::Output));
        source.push_str("}\n");

        source
    }
}
