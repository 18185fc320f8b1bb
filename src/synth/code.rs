//! Zoned code accumulation.

use std::fmt::{self, Write};

/// Where a piece of stage code ends up in the assembled source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    /// Functions and constants, emitted before `main`.
    Top,
    /// Body statements of `main`, in emission order.
    Main,
    /// Final assignments of `main`, emitted after every `Main` statement.
    Output,
}

impl Zone {
    /// Indentation depth of the zone inside the assembled source.
    const fn base_indent(self) -> usize {
        match self {
            Self::Top => 0,
            Self::Main | Self::Output => 1,
        }
    }
}

/// The three code zones of one shader stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBuffer {
    top: String,
    main: String,
    output: String,
}

impl CodeBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a scoped builder appending to `zone`.
    pub fn code(&mut self, zone: Zone) -> Code<'_> {
        let target = match zone {
            Zone::Top => &mut self.top,
            Zone::Main => &mut self.main,
            Zone::Output => &mut self.output,
        };
        Code::new(target, zone.base_indent())
    }

    #[must_use]
    pub fn zone(&self, zone: Zone) -> &str {
        match zone {
            Zone::Top => &self.top,
            Zone::Main => &self.main,
            Zone::Output => &self.output,
        }
    }
}

/// Scoped line builder for one [`Zone`].
///
/// Lines accumulate in the builder and reach the zone in a single append.
/// That append happens when [`Code::finish`] is called, or when the builder
/// is dropped at the end of its lexical scope, whichever comes first. Text
/// from two builders of the same zone therefore never interleaves, and the
/// zone order matches the order in which builders were finished.
///
/// ```rust,ignore
/// let mut code = buffer.code(Zone::Main);
/// code.line("float shadowFactor = 1.0;");
/// code.open("if ( lightFactor <= 0.0 )");
/// code.line("discard;");
/// code.close();
/// code.finish();
/// ```
pub struct Code<'a> {
    target: &'a mut String,
    text: String,
    indent: usize,
}

impl<'a> Code<'a> {
    fn new(target: &'a mut String, indent: usize) -> Self {
        Self {
            target,
            text: String::new(),
            indent,
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.text.push('\t');
        }
    }

    /// Appends one indented line.
    pub fn line(&mut self, line: impl fmt::Display) -> &mut Self {
        self.write_indent();
        // Writing into a `String` cannot fail.
        let _ = writeln!(self.text, "{line}");
        self
    }

    /// Appends an empty line.
    pub fn blank(&mut self) -> &mut Self {
        self.text.push('\n');
        self
    }

    /// Appends a comment line.
    pub fn comment(&mut self, comment: &str) -> &mut Self {
        self.line(format_args!("/* {comment} */"))
    }

    /// Appends `header`, an opening brace, and indents.
    pub fn open(&mut self, header: impl fmt::Display) -> &mut Self {
        self.line(header);
        self.line("{");
        self.indent += 1;
        self
    }

    /// Dedents and appends a closing brace.
    pub fn close(&mut self) -> &mut Self {
        self.indent = self.indent.saturating_sub(1);
        self.line("}")
    }

    /// Appends a multi-line block, indenting every non-empty line.
    pub fn raw(&mut self, block: &str) -> &mut Self {
        for line in block.lines() {
            if line.trim().is_empty() {
                self.blank();
            } else {
                self.line(line);
            }
        }
        self
    }

    /// Flushes the accumulated lines into the zone.
    pub fn finish(self) {
        drop(self);
    }
}

impl Write for Code<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.text.push_str(s);
        Ok(())
    }
}

impl Drop for Code<'_> {
    fn drop(&mut self) {
        self.target.push_str(&self.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_flush_in_finish_order() {
        let mut buffer = CodeBuffer::new();

        let mut first = buffer.code(Zone::Main);
        first.line("float a = 1.0;");
        first.finish();
        {
            let mut code = buffer.code(Zone::Main);
            code.open("if ( a > 0.0 )");
            code.line("a = 0.0;");
            code.close();
        }
        buffer.code(Zone::Top).line("const float PI = 3.14159265359;");

        assert_eq!(
            buffer.zone(Zone::Main),
            "\tfloat a = 1.0;\n\tif ( a > 0.0 )\n\t{\n\t\ta = 0.0;\n\t}\n"
        );
        assert_eq!(buffer.zone(Zone::Top), "const float PI = 3.14159265359;\n");
        assert!(buffer.zone(Zone::Output).is_empty());
    }

    #[test]
    fn test_raw_indents_blocks() {
        let mut buffer = CodeBuffer::new();
        buffer.code(Zone::Output).raw("x = 1;\n\ny = 2;\n");
        assert_eq!(buffer.zone(Zone::Output), "\tx = 1;\n\n\ty = 2;\n");
    }
}
