//! Pretty-printer utilities
//!
//! Handles the low-level string building and indentation management used
//! when turning a syntax tree back into source text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentStyle {
    Spaces(usize),
    Tabs,
}

impl Default for IndentStyle {
    fn default() -> Self {
        IndentStyle::Spaces(4)
    }
}

/// Layout options for generated source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Indentation style
    pub indent_style: IndentStyle,

    /// Insert spaces around binary operators
    pub space_around_operators: bool,

    /// Insert space after comma
    pub space_after_comma: bool,

    /// Blank lines after a function definition
    pub blank_lines_after_fn: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent_style: IndentStyle::default(),
            space_around_operators: true,
            space_after_comma: true,
            blank_lines_after_fn: 1,
        }
    }
}

impl FormatConfig {
    /// Minimal whitespace
    pub fn compact() -> Self {
        Self {
            space_around_operators: false,
            space_after_comma: false,
            blank_lines_after_fn: 0,
            ..Default::default()
        }
    }

    /// Get the indent string for one level
    pub fn indent_str(&self) -> String {
        match self.indent_style {
            IndentStyle::Spaces(n) => " ".repeat(n),
            IndentStyle::Tabs => "\t".to_string(),
        }
    }
}

/// A pretty-printer that manages indentation
pub struct Printer {
    config: FormatConfig,
    buffer: String,
    indent_level: usize,
    at_line_start: bool,
}

impl Printer {
    pub fn new(config: FormatConfig) -> Self {
        Self {
            config,
            buffer: String::new(),
            indent_level: 0,
            at_line_start: true,
        }
    }

    /// Get the formatted output
    pub fn finish(mut self) -> String {
        // Ensure final newline
        if !self.buffer.is_empty() && !self.buffer.ends_with('\n') {
            self.buffer.push('\n');
        }
        self.buffer
    }

    /// Write a string to the output
    pub fn write(&mut self, s: &str) {
        if self.at_line_start && !s.is_empty() {
            self.write_indent();
            self.at_line_start = false;
        }
        self.buffer.push_str(s);
    }

    /// Write a line (with newline)
    pub fn writeln(&mut self, s: &str) {
        self.write(s);
        self.newline();
    }

    /// Write a newline
    pub fn newline(&mut self) {
        self.buffer.push('\n');
        self.at_line_start = true;
    }

    /// Write multiple blank lines
    pub fn blank_lines(&mut self, count: usize) {
        for _ in 0..count {
            self.newline();
        }
    }

    /// Write a binary operator honoring `space_around_operators`
    pub fn operator(&mut self, op: &str) {
        if self.config.space_around_operators {
            self.write(" ");
            self.write(op);
            self.write(" ");
        } else {
            self.write(op);
        }
    }

    /// Write a list separator honoring `space_after_comma`
    pub fn comma(&mut self) {
        self.write(",");
        if self.config.space_after_comma {
            self.write(" ");
        }
    }

    /// Execute a closure with increased indentation
    pub fn indented<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Self),
    {
        self.indent_level += 1;
        f(self);
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn write_indent(&mut self) {
        let indent = self.config.indent_str().repeat(self.indent_level);
        self.buffer.push_str(&indent);
    }

    /// Get the config
    pub fn config(&self) -> &FormatConfig {
        &self.config
    }
}
