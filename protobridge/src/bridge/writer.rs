//! Indented Go source text and import collection

use std::collections::BTreeMap;

use crate::locator::is_standard_library;

/// Go source under construction, indented with tabs the way gofmt leaves it
#[derive(Debug, Default)]
pub(crate) struct GoWriter {
    text:  String,
    depth: usize,
}

impl GoWriter {
    pub(crate) fn new() -> Self { Self::default() }

    pub(crate) fn line(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        if !line.is_empty() {
            for _ in 0..self.depth {
                self.text.push('\t');
            }
            self.text.push_str(line);
        }
        self.text.push('\n');
    }

    pub(crate) fn blank(&mut self) { self.text.push('\n'); }

    /// Write `line` and indent what follows
    pub(crate) fn open(&mut self, line: impl AsRef<str>) {
        self.line(line);
        self.depth += 1;
    }

    /// Dedent and write `line`
    pub(crate) fn close(&mut self, line: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(line);
    }

    pub(crate) fn finish(self) -> String { self.text }
}

/// Imports of one generated file, keyed by path
#[derive(Debug, Default)]
pub(crate) struct GoImports {
    entries: BTreeMap<String, Option<String>>,
}

impl GoImports {
    pub(crate) fn new() -> Self { Self::default() }

    /// Import a standard-library package under its own name
    pub(crate) fn standard(&mut self, path: &str) {
        self.entries.entry(path.to_string()).or_insert(None);
    }

    /// Import `path` under `alias`
    pub(crate) fn aliased(&mut self, path: &str, alias: &str) {
        self.entries
            .insert(path.to_string(), Some(alias.to_string()));
    }

    /// Render the import block: standard library first, then everything else
    pub(crate) fn render(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let (standard, others): (Vec<_>, Vec<_>) = self
            .entries
            .iter()
            .partition(|(path, _)| is_standard_library(path));

        let mut writer = GoWriter::new();
        writer.open("import (");
        for group in [standard, others] {
            if group.is_empty() {
                continue;
            }
            if !writer.text.ends_with("(\n") {
                writer.blank();
            }
            for (path, alias) in group {
                match alias {
                    Some(alias) => writer.line(format!("{alias} \"{path}\"")),
                    None => writer.line(format!("\"{path}\"")),
                }
            }
        }
        writer.close(")");
        writer.finish()
    }
}
