//! A human-readable report tree (§4.1), ported from the Python checker's
//! `_PayloadReport` / `Node` / `FieldNode` / `SubReportNode` / `SectionNode`
//! classes: fields and sub-reports nest under named sections, and the whole
//! thing renders as indented, column-aligned text.
//!
//! The Python version relies on `try/finally` to guarantee `Dump()` runs
//! even when a check raises partway through. [`ReportGuard`] is the
//! idiomatic substitution: a `Drop` impl that dumps the report (finalized or
//! not) when it goes out of scope, wherever that happens to be.

use std::fmt::Write as _;

enum Node {
    Field { name: String, value: String },
    SubReport { name: String, report: Report },
    Section { name: String },
}

/// A tree of fields, sections, and nested sub-reports.
#[derive(Default)]
pub struct Report {
    nodes: Vec<Node>,
    finalized: bool,
}

impl Report {
    pub fn new() -> Self {
        Report::default()
    }

    /// Adds a leaf `name: value` field.
    pub fn add_field(&mut self, name: impl Into<String>, value: impl std::fmt::Display) {
        self.nodes.push(Node::Field { name: name.into(), value: value.to_string() });
    }

    /// Adds a named sub-report and returns a handle to populate it.
    pub fn add_sub_report(&mut self, name: impl Into<String>) -> &mut Report {
        self.nodes.push(Node::SubReport { name: name.into(), report: Report::new() });
        match self.nodes.last_mut() {
            Some(Node::SubReport { report, .. }) => report,
            _ => unreachable!(),
        }
    }

    /// Adds a bare section header, a visual break with no value of its own.
    pub fn add_section(&mut self, name: impl Into<String>) {
        self.nodes.push(Node::Section { name: name.into() });
    }

    /// Marks the report complete. [`Report::dump`] notes when this was
    /// skipped, the same signal the Python `Dump()` gives for a report
    /// abandoned mid-check.
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Renders the full tree as indented, column-aligned text.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.generate_lines(&mut out, 0);
        if !self.finalized {
            out.push_str("(incomplete report)\n");
        }
        out
    }

    fn max_field_name_len(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Field { name, .. } => Some(name.len()),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    fn generate_lines(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let field_width = self.max_field_name_len();
        for node in &self.nodes {
            match node {
                Node::Field { name, value } => {
                    let _ = writeln!(out, "{indent}{name:field_width$} : {value}");
                }
                Node::Section { name } => {
                    let _ = writeln!(out, "{indent}-- {name} --");
                }
                Node::SubReport { name, report } => {
                    let _ = writeln!(out, "{indent}{name}:");
                    report.generate_lines(out, depth + 1);
                }
            }
        }
    }
}

/// Dumps the wrapped report to its destination on drop, finalized or not,
/// standing in for the Python driver's `try/finally: report.Dump(...)`.
pub struct ReportGuard<'a> {
    report: &'a Report,
    sink: Box<dyn FnMut(&str) + 'a>,
}

impl<'a> ReportGuard<'a> {
    pub fn new(report: &'a Report, sink: impl FnMut(&str) + 'a) -> Self {
        ReportGuard { report, sink: Box::new(sink) }
    }
}

impl Drop for ReportGuard<'_> {
    fn drop(&mut self) {
        let text = self.report.dump();
        (self.sink)(&text);
    }
}
