//! Diagnostics: uniform error reporting for every compiler stage.
//!
//! Lexing, parsing, lowering, linking, validation and layout planning all
//! report problems as [`Diagnostic`] values. A diagnostic is plain data with
//! a 1-based source position; expected failures never panic.

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::base::LineCol;

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "interchange", serde(rename_all = "snake_case"))]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A diagnostic message with location.
///
/// Field order doubles as the sort order: file, then position, then severity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    /// Path of the file containing this diagnostic.
    pub file: Arc<str>,
    /// Line (1-indexed).
    pub line: u32,
    /// Column (1-indexed).
    pub col: u32,
    /// Severity level.
    pub severity: Severity,
    /// Error/warning code (e.g., "E0001").
    pub code: Option<Arc<str>>,
    /// The diagnostic message.
    pub message: Arc<str>,
    /// Suggested fix, if there is an obvious one.
    pub fix: Option<Arc<str>>,
    /// Other locations involved (e.g. the first of two duplicate names).
    pub related: Vec<RelatedInfo>,
}

/// Related information for a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct RelatedInfo {
    /// The file containing this info.
    pub file: Arc<str>,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub col: u32,
    /// The message.
    pub message: Arc<str>,
}

impl RelatedInfo {
    pub fn new(file: impl Into<Arc<str>>, pos: LineCol, message: impl Into<Arc<str>>) -> Self {
        Self {
            file: file.into(),
            line: pos.line_one_indexed(),
            col: pos.col_one_indexed(),
            message: message.into(),
        }
    }
}

impl Diagnostic {
    fn new(
        severity: Severity,
        file: impl Into<Arc<str>>,
        pos: LineCol,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            file: file.into(),
            line: pos.line_one_indexed(),
            col: pos.col_one_indexed(),
            severity,
            code: None,
            message: message.into(),
            fix: None,
            related: Vec::new(),
        }
    }

    /// Create a new error diagnostic at a 0-indexed position.
    pub fn error(file: impl Into<Arc<str>>, pos: LineCol, message: impl Into<Arc<str>>) -> Self {
        Self::new(Severity::Error, file, pos, message)
    }

    /// Create a new warning diagnostic at a 0-indexed position.
    pub fn warning(file: impl Into<Arc<str>>, pos: LineCol, message: impl Into<Arc<str>>) -> Self {
        Self::new(Severity::Warning, file, pos, message)
    }

    /// Set the error code.
    pub fn with_code(mut self, code: impl Into<Arc<str>>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set the suggested fix.
    pub fn with_fix(mut self, fix: impl Into<Arc<str>>) -> Self {
        self.fix = Some(fix.into());
        self
    }

    /// Add related information.
    pub fn with_related(mut self, info: RelatedInfo) -> Self {
        self.related.push(info);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Machine-readable form: `path:line:col: severity: message`.
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file, self.line, self.col, self.severity, self.message
        )
    }
}

/// Render diagnostics one per line in the machine-readable form.
pub fn render_machine(diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    for diag in diagnostics {
        out.push_str(&diag.to_string());
        out.push('\n');
    }
    out
}

/// Render diagnostics for people: grouped by file, with codes, fixes and
/// related locations.
pub fn render_human(diagnostics: &[Diagnostic]) -> String {
    let mut by_file: IndexMap<&str, Vec<&Diagnostic>> = IndexMap::new();
    for diag in diagnostics {
        by_file.entry(&*diag.file).or_default().push(diag);
    }

    let mut out = String::new();
    for (file, diags) in by_file {
        out.push_str(file);
        out.push_str(":\n");
        for diag in diags {
            let code = diag.code.as_deref().map(|c| format!("[{c}]")).unwrap_or_default();
            out.push_str(&format!(
                "  {}:{}: {}{}: {}\n",
                diag.line, diag.col, diag.severity, code, diag.message
            ));
            if let Some(fix) = &diag.fix {
                out.push_str(&format!("    fix: {fix}\n"));
            }
            for rel in &diag.related {
                out.push_str(&format!(
                    "    note: {}:{}:{}: {}\n",
                    rel.file, rel.line, rel.col, rel.message
                ));
            }
        }
    }
    out
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Stable diagnostic codes.
pub mod codes {
    /// Unresolved reference (name not found).
    pub const UNRESOLVED_REFERENCE: &str = "E0001";
    /// Reference resolves to a declaration of the wrong kind.
    pub const WRONG_KIND: &str = "E0002";
    /// Invalid type, modifier or default value.
    pub const TYPE_MISMATCH: &str = "E0003";
    /// Duplicate definition.
    pub const DUPLICATE_DEFINITION: &str = "E0004";
    /// Missing required element.
    pub const MISSING_REQUIRED: &str = "E0005";
    /// Value outside its allowed set (mode, display, kind, limit...).
    pub const INVALID_VALUE: &str = "E0006";
    /// Circular dependency.
    pub const CIRCULAR_DEPENDENCY: &str = "E0007";
    /// Lexical error.
    pub const LEX_ERROR: &str = "E0008";
    /// Syntax error.
    pub const SYNTAX_ERROR: &str = "E0009";
    /// `use` of a module that no file declares.
    pub const UNKNOWN_MODULE: &str = "E0010";
    /// Root module not found among the fragments.
    pub const UNRESOLVED_ROOT: &str = "E0011";
    /// Wrong number of primary-key fields.
    pub const PRIMARY_KEY: &str = "E0012";
    /// Constraint over undeclared fields.
    pub const INVALID_CONSTRAINT: &str = "E0013";

    /// Module unreachable from the root.
    pub const UNREACHABLE_MODULE: &str = "W0001";
    /// Name collides with a generator-reserved word.
    pub const RESERVED_NAME: &str = "W0002";
    /// Naming convention violation.
    pub const NAMING_CONVENTION: &str = "W0003";
    /// Region left without a layout slot.
    pub const LAYOUT_BUDGET: &str = "W0004";
    /// Unknown `engine_hint`.
    pub const UNKNOWN_ENGINE_HINT: &str = "W0005";
    /// More than one `app` declaration.
    pub const DUPLICATE_APP: &str = "W0006";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics during a compiler pass.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// Add an unresolved reference error.
    pub fn unresolved_reference(
        &mut self,
        file: &Arc<str>,
        pos: LineCol,
        referrer: &str,
        name: &str,
        suggestion: Option<&str>,
    ) {
        let mut diag = Diagnostic::error(
            file.clone(),
            pos,
            format!("unresolved reference '{name}' in '{referrer}'"),
        )
        .with_code(codes::UNRESOLVED_REFERENCE);
        if let Some(candidate) = suggestion {
            diag = diag.with_fix(format!("did you mean '{candidate}'?"));
        }
        self.add(diag);
    }

    /// Add a duplicate definition error.
    pub fn duplicate_definition(
        &mut self,
        file: &Arc<str>,
        pos: LineCol,
        what: &str,
        name: &str,
        existing: RelatedInfo,
    ) {
        self.add(
            Diagnostic::error(
                file.clone(),
                pos,
                format!("duplicate {what} '{name}'"),
            )
            .with_code(codes::DUPLICATE_DEFINITION)
            .with_related(existing),
        );
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Drop exact duplicates and sort by file and position.
    pub fn into_sorted(self) -> Vec<Diagnostic> {
        let unique: IndexSet<Diagnostic> = self.diagnostics.into_iter().collect();
        let mut out: Vec<_> = unique.into_iter().collect();
        out.sort();
        out
    }
}
