//! # appspec-base
//!
//! Compiler core for the AppSpec application-description language.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! project → Manifest, discovery, compile entry points
//!   ↓
//! layout  → Attention signals, archetypes, slot allocation
//!   ↓
//! hir     → Linking, name resolution, validation, diagnostics
//!   ↓
//! ir      → Typed records: ModuleFragment, AppSpec
//!   ↓
//! syntax  → Lexer + recursive-descent parser
//!   ↓
//! base    → Primitives (FileId, LineCol, TextRange)
//! ```
//!
//! ## Quick start
//!
//! ```
//! use appspec::{CompileOptions, SourceInput, compile_sources};
//!
//! let source = SourceInput::new(
//!     "app.dsl",
//!     "module app\nentity Task \"Task\":\n  id: uuid pk\n  title: str(200) required\n",
//! );
//! let result = compile_sources(&[source], &CompileOptions::new("app"));
//! assert!(!result.has_errors());
//! assert_eq!(result.appspec.unwrap().entities.len(), 1);
//! ```

/// Foundation types: FileId, LineCol, text ranges
pub mod base;

/// Whole-project semantics: link, resolve, validate
pub mod hir;

/// Typed intermediate representation
pub mod ir;

/// Workspace layout selection
pub mod layout;

/// Options, discovery and the compile pipeline
pub mod project;

/// Lexer, parser and syntax tree
pub mod syntax;

pub use base::{FileId, LineCol, LineIndex, TextRange, TextSize};
pub use hir::{Diagnostic, Severity, codes, validate};
pub use ir::AppSpec;
pub use layout::{Archetype, LayoutPlan};
pub use project::{
    Compilation, CompileOptions, LoadError, SourceInput, compile_project, compile_sources,
};
#[cfg(feature = "interchange")]
pub use project::{Manifest, compile_manifest};
