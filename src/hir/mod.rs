//! Whole-project semantics: linking, name resolution and validation.
//!
//! ```text
//! ModuleFragment* ──link──▶ AppSpec ──validate──▶ Diagnostic*
//!                    │
//!                    └─ resolve (shared by link and validate)
//! ```
//!
//! Every stage reports through [`Diagnostic`]s; nothing here panics on bad
//! input.

mod diagnostics;
mod link;
mod resolve;
mod validate;

pub use diagnostics::{
    Diagnostic, DiagnosticCollector, RelatedInfo, Severity, codes, render_human, render_machine,
};
pub use link::{Link, PROJECT_FILE, link, link_with_threshold};
pub use resolve::{
    DEFAULT_SUGGESTION_THRESHOLD, Reference, ResolveResult, Resolver, Symbol, SymbolIndex,
    SymbolKind, check_references, collect_references, declarations,
};
pub use validate::{
    Check, CheckContext, ConstraintCheck, ExperienceCheck, NamingCheck, PersonaCheck,
    PrimaryKeyCheck, RESERVED_FIELD_NAMES, ReferenceCheck, ReservedNameCheck, SurfaceCheck,
    Validator, WorkspaceCheck, validate,
};
pub(crate) use validate::extra_primary_keys;
