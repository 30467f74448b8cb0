//! Whole-application validation.
//!
//! A [`Validator`] runs independent [`Check`]s over a linked [`AppSpec`].
//! Checks only read the AppSpec, so they can run in parallel; the result is
//! sorted either way, so both modes report the same diagnostics.
//!
//! | Check | Reports |
//! |-------|---------|
//! | `primary-key` | entities without exactly one `pk` field |
//! | `reserved-names` | field names reserved by code generators |
//! | `references` | unresolved names and kind mismatches |
//! | `workspaces` | empty workspaces, unknown region fields, bad limits and hints |
//! | `constraints` | constraints over undeclared fields |
//! | `surfaces` | unknown section fields, missing entities, unknown actions |
//! | `personas` | persona scopes over undeclared fields |
//! | `experiences` | unknown start and transition steps, surface steps without a surface |
//! | `naming` | PascalCase declarations and snake_case fields |

mod entity;
mod experience;
mod fields;
mod surface;
mod workspace;

use rayon::prelude::*;

use super::diagnostics::{Diagnostic, DiagnosticCollector};
use super::resolve::{DEFAULT_SUGGESTION_THRESHOLD, SymbolIndex, check_references};
use crate::ir::AppSpec;

pub(crate) use entity::extra_primary_keys;
pub use entity::{ConstraintCheck, NamingCheck, PrimaryKeyCheck, RESERVED_FIELD_NAMES, ReservedNameCheck};
pub use experience::ExperienceCheck;
pub use surface::{PersonaCheck, SurfaceCheck};
pub use workspace::WorkspaceCheck;

/// Shared, read-only input of every check.
pub struct CheckContext<'a> {
    pub app: &'a AppSpec,
    pub index: SymbolIndex,
    /// Minimum similarity for `did you mean` fixes.
    pub threshold: f64,
}

impl<'a> CheckContext<'a> {
    pub fn new(app: &'a AppSpec, threshold: f64) -> Self {
        Self {
            app,
            index: SymbolIndex::from_appspec(app),
            threshold,
        }
    }
}

/// One independent validation rule.
pub trait Check: Send + Sync {
    /// Stable name, e.g. `primary-key`.
    fn name(&self) -> &'static str;

    fn run(&self, cx: &CheckContext<'_>, out: &mut DiagnosticCollector);
}

/// Re-surfaces unresolved references found while linking.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReferenceCheck;

impl Check for ReferenceCheck {
    fn name(&self) -> &'static str {
        "references"
    }

    fn run(&self, cx: &CheckContext<'_>, out: &mut DiagnosticCollector) {
        out.extend(check_references(cx.app, &cx.index, cx.threshold));
    }
}

/// Runs a list of checks.
pub struct Validator {
    checks: Vec<Box<dyn Check>>,
    parallel: bool,
    threshold: f64,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// A validator with every built-in check, running sequentially.
    pub fn new() -> Self {
        Self::empty()
            .with_check(PrimaryKeyCheck)
            .with_check(ReservedNameCheck)
            .with_check(ReferenceCheck)
            .with_check(WorkspaceCheck)
            .with_check(ConstraintCheck)
            .with_check(SurfaceCheck)
            .with_check(PersonaCheck)
            .with_check(ExperienceCheck)
            .with_check(NamingCheck)
    }

    /// A validator with no checks.
    pub fn empty() -> Self {
        Self {
            checks: Vec::new(),
            parallel: false,
            threshold: DEFAULT_SUGGESTION_THRESHOLD,
        }
    }

    pub fn with_check(mut self, check: impl Check + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Names of the configured checks, in run order.
    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Run every check. The result is de-duplicated and sorted.
    pub fn run(&self, app: &AppSpec) -> Vec<Diagnostic> {
        let cx = CheckContext::new(app, self.threshold);
        let run_one = |check: &Box<dyn Check>| {
            let mut out = DiagnosticCollector::new();
            check.run(&cx, &mut out);
            out.take()
        };

        let batches: Vec<Vec<Diagnostic>> = if self.parallel {
            self.checks.par_iter().map(run_one).collect()
        } else {
            self.checks.iter().map(run_one).collect()
        };

        let mut all = DiagnosticCollector::new();
        all.extend(batches.into_iter().flatten());
        all.into_sorted()
    }
}

/// Validate with every built-in check.
pub fn validate(app: &AppSpec) -> Vec<Diagnostic> {
    Validator::new().run(app)
}
