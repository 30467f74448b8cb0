//! The whole pipeline: sources in, AppSpec, diagnostics and layout plans out.

use std::path::Path;

use tracing::debug;

use super::error::LoadError;
use super::file_set::FileSet;
use super::loader::{SourceInput, discover, front_end_all, read_sources};
use super::options::CompileOptions;
use crate::hir::{Diagnostic, DiagnosticCollector, Validator, link_with_threshold, render_human, render_machine};
use crate::ir::{AppSpec, ModuleFragment};
use crate::layout::{LayoutPlan, plan_all};

/// Result of a compilation.
#[derive(Clone, Debug)]
pub struct Compilation {
    /// `None` when linking failed fatally.
    pub appspec: Option<AppSpec>,
    /// From every stage, de-duplicated and sorted by file and position.
    pub diagnostics: Vec<Diagnostic>,
    /// One per workspace, in AppSpec order.
    pub plans: Vec<LayoutPlan>,
}

impl Compilation {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn plan(&self, workspace: &str) -> Option<&LayoutPlan> {
        self.plans.iter().find(|p| p.workspace == workspace)
    }

    /// `path:line:col: severity: message`, one per line.
    pub fn render_machine(&self) -> String {
        render_machine(&self.diagnostics)
    }

    pub fn render_human(&self) -> String {
        render_human(&self.diagnostics)
    }
}

/// Compile in-memory sources. Input order does not affect the result.
pub fn compile_sources(sources: &[SourceInput], options: &CompileOptions) -> Compilation {
    let mut collector = DiagnosticCollector::new();

    let mut fragments: Vec<ModuleFragment> = Vec::with_capacity(sources.len());
    for out in front_end_all(sources, options.parallel_frontend) {
        collector.extend(out.diagnostics);
        fragments.extend(out.fragment);
    }

    let linked = link_with_threshold(&fragments, &options.root, options.suggestion_threshold);
    collector.extend(linked.diagnostics);

    let mut plans = Vec::new();
    if let Some(app) = &linked.appspec {
        let validator = Validator::new()
            .with_parallel(options.parallel_validation)
            .with_threshold(options.suggestion_threshold);
        collector.extend(validator.run(app));

        plans = plan_all(app, &options.engine_hints);
        for plan in &plans {
            collector.extend(plan.warnings.iter().cloned());
        }
    }

    let diagnostics = collector.into_sorted();
    debug!(
        files = sources.len(),
        linked = linked.appspec.is_some(),
        diagnostics = diagnostics.len(),
        "compilation finished"
    );

    Compilation {
        appspec: linked.appspec,
        diagnostics,
        plans,
    }
}

/// Discover, read and compile every source on the configured search paths.
pub fn compile_project(options: &CompileOptions) -> Result<Compilation, LoadError> {
    compile_under(options, None)
}

/// Compile the project described by a manifest file. Diagnostic paths are
/// relative to the manifest's directory.
#[cfg(feature = "interchange")]
pub fn compile_manifest(manifest_path: &Path) -> Result<Compilation, LoadError> {
    let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let options = super::manifest::Manifest::load(manifest_path)?.into_options(base);
    compile_under(&options, Some(base))
}

fn compile_under(options: &CompileOptions, base: Option<&Path>) -> Result<Compilation, LoadError> {
    let paths = discover(&options.search_paths, &options.extension)?;
    if paths.is_empty() {
        return Err(LoadError::NoSources {
            extension: options.extension.clone(),
        });
    }

    let files = FileSet::new();
    let sources = read_sources(&files, &paths, base, options.parallel_frontend)?;
    Ok(compile_sources(&sources, options))
}
