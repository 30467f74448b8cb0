//! Linker: merges per-file fragments into one [`AppSpec`].
//!
//! ```text
//! fragments ─▶ module graph ─▶ cycle check ─▶ topological order
//!           ─▶ namespace merge ─▶ reference resolution ─▶ AppSpec
//! ```
//!
//! Root-module, cycle and duplicate-name problems are fatal: the diagnostics
//! are returned without an AppSpec. Unknown `use` targets, unresolved
//! references and unreachable modules are reported but do not stop linking.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;
use tracing::debug;

use super::diagnostics::{Diagnostic, DiagnosticCollector, RelatedInfo, codes};
use super::resolve::{
    DEFAULT_SUGGESTION_THRESHOLD, Symbol, SymbolIndex, SymbolKind, check_references,
};
use crate::base::LineCol;
use crate::ir::{AppSpec, Loc, ModuleFragment};

/// File name used for diagnostics that belong to no source file.
pub const PROJECT_FILE: &str = "<project>";

/// Output of [`link`].
#[derive(Clone, Debug, Default)]
pub struct Link {
    /// `None` when a fatal problem was found.
    pub appspec: Option<AppSpec>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Link {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Link `fragments` into an application rooted at module `root`.
pub fn link(fragments: &[ModuleFragment], root: &str) -> Link {
    link_with_threshold(fragments, root, DEFAULT_SUGGESTION_THRESHOLD)
}

/// [`link`] with a custom similarity threshold for `did you mean` fixes.
pub fn link_with_threshold(fragments: &[ModuleFragment], root: &str, threshold: f64) -> Link {
    Linker::new(fragments, root).run(threshold)
}

// ============================================================================
// MODULE GRAPH
// ============================================================================

/// `use` edge between modules.
#[derive(Clone, Debug)]
struct Edge {
    target: SmolStr,
    file: Arc<str>,
    pos: LineCol,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

struct Linker<'a> {
    root: &'a str,
    /// Module name to its fragments, names sorted, fragments by path.
    modules: IndexMap<SmolStr, Vec<&'a ModuleFragment>>,
    edges: IndexMap<SmolStr, Vec<Edge>>,
    diagnostics: DiagnosticCollector,
    fatal: bool,
}

impl<'a> Linker<'a> {
    fn new(fragments: &'a [ModuleFragment], root: &'a str) -> Self {
        let mut sorted: Vec<&ModuleFragment> = fragments.iter().collect();
        sorted.sort_by(|a, b| a.file.cmp(&b.file).then_with(|| a.module.cmp(&b.module)));

        let mut modules: IndexMap<SmolStr, Vec<&ModuleFragment>> = IndexMap::new();
        for fragment in sorted {
            modules.entry(fragment.module.clone()).or_default().push(fragment);
        }
        modules.sort_keys();

        Self {
            root,
            modules,
            edges: IndexMap::new(),
            diagnostics: DiagnosticCollector::new(),
            fatal: false,
        }
    }

    fn run(mut self, threshold: f64) -> Link {
        if !self.modules.contains_key(self.root) {
            self.report_fatal(Diagnostic::error(
                PROJECT_FILE,
                LineCol::default(),
                format!("unresolved root module '{}'", self.root),
            )
            .with_code(codes::UNRESOLVED_ROOT));
            return self.finish(None);
        }

        self.build_edges();
        self.check_cycles();
        let order = self.topological_order();
        debug!(order = ?order, "module topological order");
        self.check_reachability();

        let Some(mut app) = self.merge(&order) else {
            return self.finish(None);
        };
        if self.fatal {
            return self.finish(None);
        }

        let index = SymbolIndex::from_appspec(&app);
        self.diagnostics.extend(check_references(&app, &index, threshold));
        app.modules = order;
        self.finish(Some(app))
    }

    fn finish(self, appspec: Option<AppSpec>) -> Link {
        Link {
            appspec,
            diagnostics: self.diagnostics.into_sorted(),
        }
    }

    fn report_fatal(&mut self, diagnostic: Diagnostic) {
        self.fatal = true;
        self.diagnostics.add(diagnostic);
    }

    fn build_edges(&mut self) {
        let mut edges = IndexMap::new();
        for (name, fragments) in &self.modules {
            let mut out: Vec<Edge> = Vec::new();
            for fragment in fragments {
                for use_decl in &fragment.uses {
                    if !self.modules.contains_key(&use_decl.module) {
                        let mut diag = Diagnostic::error(
                            fragment.file.clone(),
                            use_decl.pos,
                            format!("unknown module '{}'", use_decl.module),
                        )
                        .with_code(codes::UNKNOWN_MODULE);
                        if let Some(candidate) = self.similar_module(&use_decl.module) {
                            diag = diag.with_fix(format!("did you mean '{candidate}'?"));
                        }
                        self.diagnostics.add(diag);
                        continue;
                    }
                    if out.iter().any(|e| e.target == use_decl.module) {
                        continue;
                    }
                    out.push(Edge {
                        target: use_decl.module.clone(),
                        file: fragment.file.clone(),
                        pos: use_decl.pos,
                    });
                }
            }
            edges.insert(name.clone(), out);
        }
        self.edges = edges;
    }

    fn similar_module(&self, name: &str) -> Option<&SmolStr> {
        self.modules
            .keys()
            .map(|m| (strsim::jaro_winkler(name, m), m))
            .filter(|(score, _)| *score >= DEFAULT_SUGGESTION_THRESHOLD)
            .fold(None, |best: Option<(f64, &SmolStr)>, (score, m)| match best {
                Some((b, _)) if b >= score => best,
                _ => Some((score, m)),
            })
            .map(|(_, m)| m)
    }

    /// Depth-first search; every back edge is reported as one cycle.
    fn check_cycles(&mut self) {
        let mut marks: IndexMap<SmolStr, Mark> =
            self.modules.keys().map(|m| (m.clone(), Mark::Unvisited)).collect();
        let mut stack = Vec::new();
        let mut cycles = Vec::new();

        for module in self.modules.keys() {
            if marks[module] == Mark::Unvisited {
                self.visit(module, &mut marks, &mut stack, &mut cycles);
            }
        }

        for (path, edge) in cycles {
            let rendered: Vec<&str> = path.iter().map(SmolStr::as_str).collect();
            self.report_fatal(
                Diagnostic::error(
                    edge.file.clone(),
                    edge.pos,
                    format!("circular module dependency: {}", rendered.join(" -> ")),
                )
                .with_code(codes::CIRCULAR_DEPENDENCY),
            );
        }
    }

    fn visit(
        &self,
        module: &SmolStr,
        marks: &mut IndexMap<SmolStr, Mark>,
        stack: &mut Vec<SmolStr>,
        cycles: &mut Vec<(Vec<SmolStr>, Edge)>,
    ) {
        marks.insert(module.clone(), Mark::InProgress);
        stack.push(module.clone());

        for edge in self.edges.get(module).into_iter().flatten() {
            match marks[&edge.target] {
                Mark::Unvisited => self.visit(&edge.target, marks, stack, cycles),
                Mark::InProgress => {
                    let start = stack.iter().position(|m| *m == edge.target).unwrap_or(0);
                    let mut path = stack[start..].to_vec();
                    path.push(edge.target.clone());
                    cycles.push((path, edge.clone()));
                }
                Mark::Done => {}
            }
        }

        stack.pop();
        marks.insert(module.clone(), Mark::Done);
    }

    /// Dependencies first, ties broken by module name. Modules caught in a
    /// cycle are appended in name order.
    fn topological_order(&self) -> Vec<SmolStr> {
        let mut pending: IndexMap<&SmolStr, usize> = self
            .modules
            .keys()
            .map(|m| (m, self.edges.get(m).map_or(0, Vec::len)))
            .collect();

        let mut ready: BinaryHeap<Reverse<&SmolStr>> = pending
            .iter()
            .filter(|(_, deps)| **deps == 0)
            .map(|(m, _)| Reverse(*m))
            .collect();

        let mut order = Vec::with_capacity(self.modules.len());
        while let Some(Reverse(module)) = ready.pop() {
            order.push(module.clone());
            for (dependent, edges) in &self.edges {
                if edges.iter().any(|e| e.target == *module) {
                    if let Some(deps) = pending.get_mut(dependent) {
                        *deps -= 1;
                        if *deps == 0 {
                            ready.push(Reverse(dependent));
                        }
                    }
                }
            }
        }

        let placed: IndexSet<&SmolStr> = order.iter().collect();
        let rest: Vec<SmolStr> = self
            .modules
            .keys()
            .filter(|m| !placed.contains(m))
            .cloned()
            .collect();
        order.extend(rest);
        order
    }

    fn check_reachability(&mut self) {
        let mut reached: IndexSet<&SmolStr> = IndexSet::new();
        let mut queue: Vec<&SmolStr> = self
            .modules
            .get_key_value(self.root)
            .map(|(k, _)| k)
            .into_iter()
            .collect();
        while let Some(module) = queue.pop() {
            if !reached.insert(module) {
                continue;
            }
            for edge in self.edges.get(module).into_iter().flatten() {
                queue.push(&edge.target);
            }
        }

        let mut warnings = Vec::new();
        for (module, fragments) in &self.modules {
            if reached.contains(module) {
                continue;
            }
            if let Some(first) = fragments.first() {
                warnings.push(
                    Diagnostic::warning(
                        first.file.clone(),
                        first.module_pos,
                        format!("module '{module}' is not reachable from root module '{}'", self.root),
                    )
                    .with_code(codes::UNREACHABLE_MODULE),
                );
            }
        }
        self.diagnostics.extend(warnings);
    }

    // ------------------------------------------------------------------------
    // Namespace merge
    // ------------------------------------------------------------------------

    fn merge(&mut self, order: &[SmolStr]) -> Option<AppSpec> {
        let root = self.modules.get_key_value(self.root).map(|(k, _)| k.clone())?;
        let mut app = AppSpec::new(root);

        let mut index = SymbolIndex::new();
        let fragments: Vec<&ModuleFragment> = order
            .iter()
            .filter_map(|m| self.modules.get(m))
            .flatten()
            .copied()
            .collect();

        self.merge_app(&mut app, &fragments);

        for fragment in fragments {
            let mut insert = |name: &SmolStr, kind: SymbolKind, loc: &Loc| {
                let symbol = Symbol {
                    name: name.clone(),
                    kind,
                    loc: loc.clone(),
                };
                match index.insert(symbol) {
                    Ok(()) => true,
                    Err(existing) => {
                        let related = RelatedInfo::new(
                            existing.loc.file.clone(),
                            existing.loc.pos,
                            format!("{} '{}' first declared here", existing.kind, existing.name),
                        );
                        self.fatal = true;
                        self.diagnostics.duplicate_definition(
                            &loc.file,
                            loc.pos,
                            kind.display(),
                            name,
                            related,
                        );
                        false
                    }
                }
            };

            for d in &fragment.entities {
                if insert(&d.name, SymbolKind::Entity, &d.loc) {
                    app.entities.push(d.clone());
                }
            }
            for d in &fragment.surfaces {
                if insert(&d.name, SymbolKind::Surface, &d.loc) {
                    app.surfaces.push(d.clone());
                }
            }
            for d in &fragment.workspaces {
                if insert(&d.name, SymbolKind::Workspace, &d.loc) {
                    app.workspaces.push(d.clone());
                }
            }
            for d in &fragment.experiences {
                if insert(&d.name, SymbolKind::Experience, &d.loc) {
                    app.experiences.push(d.clone());
                }
            }
            for d in &fragment.services {
                if insert(&d.name, SymbolKind::Service, &d.loc) {
                    app.services.push(d.clone());
                }
            }
            for d in &fragment.foreign_models {
                if insert(&d.name, SymbolKind::ForeignModel, &d.loc) {
                    app.foreign_models.push(d.clone());
                }
            }
            for d in &fragment.integrations {
                if insert(&d.name, SymbolKind::Integration, &d.loc) {
                    app.integrations.push(d.clone());
                }
            }
        }

        debug!(declarations = index.len(), "merged namespace");
        Some(app)
    }

    /// The root module's `app` declaration wins, then the first in module order.
    fn merge_app(&mut self, app: &mut AppSpec, fragments: &[&ModuleFragment]) {
        let mut decls: Vec<_> = fragments.iter().filter_map(|f| f.app.as_ref()).collect();
        decls.sort_by_key(|info| {
            !fragments
                .iter()
                .any(|f| f.module == self.root && f.app.as_ref() == Some(*info))
        });

        let mut decls = decls.into_iter();
        let Some(chosen) = decls.next() else {
            return;
        };
        app.name = chosen.name.clone();
        app.title = chosen.title.clone();

        for other in decls {
            self.diagnostics.add(
                Diagnostic::warning(
                    other.loc.file.clone(),
                    other.loc.pos,
                    format!("app '{}' ignored, application is already named '{}'", other.name, chosen.name),
                )
                .with_code(codes::DUPLICATE_APP)
                .with_related(RelatedInfo::new(
                    chosen.loc.file.clone(),
                    chosen.loc.pos,
                    "app declared here",
                )),
            );
        }
    }
}
