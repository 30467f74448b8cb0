//! Name resolution: resolving references to their declarations.
//!
//! All top-level declarations share one namespace, regardless of kind or
//! module. Resolution is a single lookup plus a kind check; when nothing is
//! found, the closest declaration of an acceptable kind (Jaro-Winkler
//! similarity) is offered as a suggestion.
//!
//! # Key Data Structures
//!
//! - [`SymbolIndex`] - every declaration by name, in insertion order
//! - [`Resolver`] - query-time resolution with suggestions
//! - [`Reference`] - one name mention inside the AppSpec

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use smol_str::SmolStr;

use super::diagnostics::{Diagnostic, DiagnosticCollector, RelatedInfo, codes};
use crate::base::LineCol;
use crate::ir::{AggregateFn, AppSpec, FieldSpec, Loc, NameRef, Outcome};

/// Default similarity needed before a name is suggested.
pub const DEFAULT_SUGGESTION_THRESHOLD: f64 = 0.8;

// ============================================================================
// SYMBOLS
// ============================================================================

/// Declaration kinds sharing the namespace.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKind {
    Entity,
    Surface,
    Workspace,
    Experience,
    Service,
    ForeignModel,
    Integration,
}

impl SymbolKind {
    /// Get a display name for this kind.
    pub fn display(&self) -> &'static str {
        match self {
            SymbolKind::Entity => "entity",
            SymbolKind::Surface => "surface",
            SymbolKind::Workspace => "workspace",
            SymbolKind::Experience => "experience",
            SymbolKind::Service => "service",
            SymbolKind::ForeignModel => "foreign model",
            SymbolKind::Integration => "integration",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

/// A declaration in the namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub name: SmolStr,
    pub kind: SymbolKind,
    pub loc: Loc,
}

/// Every declaration of an application, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct SymbolIndex {
    symbols: IndexMap<SmolStr, Symbol, FxBuildHasher>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every declaration of a linked application.
    ///
    /// Later duplicates are ignored; the linker never produces any.
    pub fn from_appspec(app: &AppSpec) -> Self {
        let mut index = Self::new();
        for (name, kind, loc) in declarations(app) {
            let _ = index.insert(Symbol {
                name: name.clone(),
                kind,
                loc: loc.clone(),
            });
        }
        index
    }

    /// Add a symbol. On a name collision the existing symbol is returned
    /// and the index is left unchanged.
    pub fn insert(&mut self, symbol: Symbol) -> Result<(), &Symbol> {
        if self.symbols.contains_key(&symbol.name) {
            return Err(&self.symbols[&symbol.name]);
        }
        self.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// `(name, kind, loc)` of every top-level declaration, in AppSpec order.
pub fn declarations(app: &AppSpec) -> impl Iterator<Item = (&SmolStr, SymbolKind, &Loc)> {
    let entities = app.entities.iter().map(|d| (&d.name, SymbolKind::Entity, &d.loc));
    let surfaces = app.surfaces.iter().map(|d| (&d.name, SymbolKind::Surface, &d.loc));
    let workspaces = app.workspaces.iter().map(|d| (&d.name, SymbolKind::Workspace, &d.loc));
    let experiences = app.experiences.iter().map(|d| (&d.name, SymbolKind::Experience, &d.loc));
    let services = app.services.iter().map(|d| (&d.name, SymbolKind::Service, &d.loc));
    let foreign = app.foreign_models.iter().map(|d| (&d.name, SymbolKind::ForeignModel, &d.loc));
    let integrations = app.integrations.iter().map(|d| (&d.name, SymbolKind::Integration, &d.loc));
    entities
        .chain(surfaces)
        .chain(workspaces)
        .chain(experiences)
        .chain(services)
        .chain(foreign)
        .chain(integrations)
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Result of resolving a name.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolveResult<'a> {
    /// Resolved to a declaration of an acceptable kind.
    Found(&'a Symbol),
    /// Resolved, but to a declaration of another kind.
    WrongKind(&'a Symbol),
    /// Could not resolve the name.
    NotFound { suggestion: Option<SmolStr> },
}

impl<'a> ResolveResult<'a> {
    /// Get the resolved symbol if it has an acceptable kind.
    pub fn symbol(&self) -> Option<&'a Symbol> {
        match self {
            ResolveResult::Found(sym) => Some(sym),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ResolveResult::Found(_))
    }
}

/// Resolves names against a [`SymbolIndex`].
#[derive(Clone, Debug)]
pub struct Resolver<'a> {
    index: &'a SymbolIndex,
    threshold: f64,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a SymbolIndex) -> Self {
        Self {
            index,
            threshold: DEFAULT_SUGGESTION_THRESHOLD,
        }
    }

    /// Set the minimum similarity for suggestions.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Resolve `name`, accepting any of `kinds`.
    pub fn resolve(&self, name: &str, kinds: &[SymbolKind]) -> ResolveResult<'a> {
        match self.index.lookup(name) {
            Some(sym) if kinds.contains(&sym.kind) => ResolveResult::Found(sym),
            Some(sym) => ResolveResult::WrongKind(sym),
            None => ResolveResult::NotFound {
                suggestion: self.suggest(name, kinds),
            },
        }
    }

    /// The most similar declared name of an acceptable kind, if any reaches
    /// the threshold. Ties go to the alphabetically first name.
    pub fn suggest(&self, name: &str, kinds: &[SymbolKind]) -> Option<SmolStr> {
        let mut best: Option<(f64, &SmolStr)> = None;
        for sym in self.index.iter().filter(|s| kinds.contains(&s.kind)) {
            let score = strsim::jaro_winkler(name, &sym.name);
            if score < self.threshold {
                continue;
            }
            best = match best {
                Some((best_score, best_name))
                    if best_score > score || (best_score == score && best_name <= &sym.name) =>
                {
                    Some((best_score, best_name))
                }
                _ => Some((score, &sym.name)),
            };
        }
        best.map(|(_, name)| name.clone())
    }
}

// ============================================================================
// REFERENCES
// ============================================================================

/// One mention of another declaration's name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    /// Declaration containing the mention.
    pub referrer: SmolStr,
    pub name: SmolStr,
    /// Kinds the name may resolve to.
    pub kinds: &'static [SymbolKind],
    pub file: Arc<str>,
    pub pos: LineCol,
}

const ENTITY: &[SymbolKind] = &[SymbolKind::Entity];
const SURFACE: &[SymbolKind] = &[SymbolKind::Surface];
const EXPERIENCE: &[SymbolKind] = &[SymbolKind::Experience];
const SERVICE: &[SymbolKind] = &[SymbolKind::Service];
const FOREIGN_MODEL: &[SymbolKind] = &[SymbolKind::ForeignModel];
const INTEGRATION: &[SymbolKind] = &[SymbolKind::Integration];
const REGION_SOURCE: &[SymbolKind] = &[SymbolKind::Entity, SymbolKind::Surface];

struct Collector<'a> {
    referrer: &'a SmolStr,
    file: &'a Arc<str>,
    out: &'a mut Vec<Reference>,
}

impl Collector<'_> {
    fn push(&mut self, name: &SmolStr, pos: LineCol, kinds: &'static [SymbolKind]) {
        self.out.push(Reference {
            referrer: self.referrer.clone(),
            name: name.clone(),
            kinds,
            file: self.file.clone(),
            pos,
        });
    }

    fn name(&mut self, name: &NameRef, kinds: &'static [SymbolKind]) {
        self.push(&name.name, name.pos, kinds);
    }

    fn fields(&mut self, fields: &[FieldSpec]) {
        for field in fields {
            if let Some(target) = field.ty.ref_target() {
                self.push(&SmolStr::new(target), field.pos, ENTITY);
            }
        }
    }
}

/// Every cross-declaration reference in the application, in AppSpec order.
pub fn collect_references(app: &AppSpec) -> Vec<Reference> {
    let mut out = Vec::new();

    for e in &app.entities {
        Collector { referrer: &e.name, file: &e.loc.file, out: &mut out }.fields(&e.fields);
    }

    for s in &app.surfaces {
        let mut c = Collector { referrer: &s.name, file: &s.loc.file, out: &mut out };
        if let Some(entity) = &s.entity {
            c.name(entity, ENTITY);
        }
        for action in &s.actions {
            match &action.outcome {
                Some(Outcome::Surface(target)) => c.name(target, SURFACE),
                Some(Outcome::Experience(target)) => c.name(target, EXPERIENCE),
                Some(Outcome::Integration(target)) => c.name(&target.integration, INTEGRATION),
                None => {}
            }
        }
    }

    for w in &app.workspaces {
        let mut c = Collector { referrer: &w.name, file: &w.loc.file, out: &mut out };
        for region in &w.regions {
            if let Some(source) = &region.source {
                c.name(source, REGION_SOURCE);
            }
            if let Some(action) = &region.action {
                c.name(action, SURFACE);
            }
            for agg in region.aggregates.values() {
                if agg.func == AggregateFn::Count {
                    c.push(&agg.target, agg.pos, ENTITY);
                }
            }
        }
    }

    for x in &app.experiences {
        let mut c = Collector { referrer: &x.name, file: &x.loc.file, out: &mut out };
        for step in &x.steps {
            if let Some(surface) = &step.surface {
                c.name(surface, SURFACE);
            }
            if let Some(target) = &step.integration {
                c.name(&target.integration, INTEGRATION);
            }
        }
    }

    for f in &app.foreign_models {
        let mut c = Collector { referrer: &f.name, file: &f.loc.file, out: &mut out };
        c.name(&f.service, SERVICE);
        c.fields(&f.fields);
    }

    for i in &app.integrations {
        let mut c = Collector { referrer: &i.name, file: &i.loc.file, out: &mut out };
        for service in &i.services {
            c.name(service, SERVICE);
        }
        for model in &i.foreign_models {
            c.name(model, FOREIGN_MODEL);
        }
        for action in &i.actions {
            if let Some(trigger) = &action.trigger {
                c.name(&trigger.surface, SURFACE);
            }
            if let Some(call) = &action.call {
                c.name(&call.service, SERVICE);
            }
        }
    }

    out
}

/// Resolve every reference, reporting unresolved names and kind mismatches.
pub fn check_references(app: &AppSpec, index: &SymbolIndex, threshold: f64) -> Vec<Diagnostic> {
    let resolver = Resolver::new(index).with_threshold(threshold);
    let mut collector = DiagnosticCollector::new();

    for reference in collect_references(app) {
        match resolver.resolve(&reference.name, reference.kinds) {
            ResolveResult::Found(_) => {}
            ResolveResult::NotFound { suggestion } => collector.unresolved_reference(
                &reference.file,
                reference.pos,
                &reference.referrer,
                &reference.name,
                suggestion.as_deref(),
            ),
            ResolveResult::WrongKind(sym) => {
                let expected: Vec<_> = reference.kinds.iter().map(|k| k.display()).collect();
                collector.add(
                    Diagnostic::error(
                        reference.file.clone(),
                        reference.pos,
                        format!(
                            "'{}' in '{}' is a {}, expected {}",
                            reference.name,
                            reference.referrer,
                            sym.kind,
                            expected.join(" or ")
                        ),
                    )
                    .with_code(codes::WRONG_KIND)
                    .with_related(RelatedInfo::new(
                        sym.loc.file.clone(),
                        sym.loc.pos,
                        format!("{} '{}' declared here", sym.kind, sym.name),
                    )),
                );
            }
        }
    }

    collector.take()
}
