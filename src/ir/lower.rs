//! Lowering from the per-file syntax tree to a [`ModuleFragment`].
//!
//! Only shape-local checks happen here: type names and arguments, modifier
//! rules, default literals, duplicate members inside one declaration and the
//! closed word sets (surface modes, display modes, step kinds). Names of
//! other declarations are copied through unresolved.
//!
//! A failed check drops the offending member (field, constraint, region...)
//! and lowering carries on with the rest of the file.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::debug;

use super::fragment::{AppInfo, ModuleFragment, UseDecl};
use super::spec::{
    ActionRef, Constraint, DisplayMode, Element, EntitySpec, ExperienceSpec, ForeignConstraint,
    ForeignModelSpec, IntegrationAction, IntegrationSpec, Loc, Meta, NameRef, Outcome, Persona,
    Section, ServiceCall, ServiceSpec, Step, StepKind, SurfaceAction, SurfaceMode, SurfaceSpec,
    Transition, Trigger, WorkspaceRegion, WorkspaceSpec,
};
use super::types::{BuildError, FieldModifier, FieldSpec, FieldType};
use super::Literal;
use crate::base::LineCol;
use crate::hir::{Diagnostic, RelatedInfo, codes, extra_primary_keys};
use crate::syntax::ast::{
    self, Decl, EntityDecl, ExperienceDecl, FieldDecl, ForeignModelDecl, Ident, IntegrationDecl,
    MetaEntry, OutcomeDecl, RegionDecl, ServiceDecl, SourceFile, SurfaceDecl, TypeExpr,
    WorkspaceDecl,
};

/// Lower one parsed file.
pub fn lower(file: &SourceFile, path: &str) -> (ModuleFragment, Vec<Diagnostic>) {
    let mut lowerer = Lowerer {
        file: Arc::from(path),
        diagnostics: Vec::new(),
    };
    let fragment = lowerer.fragment(file);
    debug!(
        file = path,
        module = %fragment.module,
        decls = fragment.decl_count(),
        diagnostics = lowerer.diagnostics.len(),
        "lowered fragment"
    );
    (fragment, lowerer.diagnostics)
}

fn name_ref(ident: &Ident) -> NameRef {
    NameRef::new(ident.text.clone(), ident.pos)
}

fn field_type(ty: &TypeExpr) -> Result<FieldType, BuildError> {
    match ty {
        TypeExpr::Named { name, args } => {
            let args: Vec<i64> = args.iter().map(|(v, _)| *v).collect();
            FieldType::from_parts(&name.text, &args)
        }
        TypeExpr::Enum { values, .. } => {
            FieldType::enumeration(values.iter().map(|v| v.text.clone()).collect())
        }
        TypeExpr::Ref { target, .. } => Ok(FieldType::Ref {
            target: target.text.clone(),
        }),
    }
}

struct Lowerer {
    file: Arc<str>,
    diagnostics: Vec<Diagnostic>,
}

impl Lowerer {
    fn report(&mut self, pos: LineCol, err: BuildError) {
        self.diagnostics
            .push(Diagnostic::error(self.file.clone(), pos, err.to_string()).with_code(err.code()));
    }

    fn loc(&self, pos: LineCol) -> Loc {
        Loc::new(self.file.clone(), pos)
    }

    fn fragment(&mut self, file: &SourceFile) -> ModuleFragment {
        let (module, module_pos) = match &file.module {
            Some(ident) => (ident.text.clone(), ident.pos),
            None => {
                let stem = Path::new(&*self.file)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("main");
                let stem = SmolStr::new(stem);
                self.diagnostics.push(
                    Diagnostic::error(
                        self.file.clone(),
                        LineCol::default(),
                        format!("missing 'module' declaration; using '{stem}'"),
                    )
                    .with_code(codes::MISSING_REQUIRED)
                    .with_fix(format!("add 'module {stem}' as the first line")),
                );
                (stem, LineCol::default())
            }
        };

        let mut fragment = ModuleFragment::new(module, self.file.clone());
        fragment.module_pos = module_pos;
        fragment.uses = file
            .uses
            .iter()
            .map(|u| UseDecl {
                module: u.text.clone(),
                pos: u.pos,
            })
            .collect();

        for app in &file.apps {
            if let Some(first) = &fragment.app {
                self.diagnostics.push(
                    Diagnostic::warning(
                        self.file.clone(),
                        app.name.pos,
                        format!("duplicate 'app' declaration '{}' ignored", app.name.text),
                    )
                    .with_code(codes::DUPLICATE_APP)
                    .with_related(RelatedInfo::new(
                        first.loc.file.clone(),
                        first.loc.pos,
                        "first 'app' declaration",
                    )),
                );
                continue;
            }
            fragment.app = Some(AppInfo {
                name: app.name.text.clone(),
                title: app.title.clone(),
                loc: self.loc(app.name.pos),
            });
        }

        for decl in &file.decls {
            match decl {
                Decl::Entity(d) => {
                    if let Some(e) = self.entity(d) {
                        fragment.entities.push(e);
                    }
                }
                Decl::Surface(d) => fragment.surfaces.push(self.surface(d)),
                Decl::Workspace(d) => fragment.workspaces.push(self.workspace(d)),
                Decl::Experience(d) => fragment.experiences.push(self.experience(d)),
                Decl::Service(d) => fragment.services.push(self.service(d)),
                Decl::ForeignModel(d) => fragment.foreign_models.push(self.foreign_model(d)),
                Decl::Integration(d) => fragment.integrations.push(self.integration(d)),
            }
        }

        fragment
    }

    // ------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------

    fn field(&mut self, decl: &FieldDecl) -> Option<FieldSpec> {
        let ty = match field_type(&decl.ty) {
            Ok(ty) => ty,
            Err(err) => {
                self.report(decl.ty.pos(), err);
                return None;
            }
        };

        let mut modifiers = Vec::with_capacity(decl.modifiers.len());
        for m in &decl.modifiers {
            match m.text.parse::<FieldModifier>() {
                Ok(modifier) => modifiers.push(modifier),
                Err(err) => self.report(m.pos, err),
            }
        }

        let (default, default_pos) = match &decl.default {
            Some((lit, pos)) => (Some(lit.clone()), *pos),
            None => (None, decl.name.pos),
        };

        match FieldSpec::new(decl.name.text.clone(), ty, modifiers, default, decl.name.pos) {
            Ok(field) => Some(field),
            Err(err) => {
                let pos = match err {
                    BuildError::InvalidDefault { .. }
                    | BuildError::DefaultTooLong { .. }
                    | BuildError::UnknownEnumDefault { .. }
                    | BuildError::InvalidUuid(_)
                    | BuildError::RefDefault => default_pos,
                    _ => decl.name.pos,
                };
                self.report(pos, err);
                None
            }
        }
    }

    /// Lower a field list, dropping invalid and duplicate fields.
    fn fields(&mut self, decls: &[FieldDecl]) -> Vec<FieldSpec> {
        let mut fields: Vec<FieldSpec> = Vec::with_capacity(decls.len());
        for decl in decls {
            if let Some(first) = fields.iter().find(|f| f.name == decl.name.text) {
                let related = RelatedInfo::new(self.file.clone(), first.pos, "first declared here");
                self.diagnostics.push(
                    Diagnostic::error(
                        self.file.clone(),
                        decl.name.pos,
                        BuildError::DuplicateField(decl.name.text.clone()).to_string(),
                    )
                    .with_code(codes::DUPLICATE_DEFINITION)
                    .with_related(related),
                );
                continue;
            }
            if let Some(field) = self.field(decl) {
                fields.push(field);
            }
        }
        fields
    }

    fn meta(&mut self, entries: &[MetaEntry]) -> Meta {
        let mut meta = IndexMap::new();
        for entry in entries {
            if meta.contains_key(&entry.key.text) {
                self.report(entry.key.pos, BuildError::DuplicateMetaKey(entry.key.text.clone()));
                continue;
            }
            meta.insert(entry.key.text.clone(), entry.value.clone());
        }
        meta
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn entity(&mut self, decl: &EntityDecl) -> Option<EntitySpec> {
        let fields = self.fields(&decl.fields);

        let mut constraints = Vec::new();
        for c in &decl.constraints {
            let missing = c
                .fields
                .iter()
                .find(|name| !fields.iter().any(|f| f.name == name.text));
            match missing {
                Some(name) => {
                    self.report(name.pos, BuildError::UnknownConstraintField(name.text.clone()))
                }
                None => constraints.push(Constraint {
                    kind: c.kind,
                    fields: c.fields.iter().map(|f| f.text.clone()).collect(),
                    pos: c.pos,
                }),
            }
        }

        let meta = self.meta(&decl.meta);
        match EntitySpec::new(
            decl.name.text.clone(),
            decl.title.clone(),
            fields,
            constraints,
            meta,
            self.loc(decl.name.pos),
        ) {
            Ok(entity) => {
                self.diagnostics.extend(extra_primary_keys(&entity));
                Some(entity)
            }
            Err(err) => {
                self.report(decl.name.pos, err);
                None
            }
        }
    }

    fn surface(&mut self, decl: &SurfaceDecl) -> SurfaceSpec {
        let mode = decl.mode.as_ref().and_then(|m| match m.text.parse::<SurfaceMode>() {
            Ok(mode) => Some(mode),
            Err(err) => {
                self.report(m.pos, err);
                None
            }
        });

        let sections = decl
            .sections
            .iter()
            .map(|s| Section {
                name: s.name.text.clone(),
                title: s.title.clone(),
                elements: s
                    .elements
                    .iter()
                    .map(|e| Element {
                        field: name_ref(&e.field),
                        label: e.label.clone(),
                    })
                    .collect(),
                pos: s.name.pos,
            })
            .collect();

        let actions = decl
            .actions
            .iter()
            .map(|a| SurfaceAction {
                name: a.name.text.clone(),
                label: a.label.clone(),
                trigger: a.trigger.as_ref().map(|t| t.text.clone()),
                outcome: a.outcome.as_ref().map(|o| match o {
                    OutcomeDecl::Surface(s) => Outcome::Surface(name_ref(s)),
                    OutcomeDecl::Experience(e) => Outcome::Experience(name_ref(e)),
                    OutcomeDecl::Integration {
                        integration,
                        action,
                    } => Outcome::Integration(ActionRef {
                        integration: name_ref(integration),
                        action: name_ref(action),
                    }),
                }),
                pos: a.name.pos,
            })
            .collect();

        let personas = decl
            .personas
            .iter()
            .map(|p| Persona {
                name: p.name.text.clone(),
                scope: p.scope.clone(),
                pos: p.name.pos,
            })
            .collect();

        SurfaceSpec {
            name: decl.name.text.clone(),
            title: decl.title.clone(),
            entity: decl.entity.as_ref().map(name_ref),
            mode,
            sections,
            actions,
            personas,
            meta: self.meta(&decl.meta),
            loc: self.loc(decl.name.pos),
        }
    }

    fn workspace(&mut self, decl: &WorkspaceDecl) -> WorkspaceSpec {
        let mut regions: Vec<WorkspaceRegion> = Vec::with_capacity(decl.regions.len());
        for r in &decl.regions {
            if regions.iter().any(|existing| existing.name == r.name.text) {
                self.report(r.name.pos, BuildError::DuplicateRegion(r.name.text.clone()));
                continue;
            }
            regions.push(self.region(r));
        }

        WorkspaceSpec {
            name: decl.name.text.clone(),
            title: decl.title.clone(),
            purpose: decl.purpose.clone(),
            engine_hint: decl.engine_hint.as_ref().map(name_ref),
            regions,
            meta: self.meta(&decl.meta),
            loc: self.loc(decl.name.pos),
        }
    }

    fn region(&mut self, decl: &RegionDecl) -> WorkspaceRegion {
        let mut region = WorkspaceRegion::new(decl.name.text.clone(), decl.name.pos);
        region.source = decl.source.as_ref().map(name_ref);
        region.filter = decl.filter.clone();
        region.sort = decl.sort.clone();
        region.action = decl.action.as_ref().map(name_ref);
        region.empty = decl.empty.clone();

        if let Some((limit, pos)) = decl.limit {
            match u32::try_from(limit) {
                Ok(n) if n > 0 => region.limit = Some(n),
                _ => self.report(pos, BuildError::InvalidLimit(limit)),
            }
        }

        if let Some(display) = &decl.display {
            match display.text.parse::<DisplayMode>() {
                Ok(mode) => region.display = Some(mode),
                Err(err) => self.report(display.pos, err),
            }
        }

        for (name, expr) in &decl.aggregates {
            if region.aggregates.contains_key(&name.text) {
                self.report(name.pos, BuildError::DuplicateAggregate(name.text.clone()));
                continue;
            }
            region.aggregates.insert(name.text.clone(), expr.clone());
        }

        region
    }

    fn experience(&mut self, decl: &ExperienceDecl) -> ExperienceSpec {
        let mut steps: Vec<Step> = Vec::with_capacity(decl.steps.len());
        for s in &decl.steps {
            if steps.iter().any(|existing| existing.name == s.name.text) {
                self.report(s.name.pos, BuildError::DuplicateStep(s.name.text.clone()));
                continue;
            }
            steps.push(self.step(s));
        }

        ExperienceSpec {
            name: decl.name.text.clone(),
            title: decl.title.clone(),
            start: decl.start.as_ref().map(name_ref),
            steps,
            loc: self.loc(decl.name.pos),
        }
    }

    fn step(&mut self, decl: &ast::StepDecl) -> Step {
        let integration = decl.integration.as_ref().map(|(i, a)| ActionRef {
            integration: name_ref(i),
            action: name_ref(a),
        });

        // an explicit kind wins; otherwise infer it from what the step names
        let inferred = if decl.surface.is_some() {
            StepKind::Surface
        } else if integration.is_some() {
            StepKind::Integration
        } else {
            StepKind::Process
        };
        let kind = match &decl.kind {
            Some(k) => k.text.parse::<StepKind>().unwrap_or_else(|err| {
                self.report(k.pos, err);
                inferred
            }),
            None => inferred,
        };

        Step {
            name: decl.name.text.clone(),
            kind,
            surface: decl.surface.as_ref().map(name_ref),
            integration,
            transitions: decl
                .transitions
                .iter()
                .map(|t| Transition {
                    event: t.event.text.clone(),
                    target: name_ref(&t.target),
                })
                .collect(),
            pos: decl.name.pos,
        }
    }

    fn service(&mut self, decl: &ServiceDecl) -> ServiceSpec {
        let mut service = ServiceSpec {
            name: decl.name.text.clone(),
            title: decl.title.clone(),
            spec_url: None,
            auth_profile: None,
            owner: None,
            loc: self.loc(decl.name.pos),
        };

        for (key, value) in &decl.properties {
            let text = match value {
                Literal::Str(s) => SmolStr::new(s),
                other => SmolStr::new(other.to_string()),
            };
            match key.text.as_str() {
                "spec_url" => service.spec_url = Some(text.to_string()),
                "auth_profile" => service.auth_profile = Some(text),
                "owner" => service.owner = Some(text.to_string()),
                _ => self.report(key.pos, BuildError::UnknownServiceProperty(key.text.clone())),
            }
        }

        service
    }

    fn foreign_model(&mut self, decl: &ForeignModelDecl) -> ForeignModelSpec {
        let fields = self.fields(&decl.fields);

        let mut keys = Vec::new();
        for key in &decl.keys {
            if fields.iter().any(|f| f.name == key.text) {
                keys.push(key.text.clone());
            } else {
                self.report(key.pos, BuildError::UnknownKeyField(key.text.clone()));
            }
        }

        let mut constraints = Vec::new();
        for c in &decl.constraints {
            match c.text.parse::<ForeignConstraint>() {
                Ok(constraint) if !constraints.contains(&constraint) => constraints.push(constraint),
                Ok(_) => {}
                Err(err) => self.report(c.pos, err),
            }
        }

        ForeignModelSpec {
            name: decl.name.text.clone(),
            service: name_ref(&decl.service),
            title: decl.title.clone(),
            keys,
            constraints,
            fields,
            loc: self.loc(decl.name.pos),
        }
    }

    fn integration(&mut self, decl: &IntegrationDecl) -> IntegrationSpec {
        IntegrationSpec {
            name: decl.name.text.clone(),
            title: decl.title.clone(),
            services: decl.services.iter().map(name_ref).collect(),
            foreign_models: decl.foreign_models.iter().map(name_ref).collect(),
            actions: decl
                .actions
                .iter()
                .map(|a| IntegrationAction {
                    name: a.name.text.clone(),
                    title: a.title.clone(),
                    trigger: a.trigger.as_ref().map(|(surface, event)| Trigger {
                        surface: name_ref(surface),
                        event: event.text.clone(),
                    }),
                    call: a.call.as_ref().map(|(service, operation)| ServiceCall {
                        service: name_ref(service),
                        operation: operation.text.clone(),
                    }),
                    pos: a.name.pos,
                })
                .collect(),
            loc: self.loc(decl.name.pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_source;

    fn lower_text(text: &str) -> (ModuleFragment, Vec<Diagnostic>) {
        let parse = parse_source(text).unwrap();
        assert!(!parse.has_errors(), "{:?}", parse.errors);
        lower(&parse.file, "app/tasks.dsl")
    }

    fn messages(diags: &[Diagnostic]) -> Vec<String> {
        diags.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_lower_entity() {
        let (fragment, diags) = lower_text(
            "module tasks\nuse core\napp todo \"Todo\"\n\
             entity Task \"Task\":\n  id: uuid pk\n  title: str(200) required\n  owner: ref User\n  unique title\n",
        );
        assert!(diags.is_empty(), "{:?}", messages(&diags));
        assert_eq!(fragment.module, "tasks");
        assert_eq!(fragment.uses[0].module, "core");
        assert_eq!(fragment.app.as_ref().unwrap().name, "todo");

        let task = &fragment.entities[0];
        assert_eq!(task.fields.len(), 3);
        assert_eq!(task.field("owner").unwrap().ty.ref_target(), Some("User"));
        assert_eq!(task.constraints.len(), 1);
        assert_eq!(&*task.loc.file, "app/tasks.dsl");
    }

    #[test]
    fn test_missing_module_uses_file_stem() {
        let (fragment, diags) = lower_text("entity A:\n  id: uuid pk\n");
        assert_eq!(fragment.module, "tasks");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code.as_deref(), Some(codes::MISSING_REQUIRED));
    }

    #[test]
    fn test_bad_fields_are_dropped_and_reported() {
        let (fragment, diags) = lower_text(
            "module m\nentity A:\n  id: uuid pk\n  a: str(0)\n  b: decimal(40,2)\n  c: enum[x,x]\n  \
             d: int = \"no\"\n  e: date auto_add\n  f: int primary\n  id: int\n",
        );
        let msgs = messages(&diags);
        assert_eq!(diags.len(), 7, "{msgs:?}");
        assert!(msgs[0].starts_with("app/tasks.dsl:4:6: error: str length"));
        assert!(msgs[1].contains("decimal precision"));
        assert!(msgs[2].contains("duplicate enum value 'x'"));
        assert!(msgs[3].contains("default \"no\" is not a valid int value"));
        assert!(msgs[4].contains("'auto_add' is only allowed on datetime"));
        assert!(msgs[5].contains("unknown field modifier 'primary'"));
        assert!(msgs[6].contains("duplicate field 'id'"));

        // `f` survives without its unknown modifier
        let names: Vec<_> = fragment.entities[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "f"]);
    }

    #[test]
    fn test_second_pk_is_reported_and_entity_kept() {
        let (fragment, diags) =
            lower_text("module m\nentity A:\n  id: uuid pk\n  code: str(5) pk\n");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, 2);
        assert_eq!(diags[0].code.as_deref(), Some(codes::PRIMARY_KEY));
        assert_eq!(diags[0].related.len(), 2);
        assert_eq!(fragment.entities[0].primary_keys().count(), 2);
    }

    #[test]
    fn test_constraint_over_unknown_field_is_dropped() {
        let (fragment, diags) = lower_text("module m\nentity A:\n  id: uuid pk\n  index id, nope\n");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("'nope'"));
        assert!(fragment.entities[0].constraints.is_empty());
    }

    #[test]
    fn test_lower_surface_and_workspace() {
        let (fragment, diags) = lower_text(
            "module m\n\
             surface task_list:\n  uses entity Task\n  mode: list\n\
             workspace home:\n  inbox:\n    source: task_list\n    limit: 0\n    display: cards\n  \
             stats:\n    display: metrics\n  inbox:\n    source: Task\n",
        );
        let msgs = messages(&diags);
        assert_eq!(diags.len(), 3, "{msgs:?}");
        assert!(msgs[0].contains("region limit must be positive"));
        assert!(msgs[1].contains("unknown display mode 'cards'"));
        assert!(msgs[2].contains("duplicate region 'inbox'"));

        assert_eq!(fragment.surfaces[0].mode, Some(SurfaceMode::List));
        let ws = &fragment.workspaces[0];
        assert_eq!(ws.regions.len(), 2);
        assert_eq!(ws.regions[0].limit, None);
        assert_eq!(ws.regions[1].display, Some(DisplayMode::Metrics));
    }

    #[test]
    fn test_step_kind_inference() {
        let (fragment, diags) = lower_text(
            "module m\nexperience e:\n  start at step a\n  step a:\n    surface s\n  \
             step b:\n    integration crm.push\n  step c:\n    kind: wizard\n",
        );
        assert_eq!(diags.len(), 1);
        let kinds: Vec<_> = fragment.experiences[0].steps.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![StepKind::Surface, StepKind::Integration, StepKind::Process]
        );
    }

    #[test]
    fn test_service_and_foreign_model() {
        let (fragment, diags) = lower_text(
            "module m\nservice crm \"CRM\":\n  spec_url: \"https://x\"\n  auth_profile: oauth\n  colour: red\n\
             foreign_model Customer from crm:\n  key id, nope\n  constraint read_only, sometimes\n  id: str(10)\n",
        );
        let msgs = messages(&diags);
        assert_eq!(diags.len(), 3, "{msgs:?}");
        assert!(msgs[0].contains("unknown service property 'colour'"));
        assert!(msgs[1].contains("key refers to undeclared field 'nope'"));
        assert!(msgs[2].contains("unknown foreign model constraint 'sometimes'"));

        let svc = &fragment.services[0];
        assert_eq!(svc.spec_url.as_deref(), Some("https://x"));
        assert_eq!(svc.auth_profile.as_deref(), Some("oauth"));
        let fm = &fragment.foreign_models[0];
        assert_eq!(fm.keys, vec![SmolStr::new("id")]);
        assert_eq!(fm.constraints, vec![ForeignConstraint::ReadOnly]);
    }
}
