//! Per-file syntax tree.
//!
//! The tree mirrors the surface syntax closely: names keep their positions,
//! type and mode names are still plain words, and nothing has been checked
//! beyond the grammar. Lowering into typed records happens in [`crate::ir`].

use smol_str::SmolStr;

use crate::base::LineCol;
use crate::ir::{AggregateExpr, Condition, ConstraintKind, Literal, SortKey};

/// A word with the position it was written at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub text: SmolStr,
    pub pos: LineCol,
}

impl Ident {
    pub fn new(text: impl Into<SmolStr>, pos: LineCol) -> Self {
        Self {
            text: text.into(),
            pos,
        }
    }
}

/// A parsed source file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceFile {
    /// The `module a.b` line, if present.
    pub module: Option<Ident>,
    /// `use a.b` lines in order.
    pub uses: Vec<Ident>,
    /// `app name "Title"` lines.
    pub apps: Vec<AppDecl>,
    pub decls: Vec<Decl>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppDecl {
    pub name: Ident,
    pub title: Option<String>,
}

/// A top-level declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Entity(EntityDecl),
    Surface(SurfaceDecl),
    Workspace(WorkspaceDecl),
    Experience(ExperienceDecl),
    Service(ServiceDecl),
    ForeignModel(ForeignModelDecl),
    Integration(IntegrationDecl),
}

impl Decl {
    pub fn name(&self) -> &Ident {
        match self {
            Decl::Entity(d) => &d.name,
            Decl::Surface(d) => &d.name,
            Decl::Workspace(d) => &d.name,
            Decl::Experience(d) => &d.name,
            Decl::Service(d) => &d.name,
            Decl::ForeignModel(d) => &d.name,
            Decl::Integration(d) => &d.name,
        }
    }
}

/// `key: literal` line inside a `meta:` block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetaEntry {
    pub key: Ident,
    pub value: Literal,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntityDecl {
    pub name: Ident,
    pub title: Option<String>,
    pub fields: Vec<FieldDecl>,
    pub constraints: Vec<ConstraintDecl>,
    pub meta: Vec<MetaEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: Ident,
    pub ty: TypeExpr,
    /// Modifier words in source order; `unique?` keeps its question mark.
    pub modifiers: Vec<Ident>,
    pub default: Option<(Literal, LineCol)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeExpr {
    /// `int`, `str(200)`, `decimal(10,2)` ...
    Named { name: Ident, args: Vec<(i64, LineCol)> },
    /// `enum[a,b,c]`
    Enum { pos: LineCol, values: Vec<Ident> },
    /// `ref Entity`
    Ref { pos: LineCol, target: Ident },
}

impl TypeExpr {
    pub fn pos(&self) -> LineCol {
        match self {
            TypeExpr::Named { name, .. } => name.pos,
            TypeExpr::Enum { pos, .. } | TypeExpr::Ref { pos, .. } => *pos,
        }
    }
}

/// `unique a, b` or `index a`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstraintDecl {
    pub kind: ConstraintKind,
    pub fields: Vec<Ident>,
    pub pos: LineCol,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceDecl {
    pub name: Ident,
    pub title: Option<String>,
    pub entity: Option<Ident>,
    pub mode: Option<Ident>,
    pub sections: Vec<SectionDecl>,
    pub actions: Vec<ActionDecl>,
    pub personas: Vec<PersonaDecl>,
    pub meta: Vec<MetaEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionDecl {
    pub name: Ident,
    pub title: Option<String>,
    pub elements: Vec<ElementDecl>,
}

/// `field name "Label"` inside a section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementDecl {
    pub field: Ident,
    pub label: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionDecl {
    pub name: Ident,
    pub label: Option<String>,
    pub trigger: Option<Ident>,
    pub outcome: Option<OutcomeDecl>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutcomeDecl {
    Surface(Ident),
    Experience(Ident),
    Integration { integration: Ident, action: Ident },
}

/// `for persona:` block with its scope rule.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonaDecl {
    pub name: Ident,
    pub scope: Option<Condition>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WorkspaceDecl {
    pub name: Ident,
    pub title: Option<String>,
    pub purpose: Option<String>,
    pub engine_hint: Option<Ident>,
    pub regions: Vec<RegionDecl>,
    pub meta: Vec<MetaEntry>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RegionDecl {
    pub name: Ident,
    pub source: Option<Ident>,
    pub filter: Option<Condition>,
    pub sort: Vec<SortKey>,
    pub limit: Option<(i64, LineCol)>,
    pub display: Option<Ident>,
    pub action: Option<Ident>,
    pub empty: Option<String>,
    pub aggregates: Vec<(Ident, AggregateExpr)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExperienceDecl {
    pub name: Ident,
    pub title: Option<String>,
    pub start: Option<Ident>,
    pub steps: Vec<StepDecl>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepDecl {
    pub name: Ident,
    pub kind: Option<Ident>,
    pub surface: Option<Ident>,
    pub integration: Option<(Ident, Ident)>,
    pub transitions: Vec<TransitionDecl>,
}

/// `on success -> step done`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionDecl {
    pub event: Ident,
    pub target: Ident,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceDecl {
    pub name: Ident,
    pub title: Option<String>,
    pub properties: Vec<(Ident, Literal)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignModelDecl {
    pub name: Ident,
    pub service: Ident,
    pub title: Option<String>,
    pub keys: Vec<Ident>,
    pub constraints: Vec<Ident>,
    pub fields: Vec<FieldDecl>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntegrationDecl {
    pub name: Ident,
    pub title: Option<String>,
    pub services: Vec<Ident>,
    pub foreign_models: Vec<Ident>,
    pub actions: Vec<IntegrationActionDecl>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntegrationActionDecl {
    pub name: Ident,
    pub title: Option<String>,
    /// `when surface S event`
    pub trigger: Option<(Ident, Ident)>,
    /// `call service.operation`
    pub call: Option<(Ident, Ident)>,
}
