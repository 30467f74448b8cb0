//! Typed declaration records.
//!
//! These are the immutable building blocks of an [`AppSpec`](super::AppSpec).
//! Names of other declarations are kept as [`NameRef`]s; the linker checks
//! them against the merged namespace.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::expr::{AggregateExpr, Condition, Literal, SortKey};
use super::types::{BuildError, FieldSpec};
use crate::base::LineCol;

/// Where a declaration was written.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct Loc {
    pub file: Arc<str>,
    pub pos: LineCol,
}

impl Loc {
    pub fn new(file: impl Into<Arc<str>>, pos: LineCol) -> Self {
        Self {
            file: file.into(),
            pos,
        }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.pos)
    }
}

/// A name of another declaration, with the position it was written at.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct NameRef {
    pub name: SmolStr,
    pub pos: LineCol,
}

impl NameRef {
    pub fn new(name: impl Into<SmolStr>, pos: LineCol) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }
}

/// Value of a `meta:` entry. Never interpreted.
pub type MetaValue = Literal;

/// Open `meta:` map, in declaration order.
pub type Meta = IndexMap<SmolStr, MetaValue>;

// ============================================================================
// ENTITY
// ============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "interchange", serde(rename_all = "snake_case"))]
pub enum ConstraintKind {
    Unique,
    Index,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConstraintKind::Unique => "unique",
            ConstraintKind::Index => "index",
        })
    }
}

/// `unique a, b` / `index a` over declared fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub fields: Vec<SmolStr>,
    pub pos: LineCol,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct EntitySpec {
    pub name: SmolStr,
    pub title: Option<String>,
    pub fields: Vec<FieldSpec>,
    pub constraints: Vec<Constraint>,
    pub meta: Meta,
    pub loc: Loc,
}

impl EntitySpec {
    /// Build an entity. Field names must be unique and every constraint
    /// must name declared fields.
    pub fn new(
        name: impl Into<SmolStr>,
        title: Option<String>,
        fields: Vec<FieldSpec>,
        constraints: Vec<Constraint>,
        meta: Meta,
        loc: Loc,
    ) -> Result<Self, BuildError> {
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(BuildError::DuplicateField(field.name.clone()));
            }
        }
        for constraint in &constraints {
            for name in &constraint.fields {
                if !fields.iter().any(|f| &f.name == name) {
                    return Err(BuildError::UnknownConstraintField(name.clone()));
                }
            }
        }
        Ok(Self {
            name: name.into(),
            title,
            fields,
            constraints,
            meta,
            loc,
        })
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.is_pk())
    }
}

// ============================================================================
// SURFACE
// ============================================================================

/// Shared implementation of `as_str`/`FromStr`/`Display` for closed word sets.
macro_rules! word_enum {
    ($(#[$meta:meta])* $name:ident, $err:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "interchange", serde(rename_all = "snake_case"))]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = BuildError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(BuildError::$err(other.into())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

word_enum! {
    /// What a surface does with its entity.
    SurfaceMode, UnknownSurfaceMode {
        List => "list",
        View => "view",
        Create => "create",
        Edit => "edit",
        Custom => "custom",
    }
}

impl SurfaceMode {
    /// Modes that operate on records and therefore need `uses entity`.
    pub fn requires_entity(self) -> bool {
        !matches!(self, SurfaceMode::Custom)
    }
}

/// `field name "Label"` inside a section.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct Element {
    pub field: NameRef,
    pub label: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct Section {
    pub name: SmolStr,
    pub title: Option<String>,
    pub elements: Vec<Element>,
    pub pos: LineCol,
}

/// `integration.action`
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionRef {
    pub integration: NameRef,
    pub action: NameRef,
}

/// Where a surface action leads.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "interchange", serde(rename_all = "snake_case"))]
pub enum Outcome {
    Surface(NameRef),
    Experience(NameRef),
    Integration(ActionRef),
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceAction {
    pub name: SmolStr,
    pub label: Option<String>,
    pub trigger: Option<SmolStr>,
    pub outcome: Option<Outcome>,
    pub pos: LineCol,
}

/// `for persona:` block.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct Persona {
    pub name: SmolStr,
    pub scope: Option<Condition>,
    pub pos: LineCol,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceSpec {
    pub name: SmolStr,
    pub title: Option<String>,
    pub entity: Option<NameRef>,
    pub mode: Option<SurfaceMode>,
    pub sections: Vec<Section>,
    pub actions: Vec<SurfaceAction>,
    pub personas: Vec<Persona>,
    pub meta: Meta,
    pub loc: Loc,
}

// ============================================================================
// WORKSPACE
// ============================================================================

word_enum! {
    /// How a region renders its records.
    DisplayMode, UnknownDisplayMode {
        List => "list",
        Table => "table",
        Grid => "grid",
        Timeline => "timeline",
        Kanban => "kanban",
        Detail => "detail",
        Metrics => "metrics",
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkspaceRegion {
    pub name: SmolStr,
    /// Entity or surface the region draws from.
    pub source: Option<NameRef>,
    pub filter: Option<Condition>,
    pub sort: Vec<SortKey>,
    pub limit: Option<u32>,
    pub display: Option<DisplayMode>,
    /// Surface opened from the region.
    pub action: Option<NameRef>,
    pub empty: Option<String>,
    pub aggregates: IndexMap<SmolStr, AggregateExpr>,
    pub pos: LineCol,
}

impl WorkspaceRegion {
    /// A region with only a name; the remaining parts are filled in by the
    /// builder or by tests.
    pub fn new(name: impl Into<SmolStr>, pos: LineCol) -> Self {
        Self {
            name: name.into(),
            source: None,
            filter: None,
            sort: Vec::new(),
            limit: None,
            display: None,
            action: None,
            empty: None,
            aggregates: IndexMap::new(),
            pos,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkspaceSpec {
    pub name: SmolStr,
    pub title: Option<String>,
    pub purpose: Option<String>,
    pub engine_hint: Option<NameRef>,
    pub regions: Vec<WorkspaceRegion>,
    pub meta: Meta,
    pub loc: Loc,
}

impl WorkspaceSpec {
    pub fn region(&self, name: &str) -> Option<&WorkspaceRegion> {
        self.regions.iter().find(|r| r.name == name)
    }
}

// ============================================================================
// EXPERIENCE
// ============================================================================

word_enum! {
    StepKind, UnknownStepKind {
        Surface => "surface",
        Process => "process",
        Integration => "integration",
    }
}

/// `on event -> step target`
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct Transition {
    pub event: SmolStr,
    pub target: NameRef,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct Step {
    pub name: SmolStr,
    pub kind: StepKind,
    pub surface: Option<NameRef>,
    pub integration: Option<ActionRef>,
    pub transitions: Vec<Transition>,
    pub pos: LineCol,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct ExperienceSpec {
    pub name: SmolStr,
    pub title: Option<String>,
    pub start: Option<NameRef>,
    pub steps: Vec<Step>,
    pub loc: Loc,
}

impl ExperienceSpec {
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }
}

// ============================================================================
// SERVICES AND INTEGRATIONS
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceSpec {
    pub name: SmolStr,
    pub title: Option<String>,
    pub spec_url: Option<String>,
    pub auth_profile: Option<SmolStr>,
    pub owner: Option<String>,
    pub loc: Loc,
}

word_enum! {
    /// Behaviour tags of a foreign model.
    ForeignConstraint, UnknownForeignConstraint {
        ReadOnly => "read_only",
        EventDriven => "event_driven",
        BatchImport => "batch_import",
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct ForeignModelSpec {
    pub name: SmolStr,
    pub service: NameRef,
    pub title: Option<String>,
    pub keys: Vec<SmolStr>,
    pub constraints: Vec<ForeignConstraint>,
    pub fields: Vec<FieldSpec>,
    pub loc: Loc,
}

/// `when surface S event`
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct Trigger {
    pub surface: NameRef,
    pub event: SmolStr,
}

/// `call service.operation`
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceCall {
    pub service: NameRef,
    pub operation: SmolStr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct IntegrationAction {
    pub name: SmolStr,
    pub title: Option<String>,
    pub trigger: Option<Trigger>,
    pub call: Option<ServiceCall>,
    pub pos: LineCol,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct IntegrationSpec {
    pub name: SmolStr,
    pub title: Option<String>,
    pub services: Vec<NameRef>,
    pub foreign_models: Vec<NameRef>,
    pub actions: Vec<IntegrationAction>,
    pub loc: Loc,
}

impl IntegrationSpec {
    pub fn action(&self, name: &str) -> Option<&IntegrationAction> {
        self.actions.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FieldType;

    fn field(name: &str) -> FieldSpec {
        FieldSpec::new(name, FieldType::Int, vec![], None, LineCol::default()).unwrap()
    }

    fn loc() -> Loc {
        Loc::new("a.dsl", LineCol::default())
    }

    #[test]
    fn test_entity_rejects_duplicate_fields() {
        let err = EntitySpec::new("A", None, vec![field("x"), field("x")], vec![], Meta::new(), loc());
        assert_eq!(err, Err(BuildError::DuplicateField("x".into())));
    }

    #[test]
    fn test_entity_rejects_unknown_constraint_field() {
        let constraint = Constraint {
            kind: ConstraintKind::Unique,
            fields: vec!["x".into(), "y".into()],
            pos: LineCol::default(),
        };
        let err = EntitySpec::new("A", None, vec![field("x")], vec![constraint], Meta::new(), loc());
        assert_eq!(err, Err(BuildError::UnknownConstraintField("y".into())));
    }

    #[test]
    fn test_word_enums() {
        assert_eq!("kanban".parse::<DisplayMode>(), Ok(DisplayMode::Kanban));
        assert_eq!(
            "cards".parse::<DisplayMode>(),
            Err(BuildError::UnknownDisplayMode("cards".into()))
        );
        assert_eq!(SurfaceMode::ALL.len(), 5);
        assert!(!SurfaceMode::Custom.requires_entity());
        assert_eq!(ForeignConstraint::ReadOnly.to_string(), "read_only");
        assert_eq!("integration".parse::<StepKind>(), Ok(StepKind::Integration));
    }
}
