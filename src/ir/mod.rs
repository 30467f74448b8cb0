//! Typed intermediate representation.
//!
//! ```text
//! SourceFile ──lower──▶ ModuleFragment ──link──▶ AppSpec
//! ```
//!
//! Records are built through validating constructors and are not mutated
//! once built.

mod app;
mod expr;
mod fragment;
mod lower;
mod spec;
mod types;

pub use app::AppSpec;
pub use expr::{
    AggregateExpr, AggregateFn, CompareOp, Condition, FieldPath, Literal, SortDirection, SortKey,
};
pub use fragment::{AppInfo, ModuleFragment, UseDecl};
pub use lower::lower;
pub use spec::{
    ActionRef, Constraint, ConstraintKind, DisplayMode, Element, EntitySpec, ExperienceSpec,
    ForeignConstraint, ForeignModelSpec, IntegrationAction, IntegrationSpec, Loc, Meta, MetaValue,
    NameRef, Outcome, Persona, Section, ServiceCall, ServiceSpec, Step, StepKind, SurfaceAction,
    SurfaceMode, SurfaceSpec, Transition, Trigger, WorkspaceRegion, WorkspaceSpec,
};
pub use types::{
    BuildError, DecimalSpec, EnumValues, FieldModifier, FieldSpec, FieldType, MAX_DECIMAL_PRECISION,
    MaxLength,
};
