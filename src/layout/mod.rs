//! Workspace layout selection.
//!
//! Each region gets an [`AttentionSignal`]; the signals of a workspace pick
//! an [`Archetype`], whose slot budget the regions are then allocated into.

mod archetype;
mod plan;
mod signal;

pub use archetype::{Archetype, UnknownArchetype, select, unknown_hint_warning};
pub use plan::{LayoutPlan, SlotAllocation, plan_all, plan_workspace};
pub use signal::{
    AttentionSignal, SignalKind, centi, classify, evaluate, evaluate_workspace, weight,
    weight_centi,
};
