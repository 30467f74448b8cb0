//! Layout archetypes and the rules that pick one.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use smol_str::SmolStr;
use thiserror::Error;
use tracing::debug;

use super::signal::{AttentionSignal, SignalKind};
use crate::base::LineCol;
use crate::hir::{Diagnostic, codes};

const FOCUS_THRESHOLD: u32 = 70;
const PANE_THRESHOLD: u32 = 30;
const TABLE_THRESHOLD: u32 = 60;
const COMPETING_THRESHOLD: u32 = 70;
const MONITOR_MAX_REGIONS: usize = 8;

/// One of the five screen layouts a workspace can get.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "interchange", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Archetype {
    FocusMetric,
    ScannerTable,
    DualPaneFlow,
    MonitorWall,
    CommandCenter,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown archetype '{0}'")]
pub struct UnknownArchetype(pub String);

impl Archetype {
    pub const ALL: &'static [Archetype] = &[
        Archetype::FocusMetric,
        Archetype::ScannerTable,
        Archetype::DualPaneFlow,
        Archetype::MonitorWall,
        Archetype::CommandCenter,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Archetype::FocusMetric => "FOCUS_METRIC",
            Archetype::ScannerTable => "SCANNER_TABLE",
            Archetype::DualPaneFlow => "DUAL_PANE_FLOW",
            Archetype::MonitorWall => "MONITOR_WALL",
            Archetype::CommandCenter => "COMMAND_CENTER",
        }
    }

    /// Slot names, in allocation order.
    pub fn slots(self) -> Vec<SmolStr> {
        match self {
            Archetype::FocusMetric => vec!["hero".into(), "context".into()],
            Archetype::ScannerTable => vec!["table".into(), "sidebar".into()],
            Archetype::DualPaneFlow => vec!["list".into(), "detail".into()],
            Archetype::MonitorWall => numbered("tile", 8),
            Archetype::CommandCenter => numbered("panel", 12),
        }
    }

    /// The kind of region a slot is reserved for. Slots without one take
    /// whatever is heaviest among the regions left over.
    pub fn slot_kind(self, slot: usize) -> Option<SignalKind> {
        match (self, slot) {
            (Archetype::FocusMetric, 0) => Some(SignalKind::DominantKpi),
            (Archetype::ScannerTable, 0) => Some(SignalKind::Table),
            (Archetype::DualPaneFlow, 0) => Some(SignalKind::ItemList),
            (Archetype::DualPaneFlow, 1) => Some(SignalKind::DetailView),
            _ => None,
        }
    }
}

fn numbered(prefix: &str, n: usize) -> Vec<SmolStr> {
    (1..=n).map(|i| SmolStr::new(format!("{prefix}_{i}"))).collect()
}

impl FromStr for Archetype {
    type Err = UnknownArchetype;

    /// Case-insensitive: `focus_metric` and `FOCUS_METRIC` are the same.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Archetype::ALL
            .iter()
            .copied()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownArchetype(s.to_string()))
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Warning for an `engine_hint` that names no archetype.
pub fn unknown_hint_warning(
    file: &Arc<str>,
    pos: LineCol,
    workspace: &str,
    hint: &str,
) -> Diagnostic {
    let known: Vec<&str> = Archetype::ALL.iter().map(|a| a.as_str()).collect();
    Diagnostic::warning(
        file.clone(),
        pos,
        format!("unknown engine hint '{hint}' on workspace '{workspace}' is ignored"),
    )
    .with_code(codes::UNKNOWN_ENGINE_HINT)
    .with_fix(format!("use one of {}", known.join(", ")))
}

/// Pick an archetype for a workspace's signals. An override always wins.
pub fn select(signals: &[AttentionSignal], hint: Option<Archetype>) -> Archetype {
    let (archetype, rule) = match hint {
        Some(archetype) => (archetype, "engine hint"),
        None => select_by_rules(signals),
    };
    debug!(archetype = %archetype, rule, regions = signals.len(), "archetype selected");
    archetype
}

fn select_by_rules(signals: &[AttentionSignal]) -> (Archetype, &'static str) {
    let n = signals.len();

    if let [only] = signals {
        if only.kind == SignalKind::DominantKpi && only.centi() >= FOCUS_THRESHOLD {
            return (Archetype::FocusMetric, "single dominant kpi");
        }
    }

    // Exactly one of each, wherever they sit among the other regions.
    let pane = |kind| only_of_kind(signals, kind).is_some_and(|s| s.centi() >= PANE_THRESHOLD);
    if pane(SignalKind::ItemList) && pane(SignalKind::DetailView) {
        return (Archetype::DualPaneFlow, "list and detail pair");
    }

    if (1..=2).contains(&n) {
        let table_weight: u32 = signals
            .iter()
            .filter(|s| s.kind == SignalKind::Table)
            .map(AttentionSignal::centi)
            .sum();
        let competing = signals
            .iter()
            .any(|s| s.kind != SignalKind::Table && s.centi() >= COMPETING_THRESHOLD);
        if table_weight >= TABLE_THRESHOLD && !competing {
            return (Archetype::ScannerTable, "table dominated");
        }
    }

    if (3..=MONITOR_MAX_REGIONS).contains(&n) {
        return (Archetype::MonitorWall, "several regions");
    }
    if n > MONITOR_MAX_REGIONS {
        return (Archetype::CommandCenter, "many regions");
    }
    (Archetype::MonitorWall, "fallback")
}

fn only_of_kind(signals: &[AttentionSignal], kind: SignalKind) -> Option<&AttentionSignal> {
    let mut matching = signals.iter().filter(|s| s.kind == kind);
    match (matching.next(), matching.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}
