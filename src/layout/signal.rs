//! Attention signals: how much of the screen a workspace region asks for.
//!
//! Weights are computed in hundredths so threshold comparisons are exact.

use std::fmt;

use smol_str::SmolStr;

use crate::ir::{AppSpec, DisplayMode, SurfaceMode, WorkspaceRegion, WorkspaceSpec};

const BASE: u32 = 50;
const AGGREGATE_BONUS: u32 = 20;
const FILTER_BONUS: u32 = 20;
const LIMIT_BONUS: u32 = 10;
const DETAIL_BONUS: u32 = 20;
const MAX: u32 = 100;

/// Classification of a region's signal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "interchange", serde(rename_all = "snake_case"))]
pub enum SignalKind {
    DominantKpi,
    ItemList,
    DetailView,
    Table,
    Other,
}

impl SignalKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            SignalKind::DominantKpi => "dominant_kpi",
            SignalKind::ItemList => "item_list",
            SignalKind::DetailView => "detail_view",
            SignalKind::Table => "table",
            SignalKind::Other => "other",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weight and classification of one region.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct AttentionSignal {
    pub region: SmolStr,
    /// In `[0, 1]`.
    pub weight: f64,
    pub kind: SignalKind,
}

impl AttentionSignal {
    pub fn new(region: impl Into<SmolStr>, weight: f64, kind: SignalKind) -> Self {
        Self {
            region: region.into(),
            weight,
            kind,
        }
    }

    /// Weight in hundredths.
    pub fn centi(&self) -> u32 {
        centi(self.weight)
    }
}

/// Round a weight to hundredths.
pub fn centi(weight: f64) -> u32 {
    (weight.clamp(0.0, 1.0) * 100.0).round() as u32
}

/// Region weight in hundredths.
pub fn weight_centi(region: &WorkspaceRegion) -> u32 {
    let mut w = BASE;
    if !region.aggregates.is_empty() {
        w += AGGREGATE_BONUS;
    }
    if region.filter.is_some() {
        w += FILTER_BONUS;
    }
    if region.limit.is_some() {
        w += LIMIT_BONUS;
    }
    if region.display == Some(DisplayMode::Detail) {
        w += DETAIL_BONUS;
    }
    w.min(MAX)
}

pub fn weight(region: &WorkspaceRegion) -> f64 {
    f64::from(weight_centi(region)) / 100.0
}

/// Classify a region; the first matching rule wins.
pub fn classify(region: &WorkspaceRegion, app: &AppSpec) -> SignalKind {
    let display = region.display;

    if !region.aggregates.is_empty() && matches!(display, None | Some(DisplayMode::Metrics)) {
        return SignalKind::DominantKpi;
    }
    if display == Some(DisplayMode::Detail) {
        return SignalKind::DetailView;
    }
    if region.limit.is_some() {
        let list_surface = || {
            region
                .source
                .as_ref()
                .and_then(|s| app.surface(&s.name))
                .is_some_and(|s| s.mode == Some(SurfaceMode::List))
        };
        match display {
            Some(DisplayMode::List) => return SignalKind::ItemList,
            None if list_surface() => return SignalKind::ItemList,
            _ => {}
        }
    }
    match display {
        None | Some(DisplayMode::Table) | Some(DisplayMode::List) => SignalKind::Table,
        _ => SignalKind::Other,
    }
}

pub fn evaluate(region: &WorkspaceRegion, app: &AppSpec) -> AttentionSignal {
    AttentionSignal {
        region: region.name.clone(),
        weight: weight(region),
        kind: classify(region, app),
    }
}

/// Signals of every region, in declaration order.
pub fn evaluate_workspace(workspace: &WorkspaceSpec, app: &AppSpec) -> Vec<AttentionSignal> {
    workspace.regions.iter().map(|r| evaluate(r, app)).collect()
}
