//! Layout plans: archetype plus region-to-slot allocation per workspace.

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::debug;

use super::archetype::{Archetype, select, unknown_hint_warning};
use super::signal::{AttentionSignal, evaluate_workspace};
use crate::hir::{Diagnostic, codes};
use crate::ir::{AppSpec, WorkspaceSpec};

/// A region placed in a slot.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotAllocation {
    pub region: SmolStr,
    pub slot: SmolStr,
}

/// Layout decision for one workspace. A pure function of the AppSpec and
/// the engine hint.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutPlan {
    pub workspace: SmolStr,
    pub archetype: Archetype,
    /// In slot order.
    pub allocations: Vec<SlotAllocation>,
    /// Unknown hints and regions that did not fit.
    pub warnings: Vec<Diagnostic>,
    /// One per region, in declaration order.
    pub signals: Vec<AttentionSignal>,
}

impl LayoutPlan {
    pub fn slot_of(&self, region: &str) -> Option<&str> {
        self.allocations
            .iter()
            .find(|a| a.region == region)
            .map(|a| a.slot.as_str())
    }
}

/// Plan one workspace. `hint_override` takes precedence over the
/// workspace's own `engine_hint` when it names an archetype.
pub fn plan_workspace(
    app: &AppSpec,
    workspace: &WorkspaceSpec,
    hint_override: Option<&str>,
) -> LayoutPlan {
    let mut warnings = Vec::new();

    // The external hint first; an unusable one falls back to the source hint.
    let candidates = [
        hint_override.map(|text| (text, workspace.loc.pos)),
        workspace.engine_hint.as_ref().map(|h| (h.name.as_str(), h.pos)),
    ];
    let mut hint = None;
    for (text, pos) in candidates.into_iter().flatten() {
        match text.parse::<Archetype>() {
            Ok(archetype) => {
                hint = Some(archetype);
                break;
            }
            Err(_) => warnings.push(unknown_hint_warning(
                &workspace.loc.file,
                pos,
                &workspace.name,
                text,
            )),
        }
    }

    let signals = evaluate_workspace(workspace, app);
    let archetype = select(&signals, hint);

    // Heaviest first; the stable sort keeps declaration order among equals.
    let mut ranked: Vec<usize> = (0..signals.len()).collect();
    ranked.sort_by_key(|&i| std::cmp::Reverse(signals[i].centi()));

    let slots = archetype.slots();
    let mut placed: Vec<Option<usize>> = vec![None; slots.len()];

    // Reserved slots take the heaviest region of their kind.
    for (slot, entry) in placed.iter_mut().enumerate() {
        if let Some(kind) = archetype.slot_kind(slot) {
            *entry = ranked.iter().copied().find(|&i| signals[i].kind == kind);
        }
    }
    let mut rest = ranked
        .iter()
        .copied()
        .filter(|i| !placed.contains(&Some(*i)))
        .collect::<Vec<_>>()
        .into_iter();
    for entry in placed.iter_mut().filter(|e| e.is_none()) {
        *entry = rest.next();
    }

    let allocations: Vec<SlotAllocation> = placed
        .iter()
        .zip(&slots)
        .filter_map(|(entry, slot)| {
            entry.map(|i| SlotAllocation {
                region: workspace.regions[i].name.clone(),
                slot: slot.clone(),
            })
        })
        .collect();

    for region in rest.map(|i| &workspace.regions[i]) {
        warnings.push(
            Diagnostic::warning(
                workspace.loc.file.clone(),
                region.pos,
                format!(
                    "region '{}' does not fit the {} layout of workspace '{}' ({} slots)",
                    region.name,
                    archetype,
                    workspace.name,
                    slots.len()
                ),
            )
            .with_code(codes::LAYOUT_BUDGET),
        );
    }

    debug!(
        workspace = %workspace.name,
        archetype = %archetype,
        placed = allocations.len(),
        unplaced = ranked.len() - allocations.len(),
        "slots allocated"
    );

    LayoutPlan {
        workspace: workspace.name.clone(),
        archetype,
        allocations,
        warnings,
        signals,
    }
}

/// Plan every workspace, in AppSpec order. `overrides` maps workspace names
/// to external engine hints.
pub fn plan_all(app: &AppSpec, overrides: &IndexMap<SmolStr, SmolStr>) -> Vec<LayoutPlan> {
    app.workspaces
        .iter()
        .map(|ws| plan_workspace(app, ws, overrides.get(&ws.name).map(SmolStr::as_str)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::LineCol;
    use crate::ir::{DisplayMode, Loc, NameRef, WorkspaceRegion};

    fn workspace(regions: Vec<WorkspaceRegion>) -> WorkspaceSpec {
        WorkspaceSpec {
            name: "home".into(),
            title: None,
            purpose: None,
            engine_hint: None,
            regions,
            meta: Default::default(),
            loc: Loc::new("home.dsl", LineCol::default()),
        }
    }

    fn region(name: &str, line: u32) -> WorkspaceRegion {
        WorkspaceRegion::new(name, LineCol::new(line, 2))
    }

    #[test]
    fn test_allocation_by_weight_then_declaration() {
        let mut detail = region("detail", 2);
        detail.display = Some(DisplayMode::Detail);
        let mut list = region("list", 1);
        list.display = Some(DisplayMode::List);
        list.limit = Some(10);
        let ws = workspace(vec![list, detail]);

        let plan = plan_workspace(&AppSpec::new("a"), &ws, None);
        assert_eq!(plan.archetype, Archetype::DualPaneFlow);
        // the detail region is heavier but keeps its own pane
        assert_eq!(plan.slot_of("list"), Some("list"));
        assert_eq!(plan.slot_of("detail"), Some("detail"));
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_dual_pane_extra_region_overflows() {
        let mut detail = region("preview", 2);
        detail.display = Some(DisplayMode::Detail);
        let mut list = region("inbox", 1);
        list.display = Some(DisplayMode::List);
        list.limit = Some(10);
        let ws = workspace(vec![region("totals", 3), list, detail]);

        let plan = plan_workspace(&AppSpec::new("a"), &ws, None);
        assert_eq!(plan.archetype, Archetype::DualPaneFlow);
        assert_eq!(plan.slot_of("inbox"), Some("list"));
        assert_eq!(plan.slot_of("preview"), Some("detail"));
        assert_eq!(plan.slot_of("totals"), None);
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.warnings[0].message.contains("'totals'"));
    }

    #[test]
    fn test_unplaced_regions_warn() {
        let ws = workspace(vec![region("a", 1), region("b", 2), region("c", 3)]);
        let plan = plan_workspace(&AppSpec::new("a"), &ws, Some("focus_metric"));
        assert_eq!(plan.archetype, Archetype::FocusMetric);
        assert_eq!(plan.allocations.len(), 2);
        assert_eq!(plan.slot_of("a"), Some("hero"));
        assert_eq!(plan.warnings.len(), 1);
        assert_eq!(plan.warnings[0].code.as_deref(), Some(codes::LAYOUT_BUDGET));
        assert_eq!(plan.warnings[0].line, 4);
    }

    #[test]
    fn test_external_hint_wins_and_unknown_is_ignored() {
        let mut ws = workspace(vec![region("a", 1)]);
        ws.engine_hint = Some(NameRef::new("command_center", LineCol::new(1, 15)));

        let plan = plan_workspace(&AppSpec::new("a"), &ws, None);
        assert_eq!(plan.archetype, Archetype::CommandCenter);

        let plan = plan_workspace(&AppSpec::new("a"), &ws, Some("SCANNER_TABLE"));
        assert_eq!(plan.archetype, Archetype::ScannerTable);

        // an unusable external hint falls back to the source hint
        let plan = plan_workspace(&AppSpec::new("a"), &ws, Some("bento"));
        assert_eq!(plan.warnings[0].code.as_deref(), Some(codes::UNKNOWN_ENGINE_HINT));
        assert_eq!(plan.archetype, Archetype::CommandCenter);

        ws.engine_hint = None;
        let plan = plan_workspace(&AppSpec::new("a"), &ws, Some("bento"));
        assert_eq!(plan.warnings.len(), 1);
        // a single plain table region at 0.5 falls through to the fallback
        assert_eq!(plan.archetype, Archetype::MonitorWall);
    }
}
