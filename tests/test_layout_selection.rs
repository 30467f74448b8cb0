//! Archetype selection thresholds and slot allocation.

use appspec::layout::{Archetype, AttentionSignal, SignalKind, select};
use appspec::{CompileOptions, SourceInput, compile_sources};
use rstest::rstest;

fn signal(name: &str, weight: f64, kind: SignalKind) -> AttentionSignal {
    AttentionSignal::new(name, weight, kind)
}

#[rstest]
#[case(0.7, Archetype::FocusMetric)]
#[case(1.0, Archetype::FocusMetric)]
#[case(0.69, Archetype::MonitorWall)]
fn test_focus_metric_threshold(#[case] weight: f64, #[case] expected: Archetype) {
    let signals = [signal("kpi", weight, SignalKind::DominantKpi)];
    assert_eq!(select(&signals, None), expected);
}

#[rstest]
#[case(0.3, 0.3, Archetype::DualPaneFlow)]
#[case(0.6, 0.7, Archetype::DualPaneFlow)]
#[case(0.29, 0.7, Archetype::MonitorWall)]
fn test_dual_pane_threshold(#[case] list: f64, #[case] detail: f64, #[case] expected: Archetype) {
    let signals = [
        signal("inbox", list, SignalKind::ItemList),
        signal("preview", detail, SignalKind::DetailView),
    ];
    assert_eq!(select(&signals, None), expected);
}

#[rstest]
#[case(&[0.6], Archetype::ScannerTable)]
#[case(&[0.3, 0.3], Archetype::ScannerTable)]
#[case(&[0.59], Archetype::MonitorWall)]
fn test_scanner_table_combined_weight(#[case] weights: &[f64], #[case] expected: Archetype) {
    let signals: Vec<_> = weights
        .iter()
        .map(|w| signal("t", *w, SignalKind::Table))
        .collect();
    assert_eq!(select(&signals, None), expected);
}

#[rstest]
#[case(3, Archetype::MonitorWall)]
#[case(8, Archetype::MonitorWall)]
#[case(9, Archetype::CommandCenter)]
#[case(20, Archetype::CommandCenter)]
fn test_region_count_rules(#[case] count: usize, #[case] expected: Archetype) {
    let signals: Vec<_> = (0..count)
        .map(|i| signal(&format!("r{i}"), 0.5, SignalKind::Table))
        .collect();
    assert_eq!(select(&signals, None), expected);
}

fn workspace_source(regions: &str) -> String {
    format!(
        "\
module app
entity Ticket:
  id: uuid pk
  open: bool
  subject: str(200)
surface ticket_list:
  uses entity Ticket
  mode: list
workspace desk \"Desk\":
{regions}"
    )
}

fn plan_for(regions: &str, options: CompileOptions) -> appspec::LayoutPlan {
    let source = SourceInput::new("app.dsl", workspace_source(regions));
    let result = compile_sources(&[source], &options);
    assert!(!result.has_errors(), "{}", result.render_human());
    result.plan("desk").unwrap().clone()
}

const LIST_AND_DETAIL: &str = "\
  inbox:
    source: ticket_list
    limit: 20
  preview:
    source: Ticket
    display: detail
";

#[test]
fn test_dual_pane_from_source_and_removal_changes_it() {
    let plan = plan_for(LIST_AND_DETAIL, CompileOptions::new("app"));
    assert_eq!(plan.archetype, Archetype::DualPaneFlow);
    assert_eq!(plan.signals[0].kind, SignalKind::ItemList);
    assert_eq!(plan.signals[0].centi(), 60);
    assert_eq!(plan.signals[1].centi(), 70);
    assert_eq!(plan.slot_of("inbox"), Some("list"));
    assert_eq!(plan.slot_of("preview"), Some("detail"));

    let list_only = "  inbox:\n    source: ticket_list\n    limit: 20\n";
    let plan = plan_for(list_only, CompileOptions::new("app"));
    assert_ne!(plan.archetype, Archetype::DualPaneFlow);
}

#[test]
fn test_dual_pane_with_a_third_region() {
    let regions = format!("{LIST_AND_DETAIL}  everything:\n    source: Ticket\n");
    let source = SourceInput::new("app.dsl", workspace_source(&regions));
    let result = compile_sources(&[source], &CompileOptions::new("app"));
    let plan = result.plan("desk").unwrap();
    assert_eq!(plan.archetype, Archetype::DualPaneFlow);
    assert_eq!(plan.slot_of("inbox"), Some("list"));
    assert_eq!(plan.slot_of("preview"), Some("detail"));
    assert_eq!(plan.slot_of("everything"), None);
    assert_eq!(result.warnings().count(), 1);
    assert_eq!(plan.warnings[0].line, 16);
}

#[test]
fn test_invalid_external_hint_keeps_source_hint() {
    let regions = format!("  engine_hint: monitor_wall\n{LIST_AND_DETAIL}");
    let source = SourceInput::new("app.dsl", workspace_source(&regions));
    let result = compile_sources(
        &[source],
        &CompileOptions::new("app").with_engine_hint("desk", "bento"),
    );
    let plan = result.plan("desk").unwrap();
    assert_eq!(plan.archetype, Archetype::MonitorWall);
    assert_eq!(plan.warnings.len(), 1);
    assert!(plan.warnings[0].message.contains("bento"));
}

#[test]
fn test_focus_metric_from_kpi_region() {
    let kpi = "  open_count:\n    aggregate:\n      total: count(Ticket where open = true)\n";
    let plan = plan_for(kpi, CompileOptions::new("app"));
    assert_eq!(plan.archetype, Archetype::FocusMetric);
    assert_eq!(plan.slot_of("open_count"), Some("hero"));
}

#[test]
fn test_external_hint_beats_source_hint() {
    let regions = format!("  engine_hint: monitor_wall\n{LIST_AND_DETAIL}");
    let plan = plan_for(&regions, CompileOptions::new("app"));
    assert_eq!(plan.archetype, Archetype::MonitorWall);

    let plan = plan_for(
        &regions,
        CompileOptions::new("app").with_engine_hint("desk", "SCANNER_TABLE"),
    );
    assert_eq!(plan.archetype, Archetype::ScannerTable);
}

#[test]
fn test_overflowing_regions_only_warn() {
    let regions: String = (0..10)
        .map(|i| format!("  r{i}:\n    source: Ticket\n"))
        .collect();
    let source = SourceInput::new("app.dsl", workspace_source(&regions));
    let result = compile_sources(
        &[source],
        &CompileOptions::new("app").with_engine_hint("desk", "focus_metric"),
    );
    assert!(!result.has_errors());
    let plan = result.plan("desk").unwrap();
    assert_eq!(plan.allocations.len(), 2);
    assert_eq!(plan.warnings.len(), 8);
    assert_eq!(result.warnings().count(), 8);
}
