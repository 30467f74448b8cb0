use std::sync::Arc;

use super::fields::{check_condition, check_field, check_path, source_entity};
use super::{Check, CheckContext};
use crate::hir::diagnostics::{Diagnostic, DiagnosticCollector, RelatedInfo, codes};
use crate::ir::{AggregateExpr, AggregateFn, EntitySpec, FieldType, WorkspaceRegion, WorkspaceSpec};
use crate::layout::{Archetype, unknown_hint_warning};

/// Regions, their fields, limits and the engine hint.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkspaceCheck;

impl Check for WorkspaceCheck {
    fn name(&self) -> &'static str {
        "workspaces"
    }

    fn run(&self, cx: &CheckContext<'_>, out: &mut DiagnosticCollector) {
        for ws in &cx.app.workspaces {
            let file = &ws.loc.file;

            if ws.regions.is_empty() {
                out.add(
                    Diagnostic::error(
                        file.clone(),
                        ws.loc.pos,
                        format!("workspace '{}' has no regions", ws.name),
                    )
                    .with_code(codes::MISSING_REQUIRED),
                );
            }

            if let Some(hint) = &ws.engine_hint {
                if hint.name.parse::<Archetype>().is_err() {
                    out.add(unknown_hint_warning(file, hint.pos, &ws.name, &hint.name));
                }
            }

            for (i, region) in ws.regions.iter().enumerate() {
                if let Some(first) = ws.regions[..i].iter().find(|r| r.name == region.name) {
                    out.duplicate_definition(
                        file,
                        region.pos,
                        "region",
                        &region.name,
                        RelatedInfo::new(file.clone(), first.pos, "first declared here"),
                    );
                }
                check_region(cx, ws, region, out);
            }
        }
    }
}

fn check_region(
    cx: &CheckContext<'_>,
    ws: &WorkspaceSpec,
    region: &WorkspaceRegion,
    out: &mut DiagnosticCollector,
) {
    let file = &ws.loc.file;
    let context = format!("region '{}' of workspace '{}'", region.name, ws.name);

    if region.source.is_none() && region.aggregates.is_empty() {
        out.add(
            Diagnostic::error(
                file.clone(),
                region.pos,
                format!("{context} has neither a source nor aggregates"),
            )
            .with_code(codes::MISSING_REQUIRED)
            .with_fix("add 'source: <Entity or surface>'"),
        );
    }

    if region.limit == Some(0) {
        out.add(
            Diagnostic::error(file.clone(), region.pos, format!("{context} has a zero limit"))
                .with_code(codes::INVALID_VALUE),
        );
    }

    let entity = region.source.as_ref().and_then(|s| source_entity(cx, s));
    if let Some(entity) = entity {
        if let Some(filter) = &region.filter {
            check_condition(cx, file, entity, filter, &context, out);
        }
        for key in &region.sort {
            check_path(cx, file, entity, &key.field, &context, out);
        }
    }

    for (name, agg) in &region.aggregates {
        let agg_context = format!("aggregate '{name}' of {context}");
        check_aggregate(cx, file, entity, agg, &agg_context, out);
    }
}

fn check_aggregate(
    cx: &CheckContext<'_>,
    file: &Arc<str>,
    source: Option<&EntitySpec>,
    agg: &AggregateExpr,
    context: &str,
    out: &mut DiagnosticCollector,
) {
    if agg.func == AggregateFn::Count {
        // the target itself is resolved by the references check
        if let (Some(target), Some(filter)) = (cx.app.entity(&agg.target), &agg.filter) {
            check_condition(cx, file, target, filter, context, out);
        }
        return;
    }

    let Some(entity) = source else {
        out.add(
            Diagnostic::error(
                file.clone(),
                agg.pos,
                format!("{}({}) in {context} needs a region source entity", agg.func.as_str(), agg.target),
            )
            .with_code(codes::MISSING_REQUIRED),
        );
        return;
    };
    let Some(field) = entity.field(&agg.target) else {
        check_field(cx, file, entity, &agg.target, agg.pos, context, out);
        return;
    };

    let numeric = matches!(field.ty, FieldType::Int | FieldType::Decimal { .. });
    let ordered = numeric || matches!(field.ty, FieldType::Date | FieldType::Datetime);
    let ok = match agg.func {
        AggregateFn::Sum | AggregateFn::Avg => numeric,
        _ => ordered,
    };
    if !ok {
        out.add(
            Diagnostic::error(
                file.clone(),
                agg.pos,
                format!(
                    "{}() in {context} cannot be applied to {} field '{}'",
                    agg.func.as_str(),
                    field.ty,
                    field.name
                ),
            )
            .with_code(codes::TYPE_MISMATCH),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::validate::tests::{linked, run};

    const BASE: &str = "\
module app
entity Order \"Order\":
  id: uuid pk
  amount: decimal(10,2)
  status: enum[open,closed]
  placed: datetime
surface orders:
  uses entity Order
  mode: list
";

    #[test]
    fn test_region_fields_against_surface_entity() {
        let app = linked(&format!(
            "{BASE}workspace sales:\n  recent:\n    source: orders\n    filter: state = open\n    sort: placed desc\n"
        ));
        let diags = run(WorkspaceCheck, &app);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.starts_with("unknown field 'state' on entity 'Order'"));
    }

    #[test]
    fn test_aggregate_types() {
        let app = linked(&format!(
            "{BASE}workspace sales:\n  kpis:\n    source: Order\n    aggregate:\n      revenue: sum(amount)\n      latest: max(placed)\n      bad: avg(status)\n      open: count(Order where status = open)\n"
        ));
        let diags = run(WorkspaceCheck, &app);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code.as_deref(), Some(codes::TYPE_MISMATCH));
        assert!(diags[0].message.contains("aggregate 'bad'"));
    }

    #[test]
    fn test_empty_workspace_and_unknown_hint() {
        let app = linked(&format!("{BASE}workspace idle:\n  engine_hint: bento\n"));
        let diags = run(WorkspaceCheck, &app);
        let found: Vec<_> = diags.iter().filter_map(|d| d.code.as_deref()).collect();
        assert_eq!(found, vec![codes::MISSING_REQUIRED, codes::UNKNOWN_ENGINE_HINT]);
    }

    #[test]
    fn test_known_hint_is_accepted() {
        let app = linked(&format!(
            "{BASE}workspace sales:\n  engine_hint: \"SCANNER_TABLE\"\n  all:\n    source: Order\n"
        ));
        assert!(run(WorkspaceCheck, &app).is_empty());
    }
}
