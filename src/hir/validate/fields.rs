//! Field lookups shared by the checks.

use std::sync::Arc;

use smol_str::SmolStr;

use super::CheckContext;
use crate::base::LineCol;
use crate::hir::diagnostics::{Diagnostic, DiagnosticCollector, codes};
use crate::ir::{Condition, EntitySpec, FieldPath, NameRef};

/// The entity a region source stands for: the entity itself, or the entity a
/// surface uses.
pub(super) fn source_entity<'a>(cx: &CheckContext<'a>, source: &NameRef) -> Option<&'a EntitySpec> {
    let app = cx.app;
    app.entity(&source.name).or_else(|| {
        app.surface(&source.name)
            .and_then(|s| s.entity.as_ref())
            .and_then(|e| app.entity(&e.name))
    })
}

fn suggest(entity: &EntitySpec, name: &str, threshold: f64) -> Option<SmolStr> {
    entity
        .fields
        .iter()
        .map(|f| (strsim::jaro_winkler(name, &f.name), &f.name))
        .filter(|(score, _)| *score >= threshold)
        .fold(None, |best: Option<(f64, &SmolStr)>, (score, name)| match best {
            Some((b, _)) if b >= score => best,
            _ => Some((score, name)),
        })
        .map(|(_, name)| name.clone())
}

/// `unknown field 'x' on entity 'E' in <context>`.
pub(super) fn unknown_field(
    cx: &CheckContext<'_>,
    file: &Arc<str>,
    pos: LineCol,
    entity: &EntitySpec,
    name: &str,
    context: &str,
) -> Diagnostic {
    let mut diag = Diagnostic::error(
        file.clone(),
        pos,
        format!("unknown field '{name}' on entity '{}' in {context}", entity.name),
    )
    .with_code(codes::UNRESOLVED_REFERENCE);
    if let Some(candidate) = suggest(entity, name, cx.threshold) {
        diag = diag.with_fix(format!("did you mean '{candidate}'?"));
    }
    diag
}

/// Check a plain field name against `entity`.
pub(super) fn check_field(
    cx: &CheckContext<'_>,
    file: &Arc<str>,
    entity: &EntitySpec,
    name: &str,
    pos: LineCol,
    context: &str,
    out: &mut DiagnosticCollector,
) {
    if entity.field(name).is_none() {
        out.add(unknown_field(cx, file, pos, entity, name, context));
    }
}

/// Check a possibly dotted path. A dotted path follows exactly one `ref`.
pub(super) fn check_path(
    cx: &CheckContext<'_>,
    file: &Arc<str>,
    entity: &EntitySpec,
    path: &FieldPath,
    context: &str,
    out: &mut DiagnosticCollector,
) {
    let Some(head) = entity.field(path.head()) else {
        out.add(unknown_field(cx, file, path.pos, entity, path.head(), context));
        return;
    };
    let rest = &path.segments[1..];
    if rest.is_empty() {
        return;
    }

    let Some(target) = head.ty.ref_target() else {
        out.add(
            Diagnostic::error(
                file.clone(),
                path.pos,
                format!("'{}' is not a reference field, cannot follow '{path}' in {context}", head.name),
            )
            .with_code(codes::TYPE_MISMATCH),
        );
        return;
    };
    if rest.len() > 1 {
        out.add(
            Diagnostic::error(
                file.clone(),
                path.pos,
                format!("field path '{path}' in {context} follows more than one reference"),
            )
            .with_code(codes::INVALID_VALUE),
        );
        return;
    }
    // an unknown target is reported by the references check
    if let Some(target) = cx.app.entity(target) {
        check_field(cx, file, target, &rest[0], path.pos, context, out);
    }
}

pub(super) fn check_condition(
    cx: &CheckContext<'_>,
    file: &Arc<str>,
    entity: &EntitySpec,
    condition: &Condition,
    context: &str,
    out: &mut DiagnosticCollector,
) {
    for path in condition.fields() {
        check_path(cx, file, entity, path, context, out);
    }
}
