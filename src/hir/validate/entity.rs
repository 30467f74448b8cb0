use std::sync::Arc;

use super::{Check, CheckContext};
use crate::base::LineCol;
use crate::hir::diagnostics::{Diagnostic, DiagnosticCollector, RelatedInfo, codes};
use crate::ir::{EntitySpec, FieldSpec};

/// Field names that collide with keywords of the generated code.
pub const RESERVED_FIELD_NAMES: &[&str] = &[
    "class", "def", "default", "delete", "from", "global", "group", "import", "insert", "lambda",
    "limit", "offset", "order", "pass", "return", "select", "table", "type", "update", "where",
    "yield",
];

/// Every entity has exactly one `pk` field.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrimaryKeyCheck;

impl Check for PrimaryKeyCheck {
    fn name(&self) -> &'static str {
        "primary-key"
    }

    fn run(&self, cx: &CheckContext<'_>, out: &mut DiagnosticCollector) {
        for entity in &cx.app.entities {
            let pks: Vec<&FieldSpec> = entity.primary_keys().collect();
            match pks.as_slice() {
                [_] => {}
                [] => out.add(
                    Diagnostic::error(
                        entity.loc.file.clone(),
                        entity.loc.pos,
                        format!("entity '{}' has no primary key", entity.name),
                    )
                    .with_code(codes::PRIMARY_KEY)
                    .with_fix("add a field such as 'id: uuid pk'"),
                ),
                _ => out.extend(extra_primary_keys(entity)),
            }
        }
    }
}

/// The error for an entity with more than one `pk` field, relating every
/// key. The IR builder reports the same diagnostic, so the two collapse.
pub(crate) fn extra_primary_keys(entity: &EntitySpec) -> Option<Diagnostic> {
    let pks: Vec<&FieldSpec> = entity.primary_keys().collect();
    if pks.len() < 2 {
        return None;
    }
    let mut diag = Diagnostic::error(
        entity.loc.file.clone(),
        entity.loc.pos,
        format!(
            "entity '{}' has {} primary keys, expected exactly one",
            entity.name,
            pks.len()
        ),
    )
    .with_code(codes::PRIMARY_KEY);
    for pk in &pks {
        diag = diag.with_related(RelatedInfo::new(
            entity.loc.file.clone(),
            pk.pos,
            format!("primary key '{}'", pk.name),
        ));
    }
    Some(diag)
}

/// Warns about field names reserved by code generators.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReservedNameCheck;

impl Check for ReservedNameCheck {
    fn name(&self) -> &'static str {
        "reserved-names"
    }

    fn run(&self, cx: &CheckContext<'_>, out: &mut DiagnosticCollector) {
        let app = cx.app;
        let owners = app
            .entities
            .iter()
            .map(|e| (&e.name, &e.loc.file, &e.fields))
            .chain(app.foreign_models.iter().map(|f| (&f.name, &f.loc.file, &f.fields)));

        for (owner, file, fields) in owners {
            for field in fields {
                if RESERVED_FIELD_NAMES.contains(&field.name.as_str()) {
                    out.add(
                        Diagnostic::warning(
                            file.clone(),
                            field.pos,
                            format!("field name '{}' in '{owner}' is reserved by code generators", field.name),
                        )
                        .with_code(codes::RESERVED_NAME)
                        .with_fix(format!("rename it, for example to '{}_value'", field.name)),
                    );
                }
            }
        }
    }
}

/// `unique`/`index` constraints refer to declared fields.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConstraintCheck;

impl Check for ConstraintCheck {
    fn name(&self) -> &'static str {
        "constraints"
    }

    fn run(&self, cx: &CheckContext<'_>, out: &mut DiagnosticCollector) {
        for entity in &cx.app.entities {
            for constraint in &entity.constraints {
                for name in &constraint.fields {
                    if entity.field(name).is_none() {
                        out.add(
                            Diagnostic::error(
                                entity.loc.file.clone(),
                                constraint.pos,
                                format!(
                                    "{} constraint on '{}' refers to undeclared field '{name}'",
                                    constraint.kind, entity.name
                                ),
                            )
                            .with_code(codes::INVALID_CONSTRAINT),
                        );
                    }
                }
            }
        }
    }
}

/// Style: PascalCase entity names, snake_case field and region names.
#[derive(Clone, Copy, Debug, Default)]
pub struct NamingCheck;

fn is_pascal_case(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase())
        && name.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_snake_case(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn naming_warning(file: &Arc<str>, pos: LineCol, what: &str, name: &str, style: &str) -> Diagnostic {
    Diagnostic::warning(file.clone(), pos, format!("{what} name '{name}' should be {style}"))
        .with_code(codes::NAMING_CONVENTION)
}

impl Check for NamingCheck {
    fn name(&self) -> &'static str {
        "naming"
    }

    fn run(&self, cx: &CheckContext<'_>, out: &mut DiagnosticCollector) {
        let app = cx.app;
        let types = app
            .entities
            .iter()
            .map(|e| ("entity", &e.name, &e.loc, &e.fields))
            .chain(app.foreign_models.iter().map(|f| ("foreign model", &f.name, &f.loc, &f.fields)));

        for (what, name, loc, fields) in types {
            if !is_pascal_case(name) {
                out.add(naming_warning(&loc.file, loc.pos, what, name, "PascalCase"));
            }
            for field in fields {
                if !is_snake_case(&field.name) {
                    out.add(naming_warning(&loc.file, field.pos, "field", &field.name, "snake_case"));
                }
            }
        }

        for ws in &app.workspaces {
            for region in &ws.regions {
                if !is_snake_case(&region.name) {
                    out.add(naming_warning(&ws.loc.file, region.pos, "region", &region.name, "snake_case"));
                }
            }
        }
    }
}
