use std::sync::Arc;

use super::fields::{check_condition, check_field};
use super::{Check, CheckContext};
use crate::hir::diagnostics::{Diagnostic, DiagnosticCollector, codes};
use crate::ir::{ActionRef, EntitySpec, Outcome, SurfaceSpec};

fn surface_entity<'a>(cx: &CheckContext<'a>, surface: &SurfaceSpec) -> Option<&'a EntitySpec> {
    surface.entity.as_ref().and_then(|e| cx.app.entity(&e.name))
}

/// Report `integration.action` when the integration exists but declares no
/// such action. Unknown integrations are left to the references check.
pub(super) fn check_integration_action(
    cx: &CheckContext<'_>,
    file: &Arc<str>,
    target: &ActionRef,
    out: &mut DiagnosticCollector,
) {
    let Some(integration) = cx.app.integration(&target.integration.name) else {
        return;
    };
    if integration.action(&target.action.name).is_some() {
        return;
    }
    let names: Vec<&str> = integration.actions.iter().map(|a| a.name.as_str()).collect();
    let mut diag = Diagnostic::error(
        file.clone(),
        target.action.pos,
        format!(
            "integration '{}' has no action '{}'",
            integration.name, target.action.name
        ),
    )
    .with_code(codes::UNRESOLVED_REFERENCE);
    if !names.is_empty() {
        diag = diag.with_fix(format!("declared actions: {}", names.join(", ")));
    }
    out.add(diag);
}

/// Section fields, entity requirements of modes, and integration actions.
#[derive(Clone, Copy, Debug, Default)]
pub struct SurfaceCheck;

impl Check for SurfaceCheck {
    fn name(&self) -> &'static str {
        "surfaces"
    }

    fn run(&self, cx: &CheckContext<'_>, out: &mut DiagnosticCollector) {
        for surface in &cx.app.surfaces {
            let file = &surface.loc.file;

            if let Some(mode) = surface.mode {
                if mode.requires_entity() && surface.entity.is_none() {
                    out.add(
                        Diagnostic::error(
                            file.clone(),
                            surface.loc.pos,
                            format!("surface '{}' in {mode} mode must use an entity", surface.name),
                        )
                        .with_code(codes::MISSING_REQUIRED)
                        .with_fix("add 'uses entity <Name>'"),
                    );
                }
            }

            if let Some(entity) = surface_entity(cx, surface) {
                let context = format!("surface '{}'", surface.name);
                for section in &surface.sections {
                    for element in &section.elements {
                        check_field(cx, file, entity, &element.field.name, element.field.pos, &context, out);
                    }
                }
            }

            for action in &surface.actions {
                if let Some(Outcome::Integration(target)) = &action.outcome {
                    check_integration_action(cx, file, target, out);
                }
            }
        }
    }
}

/// Persona scopes name fields of the surface entity.
#[derive(Clone, Copy, Debug, Default)]
pub struct PersonaCheck;

impl Check for PersonaCheck {
    fn name(&self) -> &'static str {
        "personas"
    }

    fn run(&self, cx: &CheckContext<'_>, out: &mut DiagnosticCollector) {
        for surface in &cx.app.surfaces {
            let Some(entity) = surface_entity(cx, surface) else {
                continue;
            };
            for persona in &surface.personas {
                if let Some(scope) = &persona.scope {
                    let context = format!("persona '{}' of surface '{}'", persona.name, surface.name);
                    check_condition(cx, &surface.loc.file, entity, scope, &context, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::validate::tests::{linked, run};

    const BASE: &str = "\
module app
entity Task:
  id: uuid pk
  title: str(100)
  owner_id: uuid
integration sync:
  action push:
    call tracker.create
service tracker:
  spec_url: \"https://example.com/api\"
";

    #[test]
    fn test_unknown_section_field_with_suggestion() {
        let app = linked(&format!(
            "{BASE}surface task_view:\n  uses entity Task\n  mode: view\n  section main:\n    field titel \"Title\"\n"
        ));
        let diags = run(SurfaceCheck, &app);
        assert_eq!(diags.len(), 1);
        assert_eq!(
            &*diags[0].message,
            "unknown field 'titel' on entity 'Task' in surface 'task_view'"
        );
        assert_eq!(diags[0].fix.as_deref(), Some("did you mean 'title'?"));
    }

    #[test]
    fn test_list_mode_requires_entity() {
        let app = linked(&format!("{BASE}surface all:\n  mode: list\nsurface hub:\n  mode: custom\n"));
        let diags = run(SurfaceCheck, &app);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code.as_deref(), Some(codes::MISSING_REQUIRED));
        assert!(diags[0].message.contains("'all' in list mode"));
    }

    #[test]
    fn test_unknown_integration_action() {
        let app = linked(&format!(
            "{BASE}surface hub:\n  mode: custom\n  action sync_now:\n    on click -> integration sync.pull\n"
        ));
        let diags = run(SurfaceCheck, &app);
        assert_eq!(diags.len(), 1);
        assert_eq!(&*diags[0].message, "integration 'sync' has no action 'pull'");
        assert_eq!(diags[0].fix.as_deref(), Some("declared actions: push"));
    }

    #[test]
    fn test_persona_scope_fields() {
        let app = linked(&format!(
            "{BASE}surface mine:\n  uses entity Task\n  mode: list\n  for member:\n    scope: owner = current_user\n"
        ));
        let diags = run(PersonaCheck, &app);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("unknown field 'owner'"));
        assert_eq!(diags[0].fix.as_deref(), Some("did you mean 'owner_id'?"));
    }
}
