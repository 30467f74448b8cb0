use super::surface::check_integration_action;
use super::{Check, CheckContext};
use crate::hir::diagnostics::{Diagnostic, DiagnosticCollector, codes};
use crate::ir::{ExperienceSpec, NameRef, StepKind};

/// Start and transition targets are declared steps; surface steps name a
/// surface; integration steps name a declared action.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExperienceCheck;

fn unknown_step(experience: &ExperienceSpec, target: &NameRef) -> Diagnostic {
    Diagnostic::error(
        experience.loc.file.clone(),
        target.pos,
        format!(
            "experience '{}' has no step '{}'",
            experience.name, target.name
        ),
    )
    .with_code(codes::UNRESOLVED_REFERENCE)
}

impl Check for ExperienceCheck {
    fn name(&self) -> &'static str {
        "experiences"
    }

    fn run(&self, cx: &CheckContext<'_>, out: &mut DiagnosticCollector) {
        for experience in &cx.app.experiences {
            let file = &experience.loc.file;

            match &experience.start {
                None => out.add(
                    Diagnostic::error(
                        file.clone(),
                        experience.loc.pos,
                        format!("experience '{}' has no start step", experience.name),
                    )
                    .with_code(codes::MISSING_REQUIRED)
                    .with_fix("add 'start at step <name>'"),
                ),
                Some(start) if experience.step(&start.name).is_none() => {
                    out.add(unknown_step(experience, start))
                }
                Some(_) => {}
            }

            for step in &experience.steps {
                if step.kind == StepKind::Surface && step.surface.is_none() {
                    out.add(
                        Diagnostic::error(
                            file.clone(),
                            step.pos,
                            format!(
                                "surface step '{}' of experience '{}' names no surface",
                                step.name, experience.name
                            ),
                        )
                        .with_code(codes::MISSING_REQUIRED),
                    );
                }
                if let Some(target) = &step.integration {
                    check_integration_action(cx, file, target, out);
                }
                for transition in &step.transitions {
                    if experience.step(&transition.target.name).is_none() {
                        out.add(unknown_step(experience, &transition.target));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::validate::tests::{linked, run};

    #[test]
    fn test_experience_steps() {
        let app = linked(
            "\
module app
surface form:
  mode: custom
experience onboarding \"Onboarding\":
  start at step welcome
  step welcome:
    surface form
    on next -> step confirm
  step confirm:
    kind: surface
    on done -> step finish
",
        );
        let diags = run(ExperienceCheck, &app);
        let messages: Vec<&str> = diags.iter().map(|d| &*d.message).collect();
        assert_eq!(
            messages,
            vec![
                "surface step 'confirm' of experience 'onboarding' names no surface",
                "experience 'onboarding' has no step 'finish'",
            ]
        );
    }

    #[test]
    fn test_missing_start() {
        let app = linked("module app\nexperience flow:\n  step only:\n    kind: process\n");
        let diags = run(ExperienceCheck, &app);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code.as_deref(), Some(codes::MISSING_REQUIRED));
    }
}
