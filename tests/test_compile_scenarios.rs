//! End-to-end compilation of small multi-file projects.

use appspec::hir::{codes, validate};
use appspec::project::Compilation;
use appspec::{CompileOptions, SourceInput, compile_sources};
use once_cell::sync::Lazy;

const CORE: &str = "\
module core
entity User \"User\":
  id: uuid pk
  email: email required unique
  name: str(120) required
";

const APP: &str = "\
module app
use core
app tasks \"Task Tracker\"
entity Task \"Task\":
  id: uuid pk
  title: str(200) required
  done: bool = false
  owner: ref User required
  created: datetime auto_add
  index owner
surface task_list \"Tasks\":
  uses entity Task
  mode: list
  section main:
    field title \"Title\"
    field done \"Done\"
  action open:
    on click -> surface task_detail
surface task_detail \"Task\":
  uses entity Task
  mode: view
  section main:
    field title
    field owner
";

/// The clean two-module project, compiled once and shared.
static TASKS: Lazy<Compilation> = Lazy::new(|| compile(&[("app.dsl", APP), ("core.dsl", CORE)]));

fn compile(sources: &[(&str, &str)]) -> Compilation {
    let inputs: Vec<SourceInput> = sources
        .iter()
        .map(|(path, text)| SourceInput::new(*path, *text))
        .collect();
    compile_sources(&inputs, &CompileOptions::new("app"))
}

#[test]
fn test_user_task_scenario_links_cleanly() {
    let result = &*TASKS;
    assert_eq!(result.diagnostics, vec![], "{}", result.render_human());

    let app = result.appspec.as_ref().unwrap();
    assert_eq!(app.name, "tasks");
    assert_eq!(app.title.as_deref(), Some("Task Tracker"));
    assert_eq!(app.modules, vec!["core", "app"]);

    let names: Vec<&str> = app.entities.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["User", "Task"]);
    assert_eq!(app.surfaces.len(), 2);
    assert_eq!(app.entity("Task").unwrap().field("owner").unwrap().ty.ref_target(), Some("User"));

    // a valid AppSpec stays valid
    assert!(validate(app).is_empty());
}

#[test]
fn test_misspelled_ref_is_reported_once() {
    let app_text = APP.replace("owner: ref User required", "owner: ref Accounts required");
    let core_text = CORE.replace("entity User \"User\"", "entity Account \"Account\"");
    let result = compile(&[("app.dsl", &app_text), ("core.dsl", &core_text)]);

    assert!(result.appspec.is_some());
    let unresolved: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.code.as_deref() == Some(codes::UNRESOLVED_REFERENCE))
        .collect();
    assert_eq!(unresolved.len(), 1, "{}", result.render_human());
    let diag = unresolved[0];
    assert!(diag.message.contains("'Accounts'"));
    assert_eq!(&*diag.file, "app.dsl");
    assert_eq!(diag.line, 8);
    assert_eq!(diag.fix.as_deref(), Some("did you mean 'Account'?"));

    // validation on its own reports it too
    let again = validate(result.appspec.as_ref().unwrap());
    assert_eq!(
        again
            .iter()
            .filter(|d| d.code.as_deref() == Some(codes::UNRESOLVED_REFERENCE))
            .count(),
        1
    );
}

#[test]
fn test_module_cycle_is_fatal() {
    let result = compile(&[
        ("a.dsl", "module app\nuse b\n"),
        ("b.dsl", "module b\nuse c\n"),
        ("c.dsl", "module c\nuse app\n"),
    ]);
    assert!(result.appspec.is_none());
    let cycles: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.code.as_deref() == Some(codes::CIRCULAR_DEPENDENCY))
        .collect();
    assert_eq!(cycles.len(), 1);
    assert!(cycles[0].message.ends_with("app -> b -> c -> app"));
    assert!(result.plans.is_empty());
}

#[test]
fn test_duplicate_across_modules_is_fatal() {
    let result = compile(&[
        ("app.dsl", "module app\nuse core\nentity User:\n  id: uuid pk\n"),
        ("core.dsl", CORE),
    ]);
    assert!(result.appspec.is_none());
    let diag = &result.diagnostics[0];
    assert_eq!(diag.code.as_deref(), Some(codes::DUPLICATE_DEFINITION));
    assert_eq!(&*diag.file, "app.dsl");
    assert_eq!(&*diag.related[0].file, "core.dsl");
}

#[test]
fn test_primary_key_errors_name_the_entity() {
    let result = compile(&[(
        "app.dsl",
        "module app\nentity Log:\n  message: text\nentity Pair:\n  a: int pk\n  b: int pk\n",
    )]);
    let messages: Vec<&str> = result.errors().map(|d| &*d.message).collect();
    assert!(messages.iter().any(|m| m.contains("'Log' has no primary key")));
    assert!(messages.iter().any(|m| m.contains("'Pair' has 2 primary keys")));
}

#[test]
fn test_syntax_errors_do_not_hide_later_declarations() {
    let result = compile(&[(
        "app.dsl",
        "module app\nentity Broken:\n  id uuid pk\nentity Fine:\n  id: uuid pk\n",
    )]);
    let app = result.appspec.unwrap();
    assert!(app.entity("Fine").is_some());
    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.code.as_deref() == Some(codes::SYNTAX_ERROR) && d.line == 3)
    );
}

#[test]
fn test_compilation_is_deterministic_and_order_independent() {
    let forward = &*TASKS;
    let backward = compile(&[("core.dsl", CORE), ("app.dsl", APP)]);
    let again = compile(&[("app.dsl", APP), ("core.dsl", CORE)]);

    assert_eq!(forward.appspec, backward.appspec);
    assert_eq!(forward.appspec, again.appspec);

    let broken = APP.replace("ref User", "ref Usr");
    let a = compile(&[("app.dsl", &broken), ("core.dsl", CORE)]);
    let b = compile(&[("core.dsl", CORE), ("app.dsl", &broken)]);
    assert!(!a.diagnostics.is_empty());
    assert_eq!(a.render_machine(), b.render_machine());
}

#[test]
fn test_parallel_and_sequential_agree() {
    let inputs = [SourceInput::new("app.dsl", APP.replace("ref User", "ref Usr")), SourceInput::new("core.dsl", CORE)];
    let sequential = compile_sources(
        &inputs,
        &CompileOptions::new("app")
            .with_parallel_frontend(false)
            .with_parallel_validation(false),
    );
    let parallel = compile_sources(
        &inputs,
        &CompileOptions::new("app")
            .with_parallel_frontend(true)
            .with_parallel_validation(true),
    );
    assert_eq!(sequential.appspec, parallel.appspec);
    assert_eq!(sequential.diagnostics, parallel.diagnostics);
}

#[test]
fn test_meta_passes_through_untouched() {
    let result = compile(&[(
        "app.dsl",
        "module app\nentity Task:\n  id: uuid pk\n  meta:\n    icon: \"check\"\n    order: 3\n",
    )]);
    let app = result.appspec.unwrap();
    let meta = &app.entity("Task").unwrap().meta;
    assert_eq!(meta.keys().map(|k| k.as_str()).collect::<Vec<_>>(), vec!["icon", "order"]);
}
