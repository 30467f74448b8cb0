//! Property-based tests over generated projects.
//!
//! Generates small but well-formed sources (entities with assorted field
//! types, list surfaces and workspaces) and checks that:
//!
//! - the AppSpec survives a JSON round trip unchanged;
//! - compiling twice, or with the files in another order, gives identical
//!   results;
//! - a project that compiles without diagnostics re-validates cleanly.
#![cfg(all(feature = "interchange", feature = "proptest"))]

use appspec::hir::validate;
use appspec::{AppSpec, CompileOptions, SourceInput, compile_sources};
use proptest::prelude::*;

// ============================================================================
// PROPTEST STRATEGIES
// ============================================================================

/// Field type spellings, all valid.
fn arb_field_type() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u32..500).prop_map(|n| format!("str({n})")),
        Just("text".to_string()),
        Just("int".to_string()),
        (1u8..=38).prop_flat_map(|p| (Just(p), 0..=p)).prop_map(|(p, s)| format!("decimal({p},{s})")),
        Just("bool".to_string()),
        Just("date".to_string()),
        Just("datetime".to_string()),
        Just("email".to_string()),
        Just("enum[low,medium,high]".to_string()),
    ]
}

fn arb_modifier() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(""), Just(" required"), Just(" optional"), Just(" unique")]
}

/// One entity with a pk and up to five more fields, named `E{index}`.
fn arb_entity(index: usize) -> impl Strategy<Value = String> {
    prop::collection::vec((arb_field_type(), arb_modifier()), 0..5).prop_map(move |fields| {
        let mut out = format!("entity E{index} \"Entity {index}\":\n  id: uuid pk\n");
        for (i, (ty, modifier)) in fields.iter().enumerate() {
            out.push_str(&format!("  f{i}: {ty}{modifier}\n"));
        }
        if index > 0 {
            out.push_str(&format!("  parent: ref E{}\n", index - 1));
        }
        out.push_str(&format!(
            "surface e{index}_list:\n  uses entity E{index}\n  mode: list\n"
        ));
        out
    })
}

/// A project split over a `core` module and the root `app` module.
fn arb_project() -> impl Strategy<Value = Vec<SourceInput>> {
    (1usize..5, 0usize..4).prop_flat_map(|(core_count, app_count)| {
        let core: Vec<_> = (0..core_count).map(arb_entity).collect();
        let app: Vec<_> = (core_count..core_count + app_count).map(arb_entity).collect();
        (core, app, 1u32..30).prop_map(move |(core, app, limit)| {
            let mut app_text = String::from("module app\nuse core\n");
            app_text.push_str(&app.concat());
            app_text.push_str(&format!(
                "workspace home:\n  recent:\n    source: e0_list\n    limit: {limit}\n  summary:\n    aggregate:\n      total: count(E0)\n"
            ));
            vec![
                SourceInput::new("app.dsl", app_text),
                SourceInput::new("core.dsl", format!("module core\n{}", core.concat())),
            ]
        })
    })
}

fn compile(sources: &[SourceInput]) -> appspec::Compilation {
    compile_sources(sources, &CompileOptions::new("app"))
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #[test]
    fn prop_generated_projects_compile_cleanly(sources in arb_project()) {
        let result = compile(&sources);
        prop_assert!(result.diagnostics.is_empty(), "{}", result.render_human());
        let app = result.appspec.unwrap();
        prop_assert!(validate(&app).is_empty());
    }

    #[test]
    fn prop_json_roundtrip(sources in arb_project()) {
        let app = compile(&sources).appspec.unwrap();
        let json = app.to_json().unwrap();
        let back = AppSpec::from_json(&json).unwrap();
        prop_assert_eq!(&app, &back);
        // and the text itself is stable
        prop_assert_eq!(json, back.to_json().unwrap());
    }

    #[test]
    fn prop_deterministic_and_order_independent(sources in arb_project()) {
        let first = compile(&sources);
        let again = compile(&sources);
        let reversed: Vec<_> = sources.iter().rev().cloned().collect();
        let swapped = compile(&reversed);

        prop_assert_eq!(&first.appspec, &again.appspec);
        prop_assert_eq!(&first.appspec, &swapped.appspec);
        prop_assert_eq!(first.render_machine(), swapped.render_machine());
        prop_assert_eq!(&first.plans, &swapped.plans);
    }
}
