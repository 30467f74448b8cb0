//! Loading projects from disk.

use std::fs;
use std::path::Path;

use appspec::{CompileOptions, LoadError, compile_project};
use tempfile::TempDir;

fn write(dir: &Path, relative: &str, text: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/app.dsl", "module app\nuse core\nentity Task:\n  id: uuid pk\n  owner: ref User\n");
    write(dir.path(), "src/core/user.dsl", "module core\nentity User:\n  id: uuid pk\n");
    write(dir.path(), "src/notes.txt", "not a source file");
    dir
}

#[test]
fn test_compile_project_walks_nested_directories() {
    let dir = project();
    let options = CompileOptions::new("app").with_search_path(dir.path().join("src"));
    let result = compile_project(&options).unwrap();
    assert!(result.diagnostics.is_empty(), "{}", result.render_human());
    assert_eq!(result.appspec.unwrap().modules, vec!["core", "app"]);
}

#[test]
fn test_missing_search_path() {
    let dir = TempDir::new().unwrap();
    let options = CompileOptions::new("app").with_search_path(dir.path().join("nope"));
    assert!(matches!(compile_project(&options), Err(LoadError::NotADirectory { .. })));
}

#[test]
fn test_no_sources() {
    let dir = project();
    let options = CompileOptions::new("app")
        .with_search_path(dir.path())
        .with_extension("spec");
    match compile_project(&options) {
        Err(err @ LoadError::NoSources { .. }) => {
            assert_eq!(err.to_string(), "no '.spec' sources found");
        }
        other => panic!("expected NoSources, got {other:?}"),
    }
}

#[test]
fn test_lex_error_in_one_file_keeps_the_rest() {
    let dir = project();
    write(dir.path(), "src/broken.dsl", "module extra\nentity X:\n\tid: uuid pk\n");
    let options = CompileOptions::new("app")
        .with_search_path(dir.path().join("src"))
        .with_parallel_frontend(false);
    let result = compile_project(&options).unwrap();
    let app = result.appspec.as_ref().unwrap();
    assert!(app.entity("Task").is_some());

    let errors: Vec<_> = result.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code.as_deref(), Some(appspec::codes::LEX_ERROR));
    assert!(errors[0].file.ends_with("broken.dsl"));
}

#[cfg(feature = "interchange")]
mod manifest {
    use super::*;
    use appspec::compile_manifest;

    #[test]
    fn test_manifest_paths_are_relative_to_its_directory() {
        let dir = project();
        let broken = "module app\nuse core\nentity Task:\n  id: uuid pk\n  owner: ref Usr\n";
        write(dir.path(), "src/app.dsl", broken);
        write(
            dir.path(),
            "appspec.yaml",
            "root: app\nsearch_paths: [src]\nparallel: false\n",
        );

        let result = compile_manifest(&dir.path().join("appspec.yaml")).unwrap();
        assert_eq!(result.diagnostics.len(), 1);
        let diag = &result.diagnostics[0];
        assert_eq!(&*diag.file, "src/app.dsl");
        assert_eq!(diag.fix.as_deref(), Some("did you mean 'User'?"));
    }

    #[test]
    fn test_manifest_engine_hints_apply() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "app.dsl",
            "module app\nentity Ticket:\n  id: uuid pk\nworkspace desk:\n  all:\n    source: Ticket\n",
        );
        write(
            dir.path(),
            "appspec.yaml",
            "root: app\nengine_hints:\n  desk: command_center\n",
        );
        let result = compile_manifest(&dir.path().join("appspec.yaml")).unwrap();
        assert_eq!(
            result.plan("desk").unwrap().archetype,
            appspec::Archetype::CommandCenter
        );
    }

    #[test]
    fn test_invalid_manifest() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "appspec.yaml", "root: app\ncolour: blue\n");
        let err = compile_manifest(&dir.path().join("appspec.yaml")).unwrap_err();
        assert!(matches!(err, LoadError::Manifest { .. }));
    }
}

#[test]
fn test_non_utf8_source_fails_the_load() {
    let dir = project();
    let bad = dir.path().join("src/latin1.dsl");
    fs::write(&bad, b"module extra\nentity Caf\xE9:\n  id: uuid pk\n").unwrap();
    for parallel in [false, true] {
        let options = CompileOptions::new("app")
            .with_search_path(dir.path().join("src"))
            .with_parallel_frontend(parallel);
        match compile_project(&options) {
            Err(LoadError::Io { path, source }) => {
                assert_eq!(path, bad);
                assert_eq!(source.kind(), std::io::ErrorKind::InvalidData);
            }
            other => panic!("expected Io, got {other:?}"),
        }
    }
}
