//! Source discovery and the per-file front end.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::error::LoadError;
use super::file_set::FileSet;
use crate::hir::{Diagnostic, codes};
use crate::ir::{ModuleFragment, lower};
use crate::syntax::{LexError, SyntaxError, parse_source};

/// One source file handed to the compiler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceInput {
    /// Path as shown in diagnostics.
    pub path: Arc<str>,
    pub text: Arc<str>,
}

impl SourceInput {
    pub fn new(path: impl Into<Arc<str>>, text: impl Into<Arc<str>>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// Fragment and diagnostics of one file.
#[derive(Clone, Debug)]
pub struct FrontEnd {
    /// `None` when the file could not be tokenized.
    pub fragment: Option<ModuleFragment>,
    pub diagnostics: Vec<Diagnostic>,
}

/// All files under `search_paths` with the given extension, sorted.
///
/// An entry that cannot be read while walking fails the whole load.
pub fn discover(search_paths: &[PathBuf], extension: &str) -> Result<Vec<PathBuf>, LoadError> {
    let mut paths = Vec::new();
    for root in search_paths {
        if !root.is_dir() {
            return Err(LoadError::NotADirectory { path: root.clone() });
        }
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|err| LoadError::Io {
                path: err.path().unwrap_or(root.as_path()).to_owned(),
                source: err.into(),
            })?;
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().is_some_and(|e| e == extension) {
                paths.push(path.to_owned());
            }
        }
    }
    paths.sort();
    paths.dedup();
    debug!(count = paths.len(), "discovered source files");
    Ok(paths)
}

/// Read `paths` into `files`, in parallel when asked. A file that cannot be
/// read as UTF-8 text fails the load. Paths are shown relative to `base`
/// when given.
pub fn read_sources(
    files: &FileSet,
    paths: &[PathBuf],
    base: Option<&Path>,
    parallel: bool,
) -> Result<Vec<SourceInput>, LoadError> {
    let read = |path: &PathBuf| read_one(files, path);
    if parallel {
        paths.par_iter().try_for_each(read)?;
    } else {
        paths.iter().try_for_each(read)?;
    }
    debug!(count = files.len(), "read source files");
    Ok(files
        .loaded()
        .into_iter()
        .map(|(path, text)| {
            let shown = match base {
                Some(base) => display_path(&path, base),
                None => path.display().to_string(),
            };
            SourceInput::new(shown, text)
        })
        .collect())
}

fn read_one(files: &FileSet, path: &PathBuf) -> Result<(), LoadError> {
    let text = fs::read_to_string(path).map_err(|source| {
        warn!(path = %path.display(), error = %source, "cannot read source file");
        LoadError::Io {
            path: path.clone(),
            source,
        }
    })?;
    let id = files.file_id(path);
    files.set_contents(id, text);
    Ok(())
}

pub fn lex_diagnostic(path: &Arc<str>, err: &LexError) -> Diagnostic {
    Diagnostic::error(path.clone(), err.pos(), err.to_string()).with_code(codes::LEX_ERROR)
}

pub fn syntax_diagnostic(path: &Arc<str>, err: &SyntaxError) -> Diagnostic {
    let diag = Diagnostic::error(path.clone(), err.pos, err.message.as_str())
        .with_code(codes::SYNTAX_ERROR);
    match &err.fix {
        Some(fix) => diag.with_fix(fix.as_str()),
        None => diag,
    }
}

/// Lex, parse and lower one file.
pub fn front_end(source: &SourceInput) -> FrontEnd {
    let parse = match parse_source(&source.text) {
        Ok(parse) => parse,
        Err(err) => {
            return FrontEnd {
                fragment: None,
                diagnostics: vec![lex_diagnostic(&source.path, &err)],
            };
        }
    };

    let mut diagnostics: Vec<Diagnostic> = parse
        .errors
        .iter()
        .map(|err| syntax_diagnostic(&source.path, err))
        .collect();
    let (fragment, lowered) = lower(&parse.file, &source.path);
    diagnostics.extend(lowered);

    debug!(
        path = %source.path,
        module = %fragment.module,
        declarations = fragment.decl_count(),
        errors = diagnostics.len(),
        "parsed file"
    );
    FrontEnd {
        fragment: Some(fragment),
        diagnostics,
    }
}

/// [`front_end`] for every source, results in input order.
pub fn front_end_all(sources: &[SourceInput], parallel: bool) -> Vec<FrontEnd> {
    if parallel {
        sources.par_iter().map(front_end).collect()
    } else {
        sources.iter().map(front_end).collect()
    }
}

/// `path` relative to `base` when it lies below it.
pub fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_error_is_a_diagnostic() {
        let out = front_end(&SourceInput::new("bad.dsl", "module app\nentity T:\n\tid: uuid pk\n"));
        assert!(out.fragment.is_none());
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].code.as_deref(), Some(codes::LEX_ERROR));
        assert_eq!(out.diagnostics[0].line, 3);
    }

    #[test]
    fn test_syntax_errors_keep_fragment() {
        let out = front_end(&SourceInput::new(
            "part.dsl",
            "module app\nentity Broken:\n  id uuid\nentity Ok:\n  id: uuid pk\n",
        ));
        let fragment = out.fragment.unwrap();
        assert!(fragment.entities.iter().any(|e| e.name == "Ok"));
        assert!(
            out.diagnostics
                .iter()
                .any(|d| d.code.as_deref() == Some(codes::SYNTAX_ERROR))
        );
    }

    #[test]
    fn test_display_path() {
        assert_eq!(display_path(Path::new("/p/src/a.dsl"), Path::new("/p")), "src/a.dsl");
        assert_eq!(display_path(Path::new("/q/a.dsl"), Path::new("/p")), "/q/a.dsl");
    }
}
