use std::path::PathBuf;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::hir::DEFAULT_SUGGESTION_THRESHOLD;

/// Default source file extension, without the dot.
pub const DEFAULT_EXTENSION: &str = "dsl";

/// Settings for one compilation.
#[derive(Clone, Debug, PartialEq)]
pub struct CompileOptions {
    /// Module the application is rooted at.
    pub root: SmolStr,
    /// Directories searched recursively for sources.
    pub search_paths: Vec<PathBuf>,
    pub extension: String,
    /// Lex, parse and lower files on the rayon pool.
    pub parallel_frontend: bool,
    /// Run validation checks on the rayon pool.
    pub parallel_validation: bool,
    /// Minimum Jaro-Winkler similarity for `did you mean` fixes.
    pub suggestion_threshold: f64,
    /// Workspace name to archetype name. Wins over `engine_hint` in source.
    pub engine_hints: IndexMap<SmolStr, SmolStr>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            root: SmolStr::new_static("app"),
            search_paths: Vec::new(),
            extension: DEFAULT_EXTENSION.to_string(),
            parallel_frontend: true,
            parallel_validation: false,
            suggestion_threshold: DEFAULT_SUGGESTION_THRESHOLD,
            engine_hints: IndexMap::new(),
        }
    }
}

impl CompileOptions {
    pub fn new(root: impl Into<SmolStr>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_parallel_frontend(mut self, parallel: bool) -> Self {
        self.parallel_frontend = parallel;
        self
    }

    pub fn with_parallel_validation(mut self, parallel: bool) -> Self {
        self.parallel_validation = parallel;
        self
    }

    pub fn with_suggestion_threshold(mut self, threshold: f64) -> Self {
        self.suggestion_threshold = threshold;
        self
    }

    pub fn with_engine_hint(
        mut self,
        workspace: impl Into<SmolStr>,
        archetype: impl Into<SmolStr>,
    ) -> Self {
        self.engine_hints.insert(workspace.into(), archetype.into());
        self
    }
}
