//! `appspec.yaml` project manifest.
//!
//! ```yaml
//! root: shop
//! search_paths: [src, shared]
//! engine_hints:
//!   dashboard: focus_metric
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::error::LoadError;
use super::options::CompileOptions;

/// Conventional manifest file name.
pub const MANIFEST_FILE: &str = "appspec.yaml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub root: SmolStr,
    /// Relative to the manifest's directory. Empty means the directory itself.
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub parallel: Option<bool>,
    #[serde(default)]
    pub suggestion_threshold: Option<f64>,
    #[serde(default)]
    pub engine_hints: IndexMap<SmolStr, SmolStr>,
}

impl Manifest {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| LoadError::Manifest {
            path: path.to_owned(),
            source,
        })
    }

    /// Options for compiling the project described by this manifest, with
    /// search paths resolved against `base_dir`.
    pub fn into_options(self, base_dir: &Path) -> CompileOptions {
        let mut options = CompileOptions::new(self.root);
        if self.search_paths.is_empty() {
            options = options.with_search_path(base_dir);
        }
        for path in self.search_paths {
            options = options.with_search_path(base_dir.join(path));
        }
        if let Some(extension) = self.extension {
            options = options.with_extension(extension);
        }
        if let Some(parallel) = self.parallel {
            options = options
                .with_parallel_frontend(parallel)
                .with_parallel_validation(parallel);
        }
        if let Some(threshold) = self.suggestion_threshold {
            options = options.with_suggestion_threshold(threshold);
        }
        options.engine_hints = self.engine_hints;
        options
    }
}
