//! Project driver: options, source discovery and the compile entry points.
//!
//! ```text
//! appspec.yaml ─▶ CompileOptions ─▶ discover ─▶ FileSet ─▶ front end (rayon)
//!                                              ─▶ link ─▶ validate ─▶ plan
//! ```

mod compile;
mod error;
mod file_set;
mod loader;
#[cfg(feature = "interchange")]
mod manifest;
mod options;

#[cfg(feature = "interchange")]
pub use compile::compile_manifest;
pub use compile::{Compilation, compile_project, compile_sources};
pub use error::LoadError;
pub use file_set::FileSet;
pub use loader::{
    FrontEnd, SourceInput, discover, display_path, front_end, front_end_all, lex_diagnostic,
    read_sources, syntax_diagnostic,
};
#[cfg(feature = "interchange")]
pub use manifest::{MANIFEST_FILE, Manifest};
pub use options::{CompileOptions, DEFAULT_EXTENSION};
