use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Problems finding or reading a project, as opposed to problems in its
/// sources (those are diagnostics).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("search path '{}' is not a directory", path.display())]
    NotADirectory { path: PathBuf },
    #[error("no '.{extension}' sources found")]
    NoSources { extension: String },
    #[error("cannot read '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[cfg(feature = "interchange")]
    #[error("invalid manifest '{}'", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
