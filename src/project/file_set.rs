//! File identity and contents for one compilation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::base::FileId;

/// Maps source paths to [`FileId`]s and holds their text.
///
/// Ids are handed out from worker threads while files are read, so the maps
/// sit behind one lock.
#[derive(Debug, Default)]
pub struct FileSet {
    inner: RwLock<FileSetInner>,
}

#[derive(Debug, Default)]
struct FileSetInner {
    path_to_id: IndexMap<PathBuf, FileId>,
    id_to_path: IndexMap<FileId, PathBuf>,
    contents: IndexMap<FileId, Arc<str>>,
    next_id: u32,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or assign the id of `path`. The same path always gets the same id.
    pub fn file_id(&self, path: &Path) -> FileId {
        {
            let inner = self.inner.read();
            if let Some(&id) = inner.path_to_id.get(path) {
                return id;
            }
        }

        let mut inner = self.inner.write();
        // another thread may have assigned it between the two locks
        if let Some(&id) = inner.path_to_id.get(path) {
            return id;
        }

        let id = FileId::new(inner.next_id);
        inner.next_id += 1;
        inner.path_to_id.insert(path.to_owned(), id);
        inner.id_to_path.insert(id, path.to_owned());
        id
    }

    pub fn set_contents(&self, file: FileId, contents: impl Into<Arc<str>>) {
        self.inner.write().contents.insert(file, contents.into());
    }

    /// Number of registered paths.
    pub(crate) fn len(&self) -> usize {
        self.inner.read().path_to_id.len()
    }

    /// Files that have contents, ordered by path.
    pub fn loaded(&self) -> Vec<(PathBuf, Arc<str>)> {
        let inner = self.inner.read();
        let mut out: Vec<_> = inner
            .contents
            .iter()
            .filter_map(|(id, text)| Some((inner.id_to_path.get(id)?.clone(), text.clone())))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_set_id_assignment() {
        let files = FileSet::new();

        let id1 = files.file_id(Path::new("/a.dsl"));
        let id2 = files.file_id(Path::new("/b.dsl"));
        let id3 = files.file_id(Path::new("/a.dsl"));

        assert_ne!(id1, id2);
        assert_eq!(id1, id3);
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_loaded_is_sorted_and_skips_unread() {
        let files = FileSet::new();
        let b = files.file_id(Path::new("/b.dsl"));
        let a = files.file_id(Path::new("/a.dsl"));
        files.file_id(Path::new("/c.dsl"));
        files.set_contents(b, "module b\n");
        files.set_contents(a, "module a\n");

        let loaded = files.loaded();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].0, Path::new("/a.dsl"));
        assert_eq!(&*loaded[1].1, "module b\n");
        assert_eq!(files.len(), 3);
    }
}
