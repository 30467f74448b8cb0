use std::fmt;

/// Handle for a file registered in a `FileSet`.
///
/// Ids are handed out in registration order and are only meaningful for the
/// set that issued them.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct FileId(u32);

impl FileId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_order_follows_registration() {
        let first = FileId::new(0);
        let second = FileId::new(1);
        assert!(first < second);
        assert_eq!(format!("{second:?}"), "file#1");
    }
}
