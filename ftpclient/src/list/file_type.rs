use std::path::{Path, PathBuf};

/// Describes the kind of a listing entry.
/// A `Symlink` carries the path it points to when the server reports it.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum FileType {
    /// Directory type
    Directory,
    /// Regular file type
    File,
    /// Symlink type with the pointed path, if known
    Symlink(Option<PathBuf>),
}

impl FileType {
    /// Returns whether the entry is a directory
    pub fn is_directory(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    /// Returns whether the entry is a regular file
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns whether the entry is a symlink
    pub fn is_symlink(&self) -> bool {
        matches!(self, FileType::Symlink(_))
    }

    /// Path the symlink points to, when known
    pub fn symlink(&self) -> Option<&Path> {
        match self {
            FileType::Symlink(Some(target)) => Some(target.as_path()),
            _ => None,
        }
    }
}
