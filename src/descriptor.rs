//! File descriptors and pure path decomposition.
//!
//! A `FileDescriptor` is produced fresh by every discovery call. The name parts
//! (`filename`, `name`, `extension`, `parent_dir`) are always derived from the
//! path alone through [`filename_info`], so source and target descriptors agree
//! on how a path splits.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::Metadata;
use std::path::{Component, Path, PathBuf};

/// The name parts of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameInfo {
    /// Last path segment including the extension.
    pub filename: String,
    /// Filename without its trailing extension.
    pub name: String,
    /// Lowercase extension without the leading dot, or empty.
    pub extension: String,
    /// Path of the immediate containing directory.
    pub parent_dir: PathBuf,
}

/// Splits a path into its name parts without touching the filesystem.
///
/// A filename made of a single leading dot and a word (".bashrc") has no
/// extension.
///
/// # Examples
///
/// ```
/// use fileclerk::descriptor::filename_info;
/// use std::path::Path;
///
/// let info = filename_info(Path::new("photos/Holiday.JPG"));
/// assert_eq!(info.filename, "Holiday.JPG");
/// assert_eq!(info.name, "Holiday");
/// assert_eq!(info.extension, "jpg");
/// assert_eq!(info.parent_dir, Path::new("photos"));
/// ```
pub fn filename_info(path: &Path) -> FilenameInfo {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.clone());
    let parent_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    FilenameInfo {
        filename,
        name,
        extension,
        parent_dir,
    }
}

/// Returns `path` relative to `root` using `/` separators.
///
/// Paths outside `root` are returned whole.
pub fn relative_path(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().replace('\\', "/"),
    }
}

/// Number of separator-delimited segments in a path.
pub fn path_depth(path: &Path) -> usize {
    path.components().count()
}

/// One filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub filename: String,
    pub name: String,
    pub extension: String,
    pub parent_dir: PathBuf,
    pub is_directory: bool,
    pub size: u64,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
}

impl FileDescriptor {
    /// Builds a descriptor from a path alone, with no stat information.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let info = filename_info(&path);
        Self {
            filename: info.filename,
            name: info.name,
            extension: info.extension,
            parent_dir: info.parent_dir,
            path,
            is_directory: false,
            size: 0,
            created: None,
            modified: None,
            accessed: None,
        }
    }

    /// Builds a descriptor from a path and the metadata returned by `lstat`.
    pub fn from_metadata(path: impl Into<PathBuf>, metadata: &Metadata) -> Self {
        let mut descriptor = Self::from_path(path);
        descriptor.is_directory = metadata.is_dir();
        descriptor.size = metadata.len();
        descriptor.created = metadata.created().ok().map(DateTime::<Utc>::from);
        descriptor.modified = metadata.modified().ok().map(DateTime::<Utc>::from);
        descriptor.accessed = metadata.accessed().ok().map(DateTime::<Utc>::from);
        descriptor
    }

    /// Returns a copy of this descriptor placed at `new_path`.
    ///
    /// Name parts are re-derived from `new_path`; stat fields are kept.
    pub fn relocated(&self, new_path: impl Into<PathBuf>) -> Self {
        let path = new_path.into();
        let info = filename_info(&path);
        Self {
            path,
            filename: info.filename,
            name: info.name,
            extension: info.extension,
            parent_dir: info.parent_dir,
            ..self.clone()
        }
    }

    /// Path depth used for deepest-first ordering.
    pub fn depth(&self) -> usize {
        path_depth(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_info_simple() {
        let info = filename_info(Path::new("/data/in/a.png"));
        assert_eq!(info.filename, "a.png");
        assert_eq!(info.name, "a");
        assert_eq!(info.extension, "png");
        assert_eq!(info.parent_dir, PathBuf::from("/data/in"));
    }

    #[test]
    fn test_filename_info_multiple_dots() {
        let info = filename_info(Path::new("in/a.rose.by.any.other.name"));
        assert_eq!(info.name, "a.rose.by.any.other");
        assert_eq!(info.extension, "name");
    }

    #[test]
    fn test_filename_info_no_extension() {
        let info = filename_info(Path::new("in/no_extension"));
        assert_eq!(info.filename, "no_extension");
        assert_eq!(info.name, "no_extension");
        assert_eq!(info.extension, "");
    }

    #[test]
    fn test_filename_info_extension_lowercased() {
        let info = filename_info(Path::new("in/07.PNG"));
        assert_eq!(info.name, "07");
        assert_eq!(info.extension, "png");
        assert_eq!(info.filename, "07.PNG");
    }

    #[test]
    fn test_filename_info_dotfile() {
        let info = filename_info(Path::new("home/.bashrc"));
        assert_eq!(info.name, ".bashrc");
        assert_eq!(info.extension, "");
    }

    #[test]
    fn test_relative_path_strips_root() {
        let rel = relative_path(Path::new("/src/root/a/b/c.txt"), Path::new("/src/root"));
        assert_eq!(rel, "a/b/c.txt");

        // Trailing separator on the root makes no difference
        let rel = relative_path(Path::new("/src/root/c.txt"), Path::new("/src/root/"));
        assert_eq!(rel, "c.txt");
    }

    #[test]
    fn test_relative_path_outside_root() {
        let rel = relative_path(Path::new("/elsewhere/c.txt"), Path::new("/src/root"));
        assert_eq!(rel, "/elsewhere/c.txt");
    }

    #[test]
    fn test_relocated_keeps_stat_fields() {
        let mut source = FileDescriptor::from_path("/in/b/c.PNG");
        source.size = 42;
        let target = source.relocated("/out/png/c.PNG");

        assert_eq!(target.size, 42);
        assert_eq!(target.parent_dir, PathBuf::from("/out/png"));
        assert_eq!(target.extension, "png");
        assert_eq!(target.name, "c");
    }

    #[test]
    fn test_depth() {
        assert!(
            FileDescriptor::from_path("/in/a/b/c.png").depth()
                > FileDescriptor::from_path("/in/a.png").depth()
        );
    }
}
