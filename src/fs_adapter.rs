//! Filesystem access layer.
//!
//! The planner and the relocation engine only talk to the filesystem through
//! the [`FileSystem`] trait. [`LocalFileSystem`] is the real implementation;
//! tests can wrap it to inject failures.

use crate::descriptor::FileDescriptor;
use rayon::prelude::*;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors raised by filesystem primitives.
#[derive(Debug, Error)]
pub enum FsError {
    /// Discovery was pointed at something that is not a directory.
    #[error("{} is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    /// The destination exists and overwriting was not requested.
    #[error("EEXIST: file already exists, {}", path.display())]
    AlreadyExists { path: PathBuf },

    /// Source and destination resolve to the same file.
    #[error("source and destination must not be the same, {}", path.display())]
    SameFile { path: PathBuf },

    /// Overwriting would replace a directory with a file.
    #[error("EISDIR: refusing to overwrite directory, {}", path.display())]
    TargetIsDirectory { path: PathBuf },

    /// Any other I/O failure.
    #[error("failed to {operation} {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    fn io<'a>(operation: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> FsError + 'a {
        move |source| FsError::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for filesystem primitives.
pub type FsResult<T> = Result<T, FsError>;

/// Capability interface over the filesystem.
pub trait FileSystem {
    /// Stats a path without following a final symlink.
    ///
    /// Returns `None` when the path does not exist or vanished before it could
    /// be read.
    fn stat(&self, path: &Path) -> Option<FileDescriptor>;

    /// Lists files and directories under `path`, descending into
    /// subdirectories when `recursive` is set.
    ///
    /// Fails with [`FsError::NotADirectory`] when `path` is not a directory.
    fn list_files_and_directories(&self, path: &Path, recursive: bool)
    -> FsResult<Vec<FileDescriptor>>;

    fn exists(&self, path: &Path) -> bool;

    /// True when `a` and `b` name the same existing file.
    fn is_same_file(&self, a: &Path, b: &Path) -> bool {
        a == b && self.exists(a)
    }

    /// Copies `src` to `dst`, creating missing parent directories.
    ///
    /// Refuses with [`FsError::SameFile`] when both name the same file and
    /// with [`FsError::TargetIsDirectory`] when `dst` is a directory.
    fn copy(&self, src: &Path, dst: &Path, overwrite: bool) -> FsResult<()>;

    /// Moves `src` to `dst`, creating missing parent directories.
    fn move_path(&self, src: &Path, dst: &Path, overwrite: bool) -> FsResult<()>;

    /// Creates an empty file (and its parents) unless it already exists.
    fn create_file(&self, path: &Path) -> FsResult<()>;

    fn create_directory(&self, path: &Path) -> FsResult<()>;

    /// Deletes a directory and everything below it. Missing paths are not an error.
    fn delete_directory(&self, path: &Path) -> FsResult<()>;

    fn list_files(&self, path: &Path, recursive: bool) -> FsResult<Vec<FileDescriptor>> {
        Ok(self
            .list_files_and_directories(path, recursive)?
            .into_iter()
            .filter(|d| !d.is_directory)
            .collect())
    }

    fn list_directories(&self, path: &Path, recursive: bool) -> FsResult<Vec<FileDescriptor>> {
        Ok(self
            .list_files_and_directories(path, recursive)?
            .into_iter()
            .filter(|d| d.is_directory)
            .collect())
    }

    /// True when no file exists anywhere below `dir`. Empty subdirectories
    /// do not count as content.
    fn is_empty_recursive(&self, dir: &Path) -> FsResult<bool> {
        Ok(self.list_files(dir, true)?.is_empty())
    }
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    fn list_entries(
        &self,
        path: &Path,
        recursive: bool,
        check_root: bool,
    ) -> FsResult<Vec<FileDescriptor>> {
        if check_root {
            let metadata = fs::symlink_metadata(path).map_err(FsError::io("stat", path))?;
            if !metadata.is_dir() {
                return Err(FsError::NotADirectory {
                    path: path.to_path_buf(),
                });
            }
        }

        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            // A subdirectory removed while we were walking is simply gone
            Err(e) if !check_root && e.kind() == io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(FsError::io("read directory", path)(e)),
        };

        let mut found: Vec<FileDescriptor> = entries
            .flatten()
            .filter_map(|entry| self.stat(&entry.path()))
            .collect();

        if !recursive {
            return Ok(found);
        }

        // Siblings are independent, so their subtrees can be read in parallel
        let children = found
            .par_iter()
            .filter(|d| d.is_directory)
            .map(|dir| self.list_entries(&dir.path, true, false))
            .collect::<FsResult<Vec<_>>>()?;

        found.extend(children.into_iter().flatten());
        Ok(found)
    }

    /// Checks `dst` before anything is written and removes an existing file
    /// there when `overwrite` is set.
    fn prepare_destination(&self, src: &Path, dst: &Path, overwrite: bool) -> FsResult<()> {
        if let Ok(metadata) = fs::symlink_metadata(dst) {
            if self.is_same_file(src, dst) {
                return Err(FsError::SameFile {
                    path: dst.to_path_buf(),
                });
            }
            if !overwrite {
                return Err(FsError::AlreadyExists {
                    path: dst.to_path_buf(),
                });
            }
            if metadata.is_dir() {
                return Err(FsError::TargetIsDirectory {
                    path: dst.to_path_buf(),
                });
            }
            fs::remove_file(dst).map_err(FsError::io("remove existing file", dst))?;
        }

        if let Some(parent) = dst.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(FsError::io("create directory", parent))?;
        }
        Ok(())
    }
}

impl FileSystem for LocalFileSystem {
    fn stat(&self, path: &Path) -> Option<FileDescriptor> {
        match fs::symlink_metadata(path) {
            Ok(metadata) => Some(FileDescriptor::from_metadata(path, &metadata)),
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!(path = %path.display(), error = %e, "stat failed, treating entry as absent");
                }
                None
            }
        }
    }

    fn list_files_and_directories(
        &self,
        path: &Path,
        recursive: bool,
    ) -> FsResult<Vec<FileDescriptor>> {
        let entries = self.list_entries(path, recursive, true)?;
        trace!(path = %path.display(), recursive, count = entries.len(), "listed entries");
        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_same_file(&self, a: &Path, b: &Path) -> bool {
        match (fs::canonicalize(a), fs::canonicalize(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    fn copy(&self, src: &Path, dst: &Path, overwrite: bool) -> FsResult<()> {
        self.prepare_destination(src, dst, overwrite)?;
        fs::copy(src, dst).map_err(FsError::io("copy", src))?;
        Ok(())
    }

    fn move_path(&self, src: &Path, dst: &Path, overwrite: bool) -> FsResult<()> {
        if fs::symlink_metadata(src).is_err() {
            return Err(FsError::Io {
                operation: "move",
                path: src.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "source does not exist"),
            });
        }
        self.prepare_destination(src, dst, overwrite)?;

        match fs::rename(src, dst) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                debug!(src = %src.display(), dst = %dst.display(), "rename crosses devices, copying instead");
                fs::copy(src, dst).map_err(FsError::io("copy", src))?;
                fs::remove_file(src).map_err(FsError::io("remove original file", src))
            }
            Err(e) => Err(FsError::io("move", src)(e)),
        }
    }

    fn create_file(&self, path: &Path) -> FsResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(FsError::io("create directory", parent))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(FsError::io("create file", path))?;
        Ok(())
    }

    fn create_directory(&self, path: &Path) -> FsResult<()> {
        fs::create_dir_all(path).map_err(FsError::io("create directory", path))
    }

    fn delete_directory(&self, path: &Path) -> FsResult<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FsError::io("delete directory", path)(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn populate(root: &Path) {
        let fs = LocalFileSystem;
        fs.create_file(&root.join("01.mp4")).unwrap();
        fs.create_file(&root.join("02.png")).unwrap();
        fs.create_file(&root.join("03/04.png")).unwrap();
        fs.create_file(&root.join("05/06/07.png")).unwrap();
    }

    #[test]
    fn test_stat_file_and_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        populate(temp_dir.path());
        let fs = LocalFileSystem;

        let dir = fs.stat(&temp_dir.path().join("03")).expect("dir should stat");
        assert!(dir.is_directory);

        let file = fs.stat(&temp_dir.path().join("02.png")).expect("file should stat");
        assert!(!file.is_directory);
        assert_eq!(file.extension, "png");
        assert!(file.modified.is_some());
    }

    #[test]
    fn test_stat_missing_path_is_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        assert!(LocalFileSystem.stat(&temp_dir.path().join("nope")).is_none());
    }

    #[test]
    fn test_list_non_recursive_and_recursive() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        populate(temp_dir.path());
        let fs = LocalFileSystem;

        let shallow = fs
            .list_files_and_directories(temp_dir.path(), false)
            .unwrap();
        assert_eq!(shallow.len(), 4);

        let deep = fs.list_files_and_directories(temp_dir.path(), true).unwrap();
        assert_eq!(deep.len(), 7);

        assert_eq!(fs.list_files(temp_dir.path(), true).unwrap().len(), 4);
        assert_eq!(fs.list_directories(temp_dir.path(), true).unwrap().len(), 3);
    }

    #[test]
    fn test_list_on_file_is_not_a_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        populate(temp_dir.path());
        let file = temp_dir.path().join("01.mp4");

        let err = LocalFileSystem
            .list_files_and_directories(&file, false)
            .unwrap_err();
        assert!(matches!(err, FsError::NotADirectory { .. }));
        assert_eq!(err.to_string(), format!("{} is not a directory", file.display()));
    }

    #[test]
    fn test_move_refuses_existing_target_without_overwrite() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let src = temp_dir.path().join("a.txt");
        let dst = temp_dir.path().join("out/a.txt");
        fs::write(&src, "new").unwrap();
        fs::create_dir_all(dst.parent().unwrap()).unwrap();
        fs::write(&dst, "old").unwrap();

        let err = LocalFileSystem.move_path(&src, &dst, false).unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists { .. }));
        assert!(src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "old");

        LocalFileSystem.move_path(&src, &dst, true).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "new");
    }

    #[test]
    fn test_same_file_is_left_untouched_even_with_overwrite() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("png/a.png");
        let alias = temp_dir.path().join("png/../png/a.png");
        let fs = LocalFileSystem;
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "keep").unwrap();

        assert!(fs.is_same_file(&file, &alias));
        assert!(!fs.is_same_file(&file, &temp_dir.path().join("png/b.png")));

        let err = fs.move_path(&file, &alias, true).unwrap_err();
        assert!(matches!(err, FsError::SameFile { .. }));
        let err = fs.copy(&file, &file, true).unwrap_err();
        assert!(matches!(err, FsError::SameFile { .. }));
        assert_eq!(fs::read_to_string(&file).unwrap(), "keep");
    }

    #[test]
    fn test_overwrite_refuses_directory_target() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let src = temp_dir.path().join("a.txt");
        let dst = temp_dir.path().join("out/a.txt");
        fs::write(&src, "new").unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("inner.txt"), "inner").unwrap();

        let err = LocalFileSystem.move_path(&src, &dst, true).unwrap_err();
        assert!(matches!(err, FsError::TargetIsDirectory { .. }));
        let err = LocalFileSystem.copy(&src, &dst, true).unwrap_err();
        assert!(matches!(err, FsError::TargetIsDirectory { .. }));
        assert!(src.exists());
        assert_eq!(fs::read_to_string(dst.join("inner.txt")).unwrap(), "inner");
    }

    #[test]
    fn test_copy_creates_parent_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let src = temp_dir.path().join("a.txt");
        let dst = temp_dir.path().join("deep/er/a.txt");
        fs::write(&src, "content").unwrap();

        LocalFileSystem.copy(&src, &dst, false).unwrap();
        assert!(src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "content");

        let err = LocalFileSystem.copy(&src, &dst, false).unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists { .. }));
    }

    #[test]
    fn test_is_empty_recursive_ignores_empty_subdirectories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let fs = LocalFileSystem;
        let dir = temp_dir.path().join("a");
        fs.create_directory(&dir.join("b/c")).unwrap();
        assert!(fs.is_empty_recursive(&dir).unwrap());

        fs.create_file(&dir.join("b/file")).unwrap();
        assert!(!fs.is_empty_recursive(&dir).unwrap());

        fs.delete_directory(&dir).unwrap();
        assert!(!fs.exists(&dir));
        // Deleting again is a no-op
        fs.delete_directory(&dir).unwrap();
    }
}
