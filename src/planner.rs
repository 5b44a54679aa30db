//! Pair planning: discovery, filtering, collation and ordering.
//!
//! The planner produces the full, ordered list of (source, target) pairs for a
//! run before anything is relocated.

use crate::collate::{Collator, Roots, build_target};
use crate::descriptor::FileDescriptor;
use crate::filter::FileFilter;
use crate::fs_adapter::{FileSystem, FsResult};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// One planned relocation. Immutable once planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocationPair {
    pub source: FileDescriptor,
    pub target: FileDescriptor,
}

/// Inputs of [`plan`] besides the roots.
pub struct PlanOptions<'a> {
    pub recursive: bool,
    pub filter: &'a FileFilter,
    pub collator: &'a dyn Collator,
}

/// Sorts files deepest first, then by path.
///
/// Every file of a subtree is thus relocated before its parent directory is
/// checked for emptiness.
pub fn sort_deepest_first(files: &mut [FileDescriptor]) {
    files.sort_by(|a, b| {
        b.depth()
            .cmp(&a.depth())
            .then_with(|| a.path.as_os_str().cmp(b.path.as_os_str()))
    });
}

/// Discovers files under `source_root` and plans where each one goes.
///
/// # Errors
///
/// Fails when `source_root` cannot be listed, e.g. `FsError::NotADirectory`.
pub fn plan(
    fs: &dyn FileSystem,
    source_root: &Path,
    target_root: &Path,
    options: &PlanOptions<'_>,
) -> FsResult<Vec<RelocationPair>> {
    let discovered = fs.list_files(source_root, options.recursive)?;
    let discovered_count = discovered.len();

    let mut files: Vec<FileDescriptor> = discovered
        .into_iter()
        .filter(|f| options.filter.matches(f))
        .collect();
    sort_deepest_first(&mut files);

    let roots = Roots {
        source: source_root,
        target: target_root,
    };
    let pairs: Vec<RelocationPair> = files
        .into_iter()
        .map(|source| {
            let target = build_target(options.collator, &source, &roots);
            RelocationPair { source, target }
        })
        .collect();

    debug!(
        source = %source_root.display(),
        target = %target_root.display(),
        discovered = discovered_count,
        planned = pairs.len(),
        "planned relocation"
    );
    for pair in &pairs {
        debug!(src = %pair.source.path.display(), dest = %pair.target.path.display(), "pair");
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collate::{Collation, ExtensionCollation};
    use crate::filter::FilterSpec;
    use crate::fs_adapter::{FsError, LocalFileSystem};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        LocalFileSystem
            .create_file(&root.join(rel))
            .expect("Failed to create file");
    }

    #[test]
    fn test_sort_deepest_first_then_path() {
        let mut files = vec![
            FileDescriptor::from_path("/in/b.png"),
            FileDescriptor::from_path("/in/x/y/z.png"),
            FileDescriptor::from_path("/in/a.png"),
            FileDescriptor::from_path("/in/x/a.png"),
        ];
        sort_deepest_first(&mut files);
        let paths: Vec<_> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/in/x/y/z.png"),
                PathBuf::from("/in/x/a.png"),
                PathBuf::from("/in/a.png"),
                PathBuf::from("/in/b.png"),
            ]
        );
    }

    #[test]
    fn test_plan_orders_deeper_files_first() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("src");
        let target = temp_dir.path().join("out");
        touch(&source, "a.png");
        touch(&source, "b/c/d.png");

        let filter = FileFilter::allow_all(&source);
        let pairs = plan(
            &LocalFileSystem,
            &source,
            &target,
            &PlanOptions {
                recursive: true,
                filter: &filter,
                collator: &Collation::Default,
            },
        )
        .expect("plan should succeed");

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].source.path, source.join("b/c/d.png"));
        assert_eq!(pairs[0].target.path, target.join("b/c/d.png"));
        assert_eq!(pairs[1].source.path, source.join("a.png"));
    }

    #[test]
    fn test_plan_non_recursive_stays_at_top_level() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().to_path_buf();
        touch(&source, "a.png");
        touch(&source, "b/c.png");

        let filter = FileFilter::allow_all(&source);
        let pairs = plan(
            &LocalFileSystem,
            &source,
            Path::new("/out"),
            &PlanOptions {
                recursive: false,
                filter: &filter,
                collator: &Collation::Default,
            },
        )
        .unwrap();

        assert_eq!(pairs.len(), 1);
        assert!(pairs.iter().all(|p| p.source.parent_dir == source));
    }

    #[test]
    fn test_plan_by_extension_example() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("in");
        let target = temp_dir.path().join("out");
        touch(&source, "a.png");
        touch(&source, "b/c.png");
        touch(&source, "b/skip.txt");

        let filter = FileFilter::build(&FilterSpec::default().with_extensions(["png"]), &source).unwrap();
        let collation = Collation::ByExtension(ExtensionCollation::default());
        let pairs = plan(
            &LocalFileSystem,
            &source,
            &target,
            &PlanOptions {
                recursive: true,
                filter: &filter,
                collator: &collation,
            },
        )
        .unwrap();

        let mapped: Vec<_> = pairs
            .iter()
            .map(|p| (p.source.path.clone(), p.target.path.clone()))
            .collect();
        assert_eq!(
            mapped,
            vec![
                (source.join("b/c.png"), target.join("png/c.png")),
                (source.join("a.png"), target.join("png/a.png")),
            ]
        );
    }

    #[test]
    fn test_plan_rejects_file_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        touch(temp_dir.path(), "a.png");
        let root = temp_dir.path().join("a.png");
        let filter = FileFilter::allow_all(&root);

        let result = plan(
            &LocalFileSystem,
            &root,
            Path::new("/out"),
            &PlanOptions {
                recursive: true,
                filter: &filter,
                collator: &Collation::Default,
            },
        );
        assert!(matches!(result, Err(FsError::NotADirectory { .. })));
    }
}
