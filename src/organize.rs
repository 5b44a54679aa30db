//! One-call entry points: plan and execute a whole run.

use crate::collate::{AlphabeticalCollation, Collation, DateCollation, ExtensionCollation};
use crate::engine::{RelocationEngine, RelocationOptions, RelocationResult};
use crate::filter::{FileFilter, FilterError, FilterSpec};
use crate::fs_adapter::{FileSystem, FsError, LocalFileSystem};
use crate::planner::{PlanOptions, RelocationPair, plan};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors that abort a run before any file is relocated.
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Everything a run needs besides the two roots.
#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    /// Descend into subdirectories of the source root.
    pub recursive: bool,
    pub filters: FilterSpec,
    pub relocation: RelocationOptions,
    pub collation: Collation,
}

impl Default for OrganizeOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            filters: FilterSpec::default(),
            relocation: RelocationOptions::default(),
            collation: Collation::Default,
        }
    }
}

/// Organizes `source` into `target` on the local filesystem.
///
/// # Errors
///
/// Fails before relocating anything when `source` is not a listable directory
/// or a filter pattern does not compile. Per-file failures are reported in the
/// returned results instead.
///
/// # Examples
///
/// ```no_run
/// use fileclerk::organize::{OrganizeOptions, organize};
/// use std::path::Path;
///
/// let results = organize(Path::new("inbox"), Path::new("archive"), &OrganizeOptions::default())?;
/// println!("{} files relocated", results.iter().filter(|r| r.success).count());
/// # Ok::<(), fileclerk::organize::OrganizeError>(())
/// ```
pub fn organize(
    source: &Path,
    target: &Path,
    options: &OrganizeOptions,
) -> Result<Vec<RelocationResult>, OrganizeError> {
    organize_with(&LocalFileSystem, source, target, options, |_| {})
}

/// Organizes through a caller-supplied [`FileSystem`], reporting each result to
/// `observer` as it completes.
pub fn organize_with<F>(
    fs: &dyn FileSystem,
    source: &Path,
    target: &Path,
    options: &OrganizeOptions,
    observer: F,
) -> Result<Vec<RelocationResult>, OrganizeError>
where
    F: FnMut(&RelocationResult),
{
    let pairs = plan_organize(fs, source, target, options)?;

    info!(
        source = %source.display(),
        target = %target.display(),
        files = pairs.len(),
        dry_run = options.relocation.dry_run,
        "organizing"
    );

    let engine = RelocationEngine::new(fs, source, options.relocation);
    Ok(engine.execute_with(&pairs, observer))
}

/// Plans a run without executing it.
pub fn plan_organize(
    fs: &dyn FileSystem,
    source: &Path,
    target: &Path,
    options: &OrganizeOptions,
) -> Result<Vec<RelocationPair>, OrganizeError> {
    let filter = FileFilter::build(&options.filters, source)?;
    let pairs = plan(
        fs,
        source,
        target,
        &PlanOptions {
            recursive: options.recursive,
            filter: &filter,
            collator: &options.collation,
        },
    )?;
    Ok(pairs)
}

/// Organizes into one directory per formatted timestamp.
pub fn organize_by_date(
    source: &Path,
    target: &Path,
    options: OrganizeOptions,
    collation: DateCollation,
) -> Result<Vec<RelocationResult>, OrganizeError> {
    with_collation(source, target, options, Collation::ByDate(collation))
}

/// Organizes into one directory per lowercase extension.
pub fn organize_by_extension(
    source: &Path,
    target: &Path,
    options: OrganizeOptions,
    collation: ExtensionCollation,
) -> Result<Vec<RelocationResult>, OrganizeError> {
    with_collation(source, target, options, Collation::ByExtension(collation))
}

/// Organizes into one directory per first filename character.
pub fn organize_by_alphabetical(
    source: &Path,
    target: &Path,
    options: OrganizeOptions,
    collation: AlphabeticalCollation,
) -> Result<Vec<RelocationResult>, OrganizeError> {
    with_collation(source, target, options, Collation::ByFirstChar(collation))
}

fn with_collation(
    source: &Path,
    target: &Path,
    options: OrganizeOptions,
    collation: Collation,
) -> Result<Vec<RelocationResult>, OrganizeError> {
    let options = OrganizeOptions {
        collation,
        ..options
    };
    organize(source, target, &options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let options = OrganizeOptions::default();
        assert!(options.recursive);
        assert!(options.relocation.clean_dirs);
        assert!(options.relocation.rename);
        assert!(!options.relocation.copy);
        assert!(!options.relocation.dry_run);
        assert!(!options.relocation.overwrite);
        assert!(matches!(options.collation, Collation::Default));
    }

    #[test]
    fn test_missing_source_is_hard_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = organize(
            &temp_dir.path().join("missing"),
            &temp_dir.path().join("out"),
            &OrganizeOptions::default(),
        );
        assert!(matches!(result, Err(OrganizeError::Fs(_))));
    }

    #[test]
    fn test_invalid_pattern_aborts_before_relocating() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("in");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), "a").unwrap();

        let options = OrganizeOptions {
            filters: FilterSpec::default().with_includes(["(unclosed"]),
            ..Default::default()
        };
        let result = organize(&source, &temp_dir.path().join("out"), &options);

        assert!(matches!(result, Err(OrganizeError::Filter(_))));
        assert!(source.join("a.txt").exists());
    }

    #[test]
    fn test_organize_by_extension_overrides_collation() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("in");
        let target = temp_dir.path().join("out");
        fs::create_dir_all(source.join("b")).unwrap();
        fs::write(source.join("a.png"), "a").unwrap();
        fs::write(source.join("b/c.PNG"), "c").unwrap();

        let results = organize_by_extension(
            &source,
            &target,
            OrganizeOptions::default(),
            ExtensionCollation::default(),
        )
        .unwrap();

        assert_eq!(results.len(), 2);
        assert!(target.join("png/a.png").exists());
        assert!(target.join("png/c.PNG").exists());
        assert!(!source.join("b").exists());
    }

    #[test]
    fn test_observer_receives_results() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("in");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), "a").unwrap();

        let mut count = 0;
        let options = OrganizeOptions {
            relocation: RelocationOptions {
                dry_run: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let results = organize_with(
            &LocalFileSystem,
            &source,
            &temp_dir.path().join("out"),
            &options,
            |_| count += 1,
        )
        .unwrap();

        assert_eq!(count, 1);
        assert_eq!(results.len(), 1);
        assert!(source.join("a.txt").exists());
    }
}
