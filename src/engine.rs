//! Relocation engine: executes planned pairs one at a time.
//!
//! For each pair the engine copies or moves the source to its planned target,
//! renames on collision when allowed, and prunes source directories left
//! without files. Failures are recorded per pair and never stop the run.

use crate::descriptor::FileDescriptor;
use crate::fs_adapter::{FileSystem, FsError, FsResult};
use crate::planner::RelocationPair;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Kind of relocation performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Copy,
    Move,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Copy => write!(f, "copy"),
            Operation::Move => write!(f, "move"),
        }
    }
}

/// Outcome of one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocationResult {
    /// Where the file came from.
    pub source: PathBuf,
    /// Where the file ended up (or would end up, in a dry run).
    pub target: PathBuf,
    pub operation: Operation,
    pub success: bool,
    /// Failure detail when `success` is false.
    pub error: Option<String>,
    /// The planned target existed before the relocation.
    pub target_exists: bool,
    /// Size of the source file in bytes.
    pub size: u64,
}

/// Per-run switches of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationOptions {
    pub copy: bool,
    pub dry_run: bool,
    pub overwrite: bool,
    pub rename: bool,
    pub clean_dirs: bool,
}

impl Default for RelocationOptions {
    fn default() -> Self {
        Self {
            copy: false,
            dry_run: false,
            overwrite: false,
            rename: true,
            clean_dirs: true,
        }
    }
}

impl RelocationOptions {
    pub fn operation(&self) -> Operation {
        if self.copy {
            Operation::Copy
        } else {
            Operation::Move
        }
    }
}

/// Alternate target used after a collision: `<name>-<token>.<extension>` in
/// the same directory.
///
/// The extension keeps its original case.
pub fn renamed_target(target: &FileDescriptor, token: &str) -> PathBuf {
    let file_name = match target.path.extension() {
        Some(extension) => format!("{}-{}.{}", target.name, token, extension.to_string_lossy()),
        None => format!("{}-{}", target.name, token),
    };
    target.parent_dir.join(file_name)
}

/// Executes relocation pairs against a [`FileSystem`].
pub struct RelocationEngine<'a> {
    fs: &'a dyn FileSystem,
    source_root: &'a Path,
    options: RelocationOptions,
}

impl<'a> RelocationEngine<'a> {
    pub fn new(fs: &'a dyn FileSystem, source_root: &'a Path, options: RelocationOptions) -> Self {
        Self {
            fs,
            source_root,
            options,
        }
    }

    /// Relocates every pair in order.
    pub fn execute(&self, pairs: &[RelocationPair]) -> Vec<RelocationResult> {
        self.execute_with(pairs, |_| {})
    }

    /// Relocates every pair in order, handing each result to `observer` as
    /// soon as the pair is done.
    ///
    /// Pairs are processed strictly one after the other. Cleanup of a
    /// directory relies on every deeper file having been handled already, so
    /// `pairs` must come from the planner's deepest-first ordering.
    pub fn execute_with<F>(&self, pairs: &[RelocationPair], mut observer: F) -> Vec<RelocationResult>
    where
        F: FnMut(&RelocationResult),
    {
        let mut results = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let result = self.relocate(pair);
            observer(&result);
            results.push(result);
        }
        results
    }

    fn relocate(&self, pair: &RelocationPair) -> RelocationResult {
        let mut result = RelocationResult {
            source: pair.source.path.clone(),
            target: pair.target.path.clone(),
            operation: self.options.operation(),
            success: true,
            error: None,
            target_exists: self.fs.exists(&pair.target.path),
            size: pair.source.size,
        };

        // Nothing to do when the file already sits where it collates
        if result.target_exists && self.fs.is_same_file(&pair.source.path, &pair.target.path) {
            debug!(path = %result.source.display(), "file already in place");
            return result;
        }

        if self.options.dry_run {
            if result.target_exists && !self.options.overwrite && !self.options.rename {
                result.success = false;
                result.error = Some(
                    FsError::AlreadyExists {
                        path: pair.target.path.clone(),
                    }
                    .to_string(),
                );
            }
            debug!(src = %result.source.display(), dest = %result.target.display(), success = result.success, "dry-run: would relocate file");
            return result;
        }

        if let Err(e) = self.transfer(&pair.source.path, &pair.target.path, self.options.overwrite) {
            if !self.options.rename {
                warn!(src = %result.source.display(), dest = %result.target.display(), error = %e, "relocation failed");
                return fail(result, e);
            }

            let alternate = renamed_target(&pair.target, &Uuid::new_v4().to_string());
            debug!(dest = %alternate.display(), error = %e, "target unavailable, retrying under a unique name");
            if let Err(retry_error) = self.transfer(&pair.source.path, &alternate, false) {
                warn!(src = %result.source.display(), dest = %alternate.display(), error = %retry_error, "relocation failed after rename");
                return fail(result, retry_error);
            }
            result.target = alternate;
        }

        info!(
            op = %result.operation,
            src = %result.source.display(),
            dest = %result.target.display(),
            "relocated file"
        );

        if result.operation == Operation::Move && self.options.clean_dirs {
            self.clean_parent(&pair.source.parent_dir);
        }

        result
    }

    fn transfer(&self, src: &Path, dst: &Path, overwrite: bool) -> FsResult<()> {
        match self.options.operation() {
            Operation::Copy => self.fs.copy(src, dst, overwrite),
            Operation::Move => self.fs.move_path(src, dst, overwrite),
        }
    }

    /// Deletes `dir` if no file is left anywhere below it.
    ///
    /// The source root itself is never deleted.
    fn clean_parent(&self, dir: &Path) {
        if dir == self.source_root || !dir.starts_with(self.source_root) {
            return;
        }

        match self.fs.is_empty_recursive(dir) {
            Ok(true) => match self.fs.delete_directory(dir) {
                Ok(()) => debug!(dir = %dir.display(), "removed emptied source directory"),
                Err(e) => warn!(dir = %dir.display(), error = %e, "could not remove emptied source directory"),
            },
            Ok(false) => {}
            Err(e) => warn!(dir = %dir.display(), error = %e, "could not check source directory for cleanup"),
        }
    }
}

fn fail(mut result: RelocationResult, error: FsError) -> RelocationResult {
    result.success = false;
    result.error = Some(error.to_string());
    result
}
