//! File filter pipeline.
//!
//! Every configured category is compiled once into a [`FileFilter`]:
//! - extension allow-list (case-insensitive, leading dot optional)
//! - include regexes (a file must match at least one)
//! - exclude regexes (a file must match none)
//! - caller-supplied predicates (a file must pass all)
//!
//! Categories are combined with AND. A category with no entries passes every
//! file. Extension, include and exclude patterns are tested against the path
//! relative to the source root, using `/` separators.

use crate::descriptor::{FileDescriptor, relative_path};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Errors raised while compiling filter patterns.
#[derive(Debug, Clone, Error)]
pub enum FilterError {
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// A caller-supplied predicate over a raw descriptor.
pub type SourceFilter = Arc<dyn Fn(&FileDescriptor) -> bool + Send + Sync>;

/// An include or exclude pattern, either still a string or already compiled.
#[derive(Debug, Clone)]
pub enum Pattern {
    Source(String),
    Compiled(Regex),
}

impl Pattern {
    /// Compiles `source` right away instead of when the filter is built.
    pub fn parse(source: &str) -> Result<Self, FilterError> {
        compile_regex(source).map(Pattern::Compiled)
    }

    fn compile(&self) -> Result<Regex, FilterError> {
        match self {
            Pattern::Compiled(regex) => Ok(regex.clone()),
            Pattern::Source(source) => compile_regex(source),
        }
    }
}

impl From<&str> for Pattern {
    fn from(value: &str) -> Self {
        Pattern::Source(value.to_string())
    }
}

impl From<String> for Pattern {
    fn from(value: String) -> Self {
        Pattern::Source(value)
    }
}

impl From<Regex> for Pattern {
    fn from(value: Regex) -> Self {
        Pattern::Compiled(value)
    }
}

fn compile_regex(source: &str) -> Result<Regex, FilterError> {
    Regex::new(source).map_err(|e| FilterError::InvalidPattern {
        pattern: source.to_string(),
        reason: e.to_string(),
    })
}

/// Builds the regex for one extension allow-list entry.
///
/// An empty entry selects files whose last path segment has no dot.
fn extension_regex(extension: &str) -> Result<Regex, FilterError> {
    let extension = extension.strip_prefix('.').unwrap_or(extension);
    if extension.is_empty() {
        compile_regex(r"(^|/)[^/.]*$")
    } else {
        compile_regex(&format!(r"(?i)\.{}$", regex::escape(extension)))
    }
}

/// Uncompiled filter configuration.
#[derive(Clone, Default)]
pub struct FilterSpec {
    pub extensions: Vec<String>,
    pub includes: Vec<Pattern>,
    pub excludes: Vec<Pattern>,
    pub source_filters: Vec<SourceFilter>,
}

impl FilterSpec {
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions.extend(extensions.into_iter().map(Into::into));
        self
    }

    pub fn with_includes<I, P>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Pattern>,
    {
        self.includes.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn with_excludes<I, P>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Pattern>,
    {
        self.excludes.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Adds one caller-supplied predicate.
    pub fn with_source_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&FileDescriptor) -> bool + Send + Sync + 'static,
    {
        self.source_filters.push(Arc::new(filter));
        self
    }
}

impl fmt::Debug for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSpec")
            .field("extensions", &self.extensions)
            .field("includes", &self.includes)
            .field("excludes", &self.excludes)
            .field("source_filters", &self.source_filters.len())
            .finish()
    }
}

/// Compiled filter, ready to test descriptors.
pub struct FileFilter {
    source_root: PathBuf,
    extensions: Vec<Regex>,
    includes: Vec<Regex>,
    excludes: Vec<Regex>,
    source_filters: Vec<SourceFilter>,
}

impl FileFilter {
    /// Compiles a [`FilterSpec`] for files discovered under `source_root`.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::InvalidPattern` if any pattern fails to compile.
    pub fn build(spec: &FilterSpec, source_root: &Path) -> Result<Self, FilterError> {
        let extensions = spec
            .extensions
            .iter()
            .map(|e| extension_regex(e))
            .collect::<Result<Vec<_>, _>>()?;
        let includes = spec
            .includes
            .iter()
            .map(Pattern::compile)
            .collect::<Result<Vec<_>, _>>()?;
        let excludes = spec
            .excludes
            .iter()
            .map(Pattern::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source_root: source_root.to_path_buf(),
            extensions,
            includes,
            excludes,
            source_filters: spec.source_filters.clone(),
        })
    }

    /// A filter that lets everything through.
    pub fn allow_all(source_root: &Path) -> Self {
        Self {
            source_root: source_root.to_path_buf(),
            extensions: Vec::new(),
            includes: Vec::new(),
            excludes: Vec::new(),
            source_filters: Vec::new(),
        }
    }

    /// Returns true if `file` passes every configured category.
    pub fn matches(&self, file: &FileDescriptor) -> bool {
        if !self.source_filters.iter().all(|f| f(file)) {
            trace!(path = %file.path.display(), "rejected by source filter");
            return false;
        }

        if self.extensions.is_empty() && self.includes.is_empty() && self.excludes.is_empty() {
            return true;
        }

        let compare_path = relative_path(&file.path, &self.source_root);
        let passes = (self.extensions.is_empty()
            || self.extensions.iter().any(|e| e.is_match(&compare_path)))
            && (self.includes.is_empty()
                || self.includes.iter().any(|i| i.is_match(&compare_path)))
            && !self.excludes.iter().any(|e| e.is_match(&compare_path));

        if !passes {
            trace!(path = %compare_path, "rejected by pattern filters");
        }
        passes
    }
}
