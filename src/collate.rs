//! Collation strategies: where a source file lands under the target root.
//!
//! A strategy maps a descriptor to a path relative to the target root. It never
//! touches the filesystem. Built-in strategies and caller-supplied ones share
//! the [`Collator`] trait; [`Collation`] is the tagged variant the rest of the
//! crate passes around.

use crate::descriptor::{FileDescriptor, relative_path};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while configuring a collation strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollateError {
    #[error("Invalid date format '{format}'")]
    InvalidDateFormat { format: String },

    #[error("Invalid time zone '{value}': expected local, utc, an offset such as +05:30 or an IANA name")]
    InvalidTimeZone { value: String },

    #[error("Invalid date property '{value}': expected created, modified or accessed")]
    InvalidDateProperty { value: String },
}

/// The source and target roots of a run.
#[derive(Debug, Clone, Copy)]
pub struct Roots<'a> {
    pub source: &'a Path,
    pub target: &'a Path,
}

/// Maps a file to a path relative to the target root.
pub trait Collator: Send + Sync {
    fn collate(&self, file: &FileDescriptor, roots: &Roots<'_>) -> String;
}

impl<F> Collator for F
where
    F: Fn(&FileDescriptor, &Roots<'_>) -> String + Send + Sync,
{
    fn collate(&self, file: &FileDescriptor, roots: &Roots<'_>) -> String {
        self(file, roots)
    }
}

/// Builds the target descriptor for `file`.
///
/// Leading separators in the strategy output are dropped so the result always
/// stays under the target root.
pub fn build_target(collator: &dyn Collator, file: &FileDescriptor, roots: &Roots<'_>) -> FileDescriptor {
    let generated = collator.collate(file, roots);
    let relative = generated.trim_start_matches(['/', '\\']);
    file.relocated(roots.target.join(relative))
}

/// Which timestamp of a file drives date collation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateProperty {
    /// Creation (birth) time. Falls back to modification time on platforms
    /// that do not report it.
    #[default]
    Created,
    Modified,
    /// Last access time. Falls back to modification time when unavailable.
    Accessed,
}

impl DateProperty {
    pub fn timestamp(&self, file: &FileDescriptor) -> Option<DateTime<Utc>> {
        match self {
            DateProperty::Created => file.created.or(file.modified),
            DateProperty::Modified => file.modified,
            DateProperty::Accessed => file.accessed.or(file.modified),
        }
    }
}

impl FromStr for DateProperty {
    type Err = CollateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "created" | "ctime" | "birthtime" => Ok(DateProperty::Created),
            "modified" | "mtime" => Ok(DateProperty::Modified),
            "accessed" | "atime" => Ok(DateProperty::Accessed),
            _ => Err(CollateError::InvalidDateProperty {
                value: s.to_string(),
            }),
        }
    }
}

/// Time zone used to render timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeZoneSpec {
    #[default]
    Local,
    Utc,
    Fixed(FixedOffset),
    /// IANA zone such as `Europe/Rome`, with daylight saving applied.
    Named(Tz),
}

impl TimeZoneSpec {
    fn format(&self, timestamp: DateTime<Utc>, format: &str) -> String {
        match self {
            TimeZoneSpec::Local => timestamp.with_timezone(&Local).format(format).to_string(),
            TimeZoneSpec::Utc => timestamp.format(format).to_string(),
            TimeZoneSpec::Fixed(offset) => timestamp.with_timezone(offset).format(format).to_string(),
            TimeZoneSpec::Named(tz) => timestamp.with_timezone(tz).format(format).to_string(),
        }
    }
}

fn parse_offset(value: &str) -> Option<FixedOffset> {
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes): (i32, i32) = match digits.len() {
        1 | 2 => (digits.parse().ok()?, 0),
        4 => (digits[..2].parse().ok()?, digits[2..].parse().ok()?),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl FromStr for TimeZoneSpec {
    type Err = CollateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        match value.to_lowercase().as_str() {
            "local" => Ok(TimeZoneSpec::Local),
            "utc" | "z" | "gmt" => Ok(TimeZoneSpec::Utc),
            _ => parse_offset(value)
                .map(TimeZoneSpec::Fixed)
                .or_else(|| value.parse::<Tz>().ok().map(TimeZoneSpec::Named))
                .ok_or_else(|| CollateError::InvalidTimeZone {
                    value: s.to_string(),
                }),
        }
    }
}

impl fmt::Display for TimeZoneSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeZoneSpec::Local => write!(f, "local"),
            TimeZoneSpec::Utc => write!(f, "utc"),
            TimeZoneSpec::Fixed(offset) => write!(f, "{}", offset),
            TimeZoneSpec::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

/// Default date segment format.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
/// Directory for files with no usable timestamp.
pub const DEFAULT_UNDATED_DIR: &str = "undated";
/// Directory for files with no extension.
pub const DEFAULT_NO_EXTENSION_DIR: &str = "any";
/// Directory for names with no alphanumeric character.
pub const DEFAULT_SYMBOL_DIR: &str = "0";

/// `fmt1/fmt2/.../filename`, one segment per strftime format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateCollation {
    formats: Vec<String>,
    property: DateProperty,
    time_zone: TimeZoneSpec,
    undated_dir: String,
}

impl DateCollation {
    /// Creates a date strategy with the given segment formats.
    ///
    /// Empty format strings are skipped.
    ///
    /// # Errors
    ///
    /// Returns `CollateError::InvalidDateFormat` for a format chrono cannot render.
    pub fn new<I, S>(formats: I) -> Result<Self, CollateError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let formats = formats
            .into_iter()
            .map(Into::into)
            .filter(|f: &String| !f.is_empty())
            .collect::<Vec<_>>();

        if let Some(bad) = formats
            .iter()
            .find(|f| StrftimeItems::new(f.as_str()).any(|item| matches!(item, Item::Error)))
        {
            return Err(CollateError::InvalidDateFormat {
                format: bad.clone(),
            });
        }

        Ok(Self {
            formats,
            ..Self::default()
        })
    }

    pub fn with_property(mut self, property: DateProperty) -> Self {
        self.property = property;
        self
    }

    pub fn with_time_zone(mut self, time_zone: TimeZoneSpec) -> Self {
        self.time_zone = time_zone;
        self
    }

    pub fn with_undated_dir(mut self, dir: impl Into<String>) -> Self {
        self.undated_dir = dir.into();
        self
    }

    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    pub fn property(&self) -> DateProperty {
        self.property
    }

    pub fn time_zone(&self) -> TimeZoneSpec {
        self.time_zone
    }
}

impl Default for DateCollation {
    fn default() -> Self {
        Self {
            formats: vec![DEFAULT_DATE_FORMAT.to_string()],
            property: DateProperty::default(),
            time_zone: TimeZoneSpec::default(),
            undated_dir: DEFAULT_UNDATED_DIR.to_string(),
        }
    }
}

impl Collator for DateCollation {
    fn collate(&self, file: &FileDescriptor, _roots: &Roots<'_>) -> String {
        let Some(timestamp) = self.property.timestamp(file) else {
            return format!("{}/{}", self.undated_dir, file.filename);
        };

        let mut segments: Vec<String> = self
            .formats
            .iter()
            .map(|f| self.time_zone.format(timestamp, f))
            .collect();
        segments.push(file.filename.clone());
        segments.join("/")
    }
}

/// `extension/filename`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionCollation {
    pub no_extension_dir: String,
}

impl ExtensionCollation {
    pub fn new(no_extension_dir: impl Into<String>) -> Self {
        Self {
            no_extension_dir: no_extension_dir.into(),
        }
    }
}

impl Default for ExtensionCollation {
    fn default() -> Self {
        Self::new(DEFAULT_NO_EXTENSION_DIR)
    }
}

impl Collator for ExtensionCollation {
    fn collate(&self, file: &FileDescriptor, _roots: &Roots<'_>) -> String {
        let dir = if file.extension.is_empty() {
            &self.no_extension_dir
        } else {
            &file.extension
        };
        format!("{}/{}", dir, file.filename)
    }
}

/// `firstChar/filename`, keyed on the first ASCII alphanumeric character of the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphabeticalCollation {
    pub upper_case: bool,
    pub symbol_dir: String,
}

impl AlphabeticalCollation {
    pub fn new(upper_case: bool, symbol_dir: impl Into<String>) -> Self {
        Self {
            upper_case,
            symbol_dir: symbol_dir.into(),
        }
    }
}

impl Default for AlphabeticalCollation {
    fn default() -> Self {
        Self::new(false, DEFAULT_SYMBOL_DIR)
    }
}

impl Collator for AlphabeticalCollation {
    fn collate(&self, file: &FileDescriptor, _roots: &Roots<'_>) -> String {
        let dir = file
            .name
            .chars()
            .find(char::is_ascii_alphanumeric)
            .map(String::from)
            .unwrap_or_else(|| self.symbol_dir.clone());
        let dir = if self.upper_case {
            dir.to_uppercase()
        } else {
            dir.to_lowercase()
        };
        format!("/{}/{}", dir, file.filename)
    }
}

/// The strategy used for a run.
#[derive(Clone, Default)]
pub enum Collation {
    /// Keep the structure below the source root.
    #[default]
    Default,
    ByDate(DateCollation),
    ByExtension(ExtensionCollation),
    ByFirstChar(AlphabeticalCollation),
    Custom(Arc<dyn Collator>),
}

impl Collation {
    /// Wraps a closure as a custom strategy.
    ///
    /// # Examples
    ///
    /// ```
    /// use fileclerk::collate::{Collation, Roots};
    /// use fileclerk::descriptor::FileDescriptor;
    ///
    /// let flatten = Collation::from_fn(|file: &FileDescriptor, _: &Roots<'_>| file.filename.clone());
    /// # let _ = flatten;
    /// ```
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&FileDescriptor, &Roots<'_>) -> String + Send + Sync + 'static,
    {
        Collation::Custom(Arc::new(f))
    }
}

impl fmt::Debug for Collation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collation::Default => write!(f, "Default"),
            Collation::ByDate(c) => f.debug_tuple("ByDate").field(c).finish(),
            Collation::ByExtension(c) => f.debug_tuple("ByExtension").field(c).finish(),
            Collation::ByFirstChar(c) => f.debug_tuple("ByFirstChar").field(c).finish(),
            Collation::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl Collator for Collation {
    fn collate(&self, file: &FileDescriptor, roots: &Roots<'_>) -> String {
        match self {
            Collation::Default => relative_path(&file.path, roots.source),
            Collation::ByDate(c) => c.collate(file, roots),
            Collation::ByExtension(c) => c.collate(file, roots),
            Collation::ByFirstChar(c) => c.collate(file, roots),
            Collation::Custom(c) => c.collate(file, roots),
        }
    }
}
