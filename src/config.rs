//! TOML configuration.
//!
//! Every setting of a run can be stored in a configuration file and overridden
//! on the command line. Missing keys fall back to the built-in defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! [organize]
//! recursive = true
//! clean_dirs = true
//! copy = false
//! dry_run = false
//! overwrite = false
//! rename = true
//!
//! [filters]
//! extensions = ["jpg", "png"]
//! includes = ["^photos/"]
//! excludes = ["thumbnails"]
//!
//! [date]
//! formats = ["%Y", "%m"]
//! property = "modified"
//! time_zone = "utc"
//! undated_dir = "undated"
//!
//! [extension]
//! no_extension_dir = "any"
//!
//! [alphabetical]
//! upper_case = false
//! symbol_dir = "0"
//! ```

use crate::collate::{
    AlphabeticalCollation, CollateError, DEFAULT_DATE_FORMAT, DEFAULT_NO_EXTENSION_DIR,
    DEFAULT_SYMBOL_DIR, DEFAULT_UNDATED_DIR, DateCollation, DateProperty, ExtensionCollation,
    TimeZoneSpec,
};
use crate::engine::RelocationOptions;
use crate::filter::{FilterError, FilterSpec, Pattern};
use crate::organize::OrganizeOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".fileclerk.toml";

/// Errors that can occur while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration in {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("IO error reading configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Collate(#[from] CollateError),
}

/// Root of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClerkConfig {
    pub organize: OrganizeSection,
    pub filters: FilterSection,
    pub date: DateSection,
    pub extension: ExtensionSection,
    pub alphabetical: AlphabeticalSection,
}

/// `[organize]`: relocation switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrganizeSection {
    pub recursive: bool,
    /// Delete source directories left without files after a move.
    pub clean_dirs: bool,
    pub copy: bool,
    pub dry_run: bool,
    pub overwrite: bool,
    /// Retry under a unique name when the target is taken.
    pub rename: bool,
}

impl Default for OrganizeSection {
    fn default() -> Self {
        let relocation = RelocationOptions::default();
        Self {
            recursive: true,
            clean_dirs: relocation.clean_dirs,
            copy: relocation.copy,
            dry_run: relocation.dry_run,
            overwrite: relocation.overwrite,
            rename: relocation.rename,
        }
    }
}

/// `[filters]`: which discovered files take part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSection {
    /// Extension allow-list. An empty string selects files without extension.
    pub extensions: Vec<String>,
    /// Regexes; a file must match at least one.
    pub includes: Vec<String>,
    /// Regexes; a file must match none.
    pub excludes: Vec<String>,
}

/// `[date]`: settings of the by-date strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DateSection {
    /// One directory level per strftime format.
    pub formats: Vec<String>,
    pub property: String,
    pub time_zone: String,
    pub undated_dir: String,
}

impl Default for DateSection {
    fn default() -> Self {
        Self {
            formats: vec![DEFAULT_DATE_FORMAT.to_string()],
            property: "created".to_string(),
            time_zone: TimeZoneSpec::Local.to_string(),
            undated_dir: DEFAULT_UNDATED_DIR.to_string(),
        }
    }
}

/// `[extension]`: settings of the by-extension strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtensionSection {
    pub no_extension_dir: String,
}

impl Default for ExtensionSection {
    fn default() -> Self {
        Self {
            no_extension_dir: DEFAULT_NO_EXTENSION_DIR.to_string(),
        }
    }
}

/// `[alphabetical]`: settings of the by-first-character strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlphabeticalSection {
    pub upper_case: bool,
    pub symbol_dir: String,
}

impl Default for AlphabeticalSection {
    fn default() -> Self {
        Self {
            upper_case: false,
            symbol_dir: DEFAULT_SYMBOL_DIR.to_string(),
        }
    }
}

impl ClerkConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.fileclerk.toml` in the current directory
    /// 3. Look for `~/.config/fileclerk/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read,
    /// or if any file found is not valid TOML.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("fileclerk")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if file does not exist.
    /// Returns `ConfigError::Invalid` if TOML parsing fails.
    /// Returns `ConfigError::Io` if file cannot be read.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = toml::from_str(&content).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// The filter settings, with every regex compiled.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Filter` for an include or exclude that does not compile.
    pub fn filter_spec(&self) -> Result<FilterSpec, ConfigError> {
        Ok(FilterSpec {
            extensions: self.filters.extensions.clone(),
            includes: compile_patterns(&self.filters.includes)?,
            excludes: compile_patterns(&self.filters.excludes)?,
            source_filters: Vec::new(),
        })
    }

    pub fn relocation_options(&self) -> RelocationOptions {
        RelocationOptions {
            copy: self.organize.copy,
            dry_run: self.organize.dry_run,
            overwrite: self.organize.overwrite,
            rename: self.organize.rename,
            clean_dirs: self.organize.clean_dirs,
        }
    }

    /// Resolves everything except the strategy, which stays `Collation::Default`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Filter` for an invalid pattern.
    pub fn organize_options(&self) -> Result<OrganizeOptions, ConfigError> {
        Ok(OrganizeOptions {
            recursive: self.organize.recursive,
            filters: self.filter_spec()?,
            relocation: self.relocation_options(),
            ..OrganizeOptions::default()
        })
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Collate` for an invalid format, property or time zone.
    pub fn date_collation(&self) -> Result<DateCollation, ConfigError> {
        let property: DateProperty = self.date.property.parse()?;
        let time_zone: TimeZoneSpec = self.date.time_zone.parse()?;
        Ok(DateCollation::new(self.date.formats.iter().cloned())?
            .with_property(property)
            .with_time_zone(time_zone)
            .with_undated_dir(self.date.undated_dir.clone()))
    }

    pub fn extension_collation(&self) -> ExtensionCollation {
        ExtensionCollation::new(self.extension.no_extension_dir.clone())
    }

    pub fn alphabetical_collation(&self) -> AlphabeticalCollation {
        AlphabeticalCollation::new(
            self.alphabetical.upper_case,
            self.alphabetical.symbol_dir.clone(),
        )
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, FilterError> {
    patterns.iter().map(|p| Pattern::parse(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use tempfile::TempDir;

    fn write_config(content: &str) -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, content).expect("Failed to write config");
        (temp_dir, path)
    }

    #[test]
    fn test_default_config_matches_library_defaults() {
        let config = ClerkConfig::default();
        let options = config.organize_options().unwrap();
        let defaults = OrganizeOptions::default();

        assert_eq!(options.recursive, defaults.recursive);
        assert_eq!(options.relocation, defaults.relocation);
        assert!(options.filters.extensions.is_empty());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let (_dir, path) = write_config("");
        let config = ClerkConfig::load_from_file(&path).unwrap();
        assert_eq!(config, ClerkConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let (_dir, path) = write_config(
            r#"
[organize]
copy = true

[filters]
extensions = ["jpg", ""]
"#,
        );
        let config = ClerkConfig::load_from_file(&path).unwrap();

        assert!(config.organize.copy);
        assert!(config.organize.rename);
        assert!(config.organize.recursive);
        assert_eq!(config.filters.extensions, vec!["jpg".to_string(), String::new()]);
        assert_eq!(config.date, DateSection::default());
    }

    #[test]
    fn test_strategy_sections() {
        let (_dir, path) = write_config(
            r##"
[date]
formats = ["%Y", "%m"]
property = "mtime"
time_zone = "+05:30"
undated_dir = "nodate"

[extension]
no_extension_dir = "plain"

[alphabetical]
upper_case = true
symbol_dir = "#"
"##,
        );
        let config = ClerkConfig::load_from_file(&path).unwrap();

        let date = config.date_collation().unwrap();
        assert_eq!(date.formats(), ["%Y".to_string(), "%m".to_string()]);
        assert_eq!(date.property(), DateProperty::Modified);
        assert_eq!(
            date.time_zone(),
            TimeZoneSpec::Fixed(FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap())
        );

        assert_eq!(config.extension_collation().no_extension_dir, "plain");

        let alpha = config.alphabetical_collation();
        assert!(alpha.upper_case);
        assert_eq!(alpha.symbol_dir, "#");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = ClerkConfig::load(Some(&temp_dir.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let (_dir, path) = write_config("[organize\ncopy = ");
        let result = ClerkConfig::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_unknown_key_is_error() {
        let (_dir, path) = write_config("[organize]\nmirror = true\n");
        let result = ClerkConfig::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_invalid_regex_returns_error() {
        let mut config = ClerkConfig::default();
        config.filters.excludes = vec!["[invalid(".to_string()];

        let result = config.organize_options();
        assert!(matches!(result, Err(ConfigError::Filter(_))));
        if let Err(e) = result {
            assert!(e.to_string().contains("[invalid("));
        }
    }

    #[test]
    fn test_invalid_time_zone_returns_error() {
        let mut config = ClerkConfig::default();
        config.date.time_zone = "Mars/Olympus".to_string();

        let result = config.date_collation();
        assert!(matches!(
            result,
            Err(ConfigError::Collate(CollateError::InvalidTimeZone { .. }))
        ));
    }
}
