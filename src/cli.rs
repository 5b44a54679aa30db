//! Command-line interface module for fileclerk.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing (one subcommand per collation strategy)
//! - Merging command-line flags over the configuration file
//! - Running the relocation and rendering its report

use crate::collate::Collation;
use crate::config::{ClerkConfig, ConfigError};
use crate::engine::{RelocationEngine, RelocationResult};
use crate::fs_adapter::LocalFileSystem;
use crate::logging::LogLevel;
use crate::organize::{OrganizeError, OrganizeOptions, plan_organize};
use crate::output::{OutputFormatter, RunSummary};
use clap::{Args, Parser, Subcommand, ValueHint};
use indicatif::ProgressBar;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a CLI run before or instead of producing a report.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Organize(#[from] OrganizeError),

    #[error("Failed to render JSON report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Collate files from a source tree into a target tree.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Collate files from a source tree into a target tree")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Diagnostic log level.
    #[arg(long, value_enum, global = true, default_value_t = LogLevel::Normal)]
    pub log_level: LogLevel,

    /// Emit diagnostic logs as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Relocate files, keeping their directory structure below SOURCE.
    Organize(CommonArgs),

    /// One directory level per formatted timestamp.
    ByDate {
        #[command(flatten)]
        common: CommonArgs,

        /// strftime format of a directory level; repeat for nested levels.
        #[arg(long = "format", value_name = "FORMAT")]
        formats: Vec<String>,

        /// Timestamp to use: created, modified or accessed.
        #[arg(long)]
        property: Option<String>,

        /// Time zone: local, utc, an offset such as +05:30 or an IANA name.
        #[arg(long = "tz", value_name = "ZONE")]
        time_zone: Option<String>,
    },

    /// One directory per lowercase extension.
    ByExtension {
        #[command(flatten)]
        common: CommonArgs,

        /// Directory for files without extension.
        #[arg(long, value_name = "DIR")]
        no_extension_dir: Option<String>,
    },

    /// One directory per first alphanumeric character of the name.
    ByAlpha {
        #[command(flatten)]
        common: CommonArgs,

        /// Use upper-case directory names.
        #[arg(long, overrides_with = "lower_case")]
        upper_case: bool,

        /// Use lower-case directory names, overriding the configuration.
        #[arg(long, overrides_with = "upper_case")]
        lower_case: bool,

        /// Directory for names without alphanumeric characters.
        #[arg(long, value_name = "DIR")]
        symbol_dir: Option<String>,
    },
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Directory to collect files from.
    #[arg(value_name = "SOURCE", value_hint = ValueHint::DirPath)]
    pub source: PathBuf,

    /// Directory to relocate files into.
    #[arg(value_name = "TARGET", value_hint = ValueHint::DirPath)]
    pub target: PathBuf,

    /// Copy instead of move.
    #[arg(long, overrides_with = "no_copy")]
    pub copy: bool,

    /// Move even if the configuration asks for copies.
    #[arg(long = "move", overrides_with = "copy")]
    pub no_copy: bool,

    /// Show what would be done, but do not modify files/directories.
    #[arg(long, overrides_with = "no_dry_run")]
    pub dry_run: bool,

    /// Modify files even if the configuration asks for a dry run.
    #[arg(long, overrides_with = "dry_run")]
    pub no_dry_run: bool,

    /// Replace existing targets.
    #[arg(long, overrides_with = "no_overwrite")]
    pub overwrite: bool,

    /// Never replace existing targets.
    #[arg(long, overrides_with = "overwrite")]
    pub no_overwrite: bool,

    /// Rename instead of failing when a target exists.
    #[arg(long, overrides_with = "no_rename")]
    pub rename: bool,

    /// Fail instead of renaming when a target exists.
    #[arg(long, overrides_with = "rename")]
    pub no_rename: bool,

    /// Descend into subdirectories of SOURCE.
    #[arg(long, overrides_with = "no_recursive")]
    pub recursive: bool,

    /// Only consider files directly inside SOURCE.
    #[arg(long, overrides_with = "recursive")]
    pub no_recursive: bool,

    /// Remove source directories emptied by a move.
    #[arg(long, overrides_with = "keep_dirs")]
    pub clean_dirs: bool,

    /// Keep source directories emptied by a move.
    #[arg(long, overrides_with = "clean_dirs")]
    pub keep_dirs: bool,

    /// Extension allow-list; an empty value selects files without extension.
    #[arg(long, value_name = "EXT", value_delimiter = ',')]
    pub ext: Vec<String>,

    /// Regex a file's path below SOURCE must match (any of them).
    #[arg(long, value_name = "REGEX")]
    pub include: Vec<String>,

    /// Regex a file's path below SOURCE must not match.
    #[arg(long, value_name = "REGEX")]
    pub exclude: Vec<String>,

    /// Configuration file to use instead of the default search.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Print the results as JSON.
    #[arg(long)]
    pub json: bool,
}

impl CommonArgs {
    /// Applies the flags that were given over `config`.
    pub fn apply_to(&self, config: &mut ClerkConfig) {
        let organize = &mut config.organize;
        set_flag(&mut organize.copy, self.copy, self.no_copy);
        set_flag(&mut organize.dry_run, self.dry_run, self.no_dry_run);
        set_flag(&mut organize.overwrite, self.overwrite, self.no_overwrite);
        set_flag(&mut organize.rename, self.rename, self.no_rename);
        set_flag(&mut organize.recursive, self.recursive, self.no_recursive);
        set_flag(&mut organize.clean_dirs, self.clean_dirs, self.keep_dirs);

        let filters = &mut config.filters;
        if !self.ext.is_empty() {
            filters.extensions = self.ext.clone();
        }
        if !self.include.is_empty() {
            filters.includes = self.include.clone();
        }
        if !self.exclude.is_empty() {
            filters.excludes = self.exclude.clone();
        }
    }
}

/// Overrides a configured switch when either of its flags was given.
fn set_flag(value: &mut bool, on: bool, off: bool) {
    if on {
        *value = true;
    } else if off {
        *value = false;
    }
}

impl Command {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Command::Organize(common)
            | Command::ByDate { common, .. }
            | Command::ByExtension { common, .. }
            | Command::ByAlpha { common, .. } => common,
        }
    }

    /// Loads the configuration, applies the flags and resolves the run options.
    ///
    /// # Errors
    ///
    /// Fails on an unreadable configuration or an invalid pattern, date format,
    /// date property or time zone.
    pub fn resolve(&self) -> Result<OrganizeOptions, ConfigError> {
        let common = self.common();
        let mut config = ClerkConfig::load(common.config.as_deref())?;
        common.apply_to(&mut config);

        let collation = match self {
            Command::Organize(_) => Collation::Default,
            Command::ByDate {
                formats,
                property,
                time_zone,
                ..
            } => {
                if !formats.is_empty() {
                    config.date.formats = formats.clone();
                }
                if let Some(property) = property {
                    config.date.property = property.clone();
                }
                if let Some(time_zone) = time_zone {
                    config.date.time_zone = time_zone.clone();
                }
                Collation::ByDate(config.date_collation()?)
            }
            Command::ByExtension {
                no_extension_dir, ..
            } => {
                if let Some(dir) = no_extension_dir {
                    config.extension.no_extension_dir = dir.clone();
                }
                Collation::ByExtension(config.extension_collation())
            }
            Command::ByAlpha {
                upper_case,
                lower_case,
                symbol_dir,
                ..
            } => {
                set_flag(&mut config.alphabetical.upper_case, *upper_case, *lower_case);
                if let Some(dir) = symbol_dir {
                    config.alphabetical.symbol_dir = dir.clone();
                }
                Collation::ByFirstChar(config.alphabetical_collation())
            }
        };

        Ok(OrganizeOptions {
            collation,
            ..config.organize_options()?
        })
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    dry_run: bool,
    summary: RunSummary,
    results: &'a [RelocationResult],
}

/// Runs one CLI command and returns the totals of the run.
///
/// Per-file failures are part of the summary; only failures that prevent the
/// run from starting are returned as errors.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use fileclerk::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["fileclerk", "by-extension", "inbox", "sorted", "--dry-run"]);
/// match run_cli(&cli.command) {
///     Ok(summary) => println!("{} failed", summary.failed),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(command: &Command) -> Result<RunSummary, CliError> {
    let common = command.common();
    let options = command.resolve()?;
    let dry_run = options.relocation.dry_run;
    let report = !common.json;

    let pairs = plan_organize(&LocalFileSystem, &common.source, &common.target, &options)?;

    if report {
        OutputFormatter::info(&format!(
            "Organizing {} into {}",
            common.source.display(),
            common.target.display()
        ));
        if dry_run {
            OutputFormatter::dry_run_notice("No files will be modified.");
        }
        if pairs.is_empty() {
            OutputFormatter::warning("No files found to organize.");
        }
    }

    let progress = if report && !dry_run {
        OutputFormatter::create_progress_bar(pairs.len() as u64)
    } else {
        ProgressBar::hidden()
    };

    let engine = RelocationEngine::new(&LocalFileSystem, &common.source, options.relocation);
    let results = engine.execute_with(&pairs, |result| {
        if report {
            progress.suspend(|| {
                OutputFormatter::print_result(result, &common.source, &common.target)
            });
        }
        progress.inc(1);
    });
    progress.finish_and_clear();

    let summary = RunSummary::from_results(&results);
    if report {
        OutputFormatter::summary_table(&summary);
        if dry_run {
            OutputFormatter::dry_run_notice("Dry run complete. No files were modified.");
        }
    } else {
        let json = serde_json::to_string_pretty(&JsonReport {
            dry_run,
            summary,
            results: &results,
        })?;
        println!("{}", json);
    }

    Ok(summary)
}
