//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored output,
//! progress tracking, and formatted tables. Diagnostics go through `tracing`;
//! this module only renders what the user asked for.

use crate::engine::{Operation, RelocationResult};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::Path;

/// Totals over a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub moved: usize,
    pub copied: usize,
    pub failed: usize,
    /// Pairs whose planned target already existed.
    pub collisions: usize,
    /// Bytes of the successfully relocated files.
    pub bytes: u64,
}

impl RunSummary {
    pub fn from_results(results: &[RelocationResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, r| {
            if r.target_exists {
                summary.collisions += 1;
            }
            if !r.success {
                summary.failed += 1;
                return summary;
            }
            match r.operation {
                Operation::Move => summary.moved += 1,
                Operation::Copy => summary.copied += 1,
            }
            summary.bytes += r.size;
            summary
        })
    }

    pub fn total(&self) -> usize {
        self.moved + self.copied + self.failed
    }
}

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fileclerk::output::OutputFormatter;
    /// OutputFormatter::error("Source is not a directory");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for `total` relocations.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fileclerk::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        // Template is static; fall back to the default style if it ever fails to parse
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("█▓░"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }

    /// One line describing a relocation, relative to the two roots.
    pub fn result_line(result: &RelocationResult, source_root: &Path, target_root: &Path) -> String {
        let source = display_relative(&result.source, source_root);
        let target = display_relative(&result.target, target_root);
        if result.success {
            format!("{} {} → {}", result.operation, source, target)
        } else {
            format!(
                "{} {}: {}",
                result.operation,
                source,
                result.error.as_deref().unwrap_or("unknown error")
            )
        }
    }

    /// Prints one result, styled by outcome.
    pub fn print_result(result: &RelocationResult, source_root: &Path, target_root: &Path) {
        let line = Self::result_line(result, source_root, target_root);
        if result.success {
            Self::success(&line);
        } else {
            Self::error(&line);
        }
    }

    /// Prints a summary table of the run.
    pub fn summary_table(summary: &RunSummary) {
        Self::header("SUMMARY");

        let rows = [
            ("Moved", summary.moved.to_string()),
            ("Copied", summary.copied.to_string()),
            ("Failed", summary.failed.to_string()),
            ("Collisions", summary.collisions.to_string()),
            ("Bytes", summary.bytes.to_string()),
        ];
        let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

        println!("{:<width$} | {}", "Result".bold(), "Count".bold(), width = width);
        println!("{}", "-".repeat(width + 10));
        for (name, value) in &rows {
            let value = if *name == "Failed" && summary.failed > 0 {
                value.red()
            } else {
                value.green()
            };
            println!("{:<width$} | {}", name, value, width = width);
        }
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            summary.total().to_string().green().bold(),
            if summary.total() == 1 { "file" } else { "files" },
            width = width
        );
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
