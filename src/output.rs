//! Terminal output for the two binaries.
//!
//! Status lines are colored by severity, sort progress drives an indicatif
//! bar, and finished passes print a per-folder table.

use crate::file_organizer::SortReport;
use crate::progress::{ProgressEvent, ProgressObserver};
use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

const PROGRESS_TEMPLATE: &str = "{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Styled console output.
pub struct Console;

impl Console {
    /// Green check line.
    ///
    /// ```no_run
    /// use dlsort::output::Console;
    /// Console::success("Downloads sorted!");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Red cross line on stderr.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn section(title: &str) {
        println!("\n{}", title.bold());
    }

    /// Yellow `[DRY RUN]` line.
    pub fn dry_run(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// One line of a dry-run listing.
    pub fn planned_move(name: &str, destination: &Path) {
        println!(" - {}\n   {} {}", name, "→".cyan(), destination.display());
    }

    /// One entry that could not be moved.
    pub fn failed_move(source: &Path, reason: &str) {
        eprintln!("{} {}: {}", "✗".red(), source.display(), reason.dimmed());
    }

    /// Table of planned entries per category folder, with the total.
    pub fn folder_summary(report: &SortReport) {
        let counts = report.counts_by_folder();
        let width = counts.keys().map(String::len).max().unwrap_or(0).max("Folder".len());
        let rule = "-".repeat(width + 14);

        Self::section("SUMMARY");
        println!("{:<width$} | {}", "Folder".bold(), "Entries".bold(), width = width);
        println!("{}", rule);
        for (folder, count) in &counts {
            println!("{:<width$} | {}", folder, count_cell(*count), width = width);
        }
        println!("{}", rule);
        println!(
            "{:<width$} | {}",
            "Total".bold(),
            count_cell(report.planned.len()).bold(),
            width = width
        );
    }
}

fn count_cell(count: usize) -> ColoredString {
    let noun = if count == 1 { "entry" } else { "entries" };
    format!("{} {}", count, noun).green()
}

/// Renders sort progress events onto an indicatif bar.
pub struct ProgressBarObserver {
    bar: ProgressBar,
}

impl ProgressBarObserver {
    /// A bar with no length yet; the first range event sets it.
    pub fn new() -> Self {
        let style = ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        let bar = ProgressBar::new(0);
        bar.set_style(style);
        Self { bar }
    }

    /// Stops drawing the bar, leaving the last state visible.
    pub fn finish(&self) {
        self.bar.finish();
    }
}

impl Default for ProgressBarObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ProgressBarObserver {
    fn on_event(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Range { min, max } => {
                self.bar.set_length(max.saturating_sub(min) as u64);
                self.bar.set_position(0);
            }
            ProgressEvent::Value(value) => self.bar.set_position(value as u64),
            ProgressEvent::Status(message) => self.bar.set_message(message),
        }
    }
}
