//! Output formatting and styling module.
//!
//! Centralizes all terminal output of the binary: coloured status lines,
//! the rule listing and the post-organize summary table.

use crate::organize::OrganizeReport;
use crate::rules::{RuleSet, Section};
use colored::*;
use std::collections::BTreeMap;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filesorter::output::OutputFormatter;
    /// OutputFormatter::success("Rule added");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints every rule section in classification order, followed by the
    /// tree settings.
    pub fn rules(rules: &RuleSet) {
        for section in Section::ALL {
            Self::header(section.label());
            let entries = rules.section(section);
            if entries.is_empty() {
                println!("  {}", "(none)".dimmed());
                continue;
            }
            for rule in entries {
                let pattern = match section {
                    Section::Substring => format!("'{}'", rule.pattern),
                    _ => rule.pattern.clone(),
                };
                println!("  {} -> {}", pattern, rule.folder.green());
            }
        }

        Self::header("Tree snapshot");
        let depth = rules
            .tree_max_depth
            .map(|d| d.to_string())
            .unwrap_or_else(|| "unbounded".to_string());
        println!(
            "  enabled: {}, max depth: {}",
            if rules.generate_tree { "yes".green() } else { "no".yellow() },
            depth
        );
    }

    /// Prints the outcome of an organize run.
    pub fn report(report: &OrganizeReport) {
        if !report.flattened.is_empty() {
            Self::info(&format!(
                "Hoisted {} file(s) out of subdirectories",
                report.flattened.len()
            ));
        }

        Self::summary_table(&report.folder_counts(), report.moved.len());

        if let Some(tree_file) = &report.tree_file {
            Self::success(&format!("Directory tree saved to {}", tree_file.display()));
        }

        if !report.is_clean() {
            Self::warning(&format!(
                "{} file(s) could not be moved:",
                report.failures.len()
            ));
            for failure in &report.failures {
                eprintln!("    - {}", failure);
            }
        }
    }

    /// Prints a summary table with file counts by destination folder.
    pub fn summary_table(folder_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        if folder_counts.is_empty() {
            println!("No files matched any rule.");
            return;
        }

        let width = folder_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(6); // At least "Folder" width

        println!("{:<width$} | {}", "Folder".bold(), "Files".bold(), width = width);
        println!("{}", "-".repeat(width + 10));

        for (folder, count) in folder_counts {
            println!(
                "{:<width$} | {} {}",
                folder,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files),
            width = width
        );
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
