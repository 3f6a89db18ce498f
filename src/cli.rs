//! Command-line interface module for filesorter.
//!
//! This module handles all CLI-related functionality including:
//! - Rule editing (add, remove, tree settings) with immediate persistence
//! - Listing, exporting and importing the rule configuration
//! - Tree snapshots and the organize pipeline

use crate::config::RuleStore;
use crate::organize::organize;
use crate::output::OutputFormatter;
use crate::rules::{RuleSet, Section};
use crate::tree::write_snapshot;
use clap::Subcommand;
use std::path::{Path, PathBuf};

/// Represents a CLI command to execute.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Organize a directory using the configured rules
    Organize {
        /// Directory to organize
        directory: PathBuf,
    },
    /// Add an extension rule (e.g. pdf docs)
    AddExtension { extension: String, folder: String },
    /// Add a rule for file names containing TEXT
    AddSubstring { text: String, folder: String },
    /// Add a size rule; RANGE is min-max in megabytes, inclusive
    AddSize { range: String, folder: String },
    /// Add a rule for files modified within the last DAYS days
    AddAge { days: u64, folder: String },
    /// Add a regular-expression rule matched anywhere in the file name
    AddRegex { pattern: String, folder: String },
    /// Remove a rule (section: extension, substring, size, age, regex)
    Remove { section: Section, pattern: String },
    /// Configure the tree snapshot written after organizing
    TreeSettings {
        /// Write directory_tree.txt after organizing
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        /// Stop writing directory_tree.txt
        #[arg(long)]
        disable: bool,
        /// Maximum depth of the snapshot
        #[arg(long, conflicts_with = "unbounded")]
        max_depth: Option<usize>,
        /// Remove the depth limit
        #[arg(long)]
        unbounded: bool,
    },
    /// List all current rules
    List,
    /// Write a directory tree snapshot to a file
    Tree {
        /// Directory to render
        directory: PathBuf,
        /// Output file
        #[arg(short, long, default_value = "tree.txt")]
        output: PathBuf,
        /// Maximum depth to render
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Export the current configuration to a JSON file
    Export { file: PathBuf },
    /// Import a configuration from a JSON file, replacing the current one
    Import { file: PathBuf },
}

/// Runs a CLI command against the rules stored in `store`.
///
/// # Examples
///
/// ```no_run
/// use filesorter::cli::{Command, run_cli};
/// use filesorter::config::RuleStore;
///
/// let store = RuleStore::new("rules.json");
/// if let Err(e) = run_cli(Command::List, &store) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(command: Command, store: &RuleStore) -> Result<(), String> {
    match command {
        Command::Organize { directory } => organize_directory(&directory, store),
        Command::AddExtension { extension, folder } => update_rules(store, |rules| {
            rules.add_extension(&extension, &folder)?;
            Ok(format!(
                "Rule added: {} files -> folder {}",
                crate::rules::normalize_extension(&extension),
                folder
            ))
        }),
        Command::AddSubstring { text, folder } => update_rules(store, |rules| {
            rules.add_substring(&text, &folder)?;
            Ok(format!(
                "Rule added: files containing '{}' -> folder {}",
                text, folder
            ))
        }),
        Command::AddSize { range, folder } => update_rules(store, |rules| {
            rules.add_size_range(&range, &folder)?;
            Ok(format!("Rule added: files of {} MB -> folder {}", range, folder))
        }),
        Command::AddAge { days, folder } => update_rules(store, |rules| {
            rules.add_age_range(days, &folder)?;
            Ok(format!(
                "Rule added: files modified in the last {} day(s) -> folder {}",
                days, folder
            ))
        }),
        Command::AddRegex { pattern, folder } => update_rules(store, |rules| {
            rules.add_regex(&pattern, &folder)?;
            Ok(format!(
                "Rule added: files matching /{}/ -> folder {}",
                pattern, folder
            ))
        }),
        Command::Remove { section, pattern } => remove_rule(store, section, &pattern),
        Command::TreeSettings {
            enable,
            disable,
            max_depth,
            unbounded,
        } => update_rules(store, |rules| {
            if enable {
                rules.generate_tree = true;
            }
            if disable {
                rules.generate_tree = false;
            }
            if unbounded {
                rules.tree_max_depth = None;
            } else if max_depth.is_some() {
                rules.tree_max_depth = max_depth;
            }
            Ok("Tree settings updated".to_string())
        }),
        Command::List => {
            OutputFormatter::rules(&store.load_or_default());
            Ok(())
        }
        Command::Tree {
            directory,
            output,
            max_depth,
        } => save_snapshot(&directory, &output, max_depth),
        Command::Export { file } => {
            let rules = store.load_or_default();
            store
                .export(&rules, &file)
                .map_err(|e| format!("Error exporting configuration: {}", e))?;
            OutputFormatter::success(&format!("Configuration exported to {}", file.display()));
            Ok(())
        }
        Command::Import { file } => {
            let rules = store
                .import(&file)
                .map_err(|e| format!("Error importing configuration: {}", e))?;
            OutputFormatter::success(&format!(
                "Imported {} rule(s) from {}",
                rules.rule_count(),
                file.display()
            ));
            Ok(())
        }
    }
}

/// Organizes `directory` and prints a summary.
///
/// Per-file failures are reported but do not make the command fail.
fn organize_directory(directory: &Path, store: &RuleStore) -> Result<(), String> {
    OutputFormatter::info(&format!("Organizing contents of: {}", directory.display()));

    let report = organize(directory, store.path()).map_err(|e| e.to_string())?;
    OutputFormatter::report(&report);

    if report.is_clean() {
        OutputFormatter::success("Organization complete!");
    }
    Ok(())
}

/// Loads the rules, applies `edit` and saves them back.
fn update_rules<F>(store: &RuleStore, edit: F) -> Result<(), String>
where
    F: FnOnce(&mut RuleSet) -> Result<String, crate::config::ConfigError>,
{
    let mut rules = store.load_or_default();
    let message = edit(&mut rules).map_err(|e| e.to_string())?;
    store
        .save(&rules)
        .map_err(|e| format!("Error saving rules: {}", e))?;
    OutputFormatter::success(&message);
    Ok(())
}

fn remove_rule(store: &RuleStore, section: Section, pattern: &str) -> Result<(), String> {
    let mut rules = store.load_or_default();
    match rules.remove(section, pattern) {
        Some(folder) => {
            store
                .save(&rules)
                .map_err(|e| format!("Error saving rules: {}", e))?;
            OutputFormatter::success(&format!(
                "Rule removed: {} '{}' (was -> {})",
                section, pattern, folder
            ));
            Ok(())
        }
        None => Err(format!("No {} rule for '{}'", section, pattern)),
    }
}

fn save_snapshot(directory: &Path, output: &Path, max_depth: Option<usize>) -> Result<(), String> {
    if !directory.is_dir() {
        return Err(format!("{} is not a valid directory", directory.display()));
    }
    write_snapshot(directory, output, max_depth)
        .map_err(|e| format!("Error saving directory tree: {}", e))?;
    OutputFormatter::success(&format!("Directory tree saved to {}", output.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store_in(temp_dir: &TempDir) -> RuleStore {
        RuleStore::new(temp_dir.path().join("rules.json"))
    }

    #[test]
    fn test_add_commands_persist() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        run_cli(
            Command::AddExtension {
                extension: "pdf".into(),
                folder: "docs".into(),
            },
            &store,
        )
        .unwrap();
        run_cli(
            Command::AddAge {
                days: 3,
                folder: "recent".into(),
            },
            &store,
        )
        .unwrap();

        let rules = store.load().unwrap();
        assert_eq!(rules.extensions.get(".pdf"), Some("docs"));
        assert_eq!(rules.age_ranges.get("3-0"), Some("recent"));
    }

    #[test]
    fn test_invalid_rule_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        store.save(&RuleSet::default()).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        let result = run_cli(
            Command::AddRegex {
                pattern: "[unclosed".into(),
                folder: "x".into(),
            },
            &store,
        );

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_remove_unknown_rule_fails() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        let result = run_cli(
            Command::Remove {
                section: Section::Regex,
                pattern: "nothing".into(),
            },
            &store,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_tree_settings() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);

        run_cli(
            Command::TreeSettings {
                enable: true,
                disable: false,
                max_depth: Some(3),
                unbounded: false,
            },
            &store,
        )
        .unwrap();
        let rules = store.load().unwrap();
        assert!(rules.generate_tree);
        assert_eq!(rules.tree_max_depth, Some(3));

        run_cli(
            Command::TreeSettings {
                enable: false,
                disable: true,
                max_depth: None,
                unbounded: true,
            },
            &store,
        )
        .unwrap();
        let rules = store.load().unwrap();
        assert!(!rules.generate_tree);
        assert_eq!(rules.tree_max_depth, None);
    }

    #[test]
    fn test_tree_command_rejects_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = save_snapshot(
            &temp_dir.path().join("missing"),
            &temp_dir.path().join("tree.txt"),
            None,
        );
        assert!(result.is_err());
    }
}
