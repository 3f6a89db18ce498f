//! The organize pipeline.
//!
//! 1. Validate the target directory.
//! 2. Flatten: hoist the files of immediate subdirectories into the target.
//! 3. Run the classification stages in priority order, re-listing the
//!    directory before each stage so it only sees files still in the root.
//! 4. Optionally write `directory_tree.txt` into the target.
//!
//! Only an invalid target aborts the run. Every per-file failure is logged,
//! collected in the [`OrganizeReport`] and skipped.

use crate::classifier::{Classifier, pipeline};
use crate::config::RuleStore;
use crate::file_organizer::{FileEntry, FileOrganizer, Operation, OrganizeError, OrganizeResult};
use crate::rules::{RuleSet, Section};
use crate::tree::{SNAPSHOT_FILE_NAME, save_tree};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of one organize run.
#[derive(Debug, Default)]
pub struct OrganizeReport {
    /// Files hoisted out of immediate subdirectories.
    pub flattened: Vec<Operation>,
    /// Files relocated by a classifier, with the section that claimed them.
    pub moved: Vec<(Section, Operation)>,
    /// Non-fatal failures, in the order they happened.
    pub failures: Vec<OrganizeError>,
    /// The snapshot file, if one was written.
    pub tree_file: Option<PathBuf>,
}

impl OrganizeReport {
    /// Number of classified files per destination folder.
    pub fn folder_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for (_, op) in &self.moved {
            *counts.entry(op.folder.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Loads the rules at `rules_path` and organizes `directory` with them.
///
/// A missing or malformed configuration degrades to an empty rule set.
/// The configuration file itself is never relocated.
pub fn organize(directory: &Path, rules_path: &Path) -> OrganizeResult<OrganizeReport> {
    let rules = RuleStore::new(rules_path).load_or_default();
    run(directory, &rules, Some(rules_path))
}

/// Organizes `directory` with an already loaded rule set.
pub fn organize_with_rules(directory: &Path, rules: &RuleSet) -> OrganizeResult<OrganizeReport> {
    run(directory, rules, None)
}

fn run(directory: &Path, rules: &RuleSet, rules_path: Option<&Path>) -> OrganizeResult<OrganizeReport> {
    if !directory.is_dir() {
        let err = OrganizeError::InvalidDirectory {
            path: directory.to_path_buf(),
        };
        error!("{}", err);
        return Err(err);
    }

    info!("Organizing contents of: {}", directory.display());
    let mut report = OrganizeReport::default();
    let protected = protected_paths(directory, rules_path);

    match FileOrganizer::flatten_subdirectories(directory) {
        Ok((moved, failures)) => {
            report.flattened = moved;
            report.failures.extend(failures);
        }
        Err(e) => {
            error!("{}", e);
            report.failures.push(e);
        }
    }

    for stage in pipeline(rules) {
        run_stage(directory, stage.as_ref(), &protected, &mut report);
    }

    info!(
        "Organized {} file(s) in {} ({} failure(s))",
        report.moved.len(),
        directory.display(),
        report.failures.len()
    );

    if rules.generate_tree {
        let tree_file = directory.join(SNAPSHOT_FILE_NAME);
        if save_tree(directory, &tree_file, rules.tree_max_depth) {
            report.tree_file = Some(tree_file);
        }
    }

    Ok(report)
}

fn run_stage(
    directory: &Path,
    stage: &dyn Classifier,
    protected: &[PathBuf],
    report: &mut OrganizeReport,
) {
    let files = match FileOrganizer::list_files(directory) {
        Ok(files) => files,
        Err(e) => {
            error!("{}", e);
            report.failures.push(e);
            return;
        }
    };

    for file in files.iter().filter(|f| !is_protected(f, protected)) {
        let Some(folder) = stage.classify(file) else {
            continue;
        };
        match FileOrganizer::move_into(directory, &file.path, folder) {
            Ok(op) => report.moved.push((stage.section(), op)),
            Err(e) => {
                error!("Error moving file {}: {}", file.name, e);
                report.failures.push(e);
            }
        }
    }
}

/// Files in the target root that the pipeline must leave in place.
fn protected_paths(directory: &Path, rules_path: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = vec![directory.join(SNAPSHOT_FILE_NAME)];
    if let Some(rules_path) = rules_path {
        paths.push(rules_path.to_path_buf());
        paths.push(RuleStore::new(rules_path).lock_path());
    }
    paths
        .into_iter()
        .filter_map(|p| match fs::canonicalize(&p) {
            Ok(canonical) => Some(canonical),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Could not resolve {}: {}", p.display(), e);
                None
            }
        })
        .collect()
}

fn is_protected(file: &FileEntry, protected: &[PathBuf]) -> bool {
    !protected.is_empty()
        && fs::canonicalize(&file.path)
            .map(|canonical| protected.contains(&canonical))
            .unwrap_or(false)
}
