//! filesorter - rule-based file organization
//!
//! This library relocates the files of a directory into subfolders chosen by
//! ordered rules (extension, substring, size range, modification age,
//! regex), and renders box-drawing snapshots of directory trees.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod file_organizer;
pub mod organize;
pub mod output;
pub mod rules;
pub mod tree;

pub use classifier::{
    AgeRangeClassifier, Classifier, ExtensionClassifier, RegexClassifier, SizeRangeClassifier,
    SubstringClassifier,
};
pub use config::{ConfigError, RuleStore};
pub use file_organizer::{FileEntry, FileOrganizer, OrganizeError};
pub use organize::{OrganizeReport, organize, organize_with_rules};
pub use rules::{RuleSection, RuleSet, Section};
pub use tree::{render_tree, save_tree};

pub use cli::{Command, run_cli};
