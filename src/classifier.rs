//! Classification strategies.
//!
//! Each [`Classifier`] owns the rules of one section and maps a file to at
//! most one destination folder. Within a classifier the first applicable
//! rule wins. Rules whose stored literal no longer parses are skipped with a
//! warning when the classifier is built.

use crate::file_organizer::FileEntry;
use crate::rules::{AgeRange, Rule, RuleSection, RuleSet, Section, SizeRange, compile_pattern};
use chrono::{DateTime, Local};
use log::warn;
use regex::Regex;

/// Maps a file to the folder it belongs in, if any.
pub trait Classifier {
    /// The rule section this classifier evaluates.
    fn section(&self) -> Section;

    /// Returns the destination folder for `entry`, or `None` to leave it.
    fn classify(&self, entry: &FileEntry) -> Option<&str>;
}

/// Exact suffix match (`.pdf`), case-sensitive.
#[derive(Debug, Clone)]
pub struct ExtensionClassifier {
    rules: RuleSection,
}

impl ExtensionClassifier {
    pub fn new(rules: &RuleSection) -> Self {
        Self {
            rules: rules.clone(),
        }
    }
}

impl Classifier for ExtensionClassifier {
    fn section(&self) -> Section {
        Section::Extension
    }

    fn classify(&self, entry: &FileEntry) -> Option<&str> {
        let suffix = entry.suffix()?;
        self.rules.get(&suffix)
    }
}

/// Matches text anywhere in the file name.
#[derive(Debug, Clone)]
pub struct SubstringClassifier {
    rules: Vec<Rule>,
}

impl SubstringClassifier {
    pub fn new(rules: &RuleSection) -> Self {
        Self {
            rules: rules.iter().cloned().collect(),
        }
    }

    /// A classifier for one substring rule.
    pub fn single(rule: &Rule) -> Self {
        Self {
            rules: vec![rule.clone()],
        }
    }
}

impl Classifier for SubstringClassifier {
    fn section(&self) -> Section {
        Section::Substring
    }

    fn classify(&self, entry: &FileEntry) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| entry.name.contains(rule.pattern.as_str()))
            .map(|rule| rule.folder.as_str())
    }
}

/// Inclusive megabyte ranges against the file size.
#[derive(Debug, Clone)]
pub struct SizeRangeClassifier {
    ranges: Vec<(SizeRange, String)>,
}

impl SizeRangeClassifier {
    pub fn new(rules: &RuleSection) -> Self {
        Self {
            ranges: parse_rules(Section::SizeRange, rules, |p| p.parse::<SizeRange>()),
        }
    }
}

impl Classifier for SizeRangeClassifier {
    fn section(&self) -> Section {
        Section::SizeRange
    }

    fn classify(&self, entry: &FileEntry) -> Option<&str> {
        self.ranges
            .iter()
            .find(|(range, _)| range.contains(entry.size))
            .map(|(_, folder)| folder.as_str())
    }
}

/// Files modified within the last N days.
#[derive(Debug, Clone)]
pub struct AgeRangeClassifier {
    ranges: Vec<(AgeRange, String)>,
    now: DateTime<Local>,
}

impl AgeRangeClassifier {
    pub fn new(rules: &RuleSection) -> Self {
        Self::with_now(rules, Local::now())
    }

    /// Evaluates cutoffs relative to `now` instead of the current time.
    pub fn with_now(rules: &RuleSection, now: DateTime<Local>) -> Self {
        Self {
            ranges: parse_rules(Section::AgeRange, rules, |p| p.parse::<AgeRange>()),
            now,
        }
    }
}

impl Classifier for AgeRangeClassifier {
    fn section(&self) -> Section {
        Section::AgeRange
    }

    fn classify(&self, entry: &FileEntry) -> Option<&str> {
        self.ranges
            .iter()
            .find(|(age, _)| age.is_recent(entry.modified, self.now))
            .map(|(_, folder)| folder.as_str())
    }
}

/// Unanchored regex search over the file name.
#[derive(Debug, Clone)]
pub struct RegexClassifier {
    patterns: Vec<(Regex, String)>,
}

impl RegexClassifier {
    pub fn new(rules: &RuleSection) -> Self {
        Self {
            patterns: parse_rules(Section::Regex, rules, compile_pattern),
        }
    }
}

impl Classifier for RegexClassifier {
    fn section(&self) -> Section {
        Section::Regex
    }

    fn classify(&self, entry: &FileEntry) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(regex, _)| regex.is_match(&entry.name))
            .map(|(_, folder)| folder.as_str())
    }
}

/// Builds the classification stages for `rules` in priority order:
/// extension, one stage per substring rule, size, age, regex.
pub fn pipeline(rules: &RuleSet) -> Vec<Box<dyn Classifier>> {
    let mut stages: Vec<Box<dyn Classifier>> = vec![Box::new(ExtensionClassifier::new(&rules.extensions))];
    for rule in &rules.substrings {
        stages.push(Box::new(SubstringClassifier::single(rule)));
    }
    stages.push(Box::new(SizeRangeClassifier::new(&rules.size_ranges)));
    stages.push(Box::new(AgeRangeClassifier::new(&rules.age_ranges)));
    stages.push(Box::new(RegexClassifier::new(&rules.regex)));
    stages
}

fn parse_rules<T, F>(section: Section, rules: &RuleSection, parse: F) -> Vec<(T, String)>
where
    F: Fn(&str) -> Result<T, String>,
{
    rules
        .iter()
        .filter_map(|rule| match parse(&rule.pattern) {
            Ok(parsed) => Some((parsed, rule.folder.clone())),
            Err(reason) => {
                warn!(
                    "Skipping {} rule '{}': {}",
                    section, rule.pattern, reason
                );
                None
            }
        })
        .collect()
}
