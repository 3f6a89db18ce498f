//! Rule sections and typed rule literals.
//!
//! A [`RuleSet`] holds five independent sections. Each section is an ordered
//! list of `(pattern, folder)` pairs, and classifiers try the rules of a
//! section in exactly that order: the first applicable rule claims the file.
//!
//! # Configuration File Format
//!
//! ```json
//! {
//!     "endwith": { ".pdf": "docs" },
//!     "contains": { "invoice": "billing" },
//!     "size_ranges": { "0-10": "small" },
//!     "date_ranges": { "7-0": "this_week" },
//!     "regex": { ".*_backup.*": "backups" },
//!     "generate_tree": false,
//!     "tree_max_depth": null
//! }
//! ```
//!
//! Object order in the document is the rule order.

use crate::config::ConfigError;
use chrono::{DateTime, Local, TimeDelta};
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Size-range bounds are expressed in megabytes of this many bytes.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Identifies one rule section of a [`RuleSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Exact suffix match, e.g. `.pdf`.
    Extension,
    /// Text occurring anywhere in the file name.
    Substring,
    /// Inclusive `min-max` range in megabytes.
    SizeRange,
    /// Modified within the last N days (`N-0`).
    AgeRange,
    /// Unanchored regular expression over the file name.
    Regex,
}

impl Section {
    /// All sections, in classification order.
    pub const ALL: [Section; 5] = [
        Section::Extension,
        Section::Substring,
        Section::SizeRange,
        Section::AgeRange,
        Section::Regex,
    ];

    /// The key this section is stored under in the configuration document.
    pub fn key(&self) -> &'static str {
        match self {
            Section::Extension => "endwith",
            Section::Substring => "contains",
            Section::SizeRange => "size_ranges",
            Section::AgeRange => "date_ranges",
            Section::Regex => "regex",
        }
    }

    /// Human-readable section title.
    pub fn label(&self) -> &'static str {
        match self {
            Section::Extension => "Extension rules",
            Section::Substring => "Substring rules",
            Section::SizeRange => "Size rules (MB)",
            Section::AgeRange => "Age rules (days)",
            Section::Regex => "Regex rules",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "extension" | "ext" | "endwith" => Ok(Section::Extension),
            "substring" | "contains" => Ok(Section::Substring),
            "size" | "size_ranges" => Ok(Section::SizeRange),
            "age" | "date" | "date_ranges" => Ok(Section::AgeRange),
            "regex" => Ok(Section::Regex),
            other => Err(format!(
                "unknown rule section '{}': expected extension, substring, size, age or regex",
                other
            )),
        }
    }
}

/// A single `(pattern, folder)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: String,
    pub folder: String,
}

/// An ordered list of rules with unique patterns.
///
/// Re-inserting an existing pattern replaces its folder without moving it,
/// so the first insertion fixes a rule's position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSection {
    rules: Vec<Rule>,
}

impl RuleSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a rule, returning the folder it previously mapped to.
    pub fn insert(&mut self, pattern: impl Into<String>, folder: impl Into<String>) -> Option<String> {
        let pattern = pattern.into();
        let folder = folder.into();
        match self.rules.iter_mut().find(|rule| rule.pattern == pattern) {
            Some(existing) => Some(std::mem::replace(&mut existing.folder, folder)),
            None => {
                self.rules.push(Rule { pattern, folder });
                None
            }
        }
    }

    /// Removes a rule, returning the folder it mapped to.
    pub fn remove(&mut self, pattern: &str) -> Option<String> {
        let index = self.rules.iter().position(|rule| rule.pattern == pattern)?;
        Some(self.rules.remove(index).folder)
    }

    pub fn get(&self, pattern: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.pattern == pattern)
            .map(|rule| rule.folder.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSection {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl<P: Into<String>, F: Into<String>> FromIterator<(P, F)> for RuleSection {
    fn from_iter<I: IntoIterator<Item = (P, F)>>(iter: I) -> Self {
        let mut section = RuleSection::new();
        for (pattern, folder) in iter {
            section.insert(pattern, folder);
        }
        section
    }
}

impl Serialize for RuleSection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rules.len()))?;
        for rule in &self.rules {
            map.serialize_entry(&rule.pattern, &rule.folder)?;
        }
        map.end()
    }
}

struct RuleSectionVisitor;

impl<'de> Visitor<'de> for RuleSectionVisitor {
    type Value = RuleSection;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object mapping patterns to folder names")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut section = RuleSection::new();
        while let Some((pattern, folder)) = access.next_entry::<String, String>()? {
            section.insert(pattern, folder);
        }
        Ok(section)
    }
}

impl<'de> Deserialize<'de> for RuleSection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RuleSectionVisitor)
    }
}

/// Inclusive size bounds in megabytes, written `min-max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeRange {
    pub min_mb: u64,
    pub max_mb: u64,
}

impl SizeRange {
    pub fn min_bytes(&self) -> u64 {
        self.min_mb.saturating_mul(BYTES_PER_MB)
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_mb.saturating_mul(BYTES_PER_MB)
    }

    /// Returns true if `bytes` lies within the range, bounds included.
    pub fn contains(&self, bytes: u64) -> bool {
        self.min_bytes() <= bytes && bytes <= self.max_bytes()
    }
}

impl FromStr for SizeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (min, max) = s
            .split_once('-')
            .ok_or_else(|| "expected min-max in megabytes".to_string())?;
        let min_mb = min
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("invalid minimum '{}': {}", min.trim(), e))?;
        let max_mb = max
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("invalid maximum '{}': {}", max.trim(), e))?;
        if min_mb > max_mb {
            return Err(format!("minimum {} exceeds maximum {}", min_mb, max_mb));
        }
        Ok(Self { min_mb, max_mb })
    }
}

impl fmt::Display for SizeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min_mb, self.max_mb)
    }
}

/// "Modified within the last `days` days", written `days-0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeRange {
    pub days: u64,
}

impl AgeRange {
    pub fn new(days: u64) -> Self {
        Self { days }
    }

    /// Returns true if `modified` is at or after `now - days`.
    ///
    /// A cutoff too far in the past to represent matches everything.
    pub fn is_recent(&self, modified: DateTime<Local>, now: DateTime<Local>) -> bool {
        let cutoff = i64::try_from(self.days)
            .ok()
            .and_then(TimeDelta::try_days)
            .and_then(|delta| now.checked_sub_signed(delta));
        match cutoff {
            Some(cutoff) => modified >= cutoff,
            None => true,
        }
    }
}

impl FromStr for AgeRange {
    type Err = String;

    /// Only the day count before the first `-` is read; the tail is ignored,
    /// so `7`, `7-` and `7-0` are the same rule.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let days = s.split('-').next().unwrap_or_default().trim();
        let days = days
            .parse::<u64>()
            .map_err(|e| format!("invalid day count '{}': {}", days, e))?;
        Ok(Self { days })
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-0", self.days)
    }
}

/// Compiles a regex rule pattern, returning the compile error as text.
pub fn compile_pattern(pattern: &str) -> Result<Regex, String> {
    Regex::new(pattern).map_err(|e| e.to_string())
}

/// The complete rule configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(rename = "endwith")]
    pub extensions: RuleSection,

    #[serde(rename = "contains")]
    pub substrings: RuleSection,

    #[serde(default)]
    pub size_ranges: RuleSection,

    #[serde(rename = "date_ranges", default)]
    pub age_ranges: RuleSection,

    #[serde(default)]
    pub regex: RuleSection,

    /// Write `directory_tree.txt` after organizing.
    #[serde(default)]
    pub generate_tree: bool,

    /// Depth bound for the tree snapshot; `None` is unbounded.
    #[serde(default)]
    pub tree_max_depth: Option<usize>,
}

impl RuleSet {
    pub fn section(&self, section: Section) -> &RuleSection {
        match section {
            Section::Extension => &self.extensions,
            Section::Substring => &self.substrings,
            Section::SizeRange => &self.size_ranges,
            Section::AgeRange => &self.age_ranges,
            Section::Regex => &self.regex,
        }
    }

    fn section_mut(&mut self, section: Section) -> &mut RuleSection {
        match section {
            Section::Extension => &mut self.extensions,
            Section::Substring => &mut self.substrings,
            Section::SizeRange => &mut self.size_ranges,
            Section::AgeRange => &mut self.age_ranges,
            Section::Regex => &mut self.regex,
        }
    }

    /// Adds an extension rule; a missing leading dot is prepended.
    pub fn add_extension(&mut self, extension: &str, folder: &str) -> Result<(), ConfigError> {
        require_non_empty(Section::Extension, extension, folder)?;
        self.extensions.insert(normalize_extension(extension), folder);
        Ok(())
    }

    pub fn add_substring(&mut self, text: &str, folder: &str) -> Result<(), ConfigError> {
        require_non_empty(Section::Substring, text, folder)?;
        self.substrings.insert(text, folder);
        Ok(())
    }

    /// Adds a `min-max` megabyte range rule, stored in canonical form.
    pub fn add_size_range(&mut self, range: &str, folder: &str) -> Result<(), ConfigError> {
        require_non_empty(Section::SizeRange, range, folder)?;
        let parsed = range
            .parse::<SizeRange>()
            .map_err(|reason| invalid(Section::SizeRange, range, reason))?;
        self.size_ranges.insert(parsed.to_string(), folder);
        Ok(())
    }

    pub fn add_age_range(&mut self, days: u64, folder: &str) -> Result<(), ConfigError> {
        let key = AgeRange::new(days).to_string();
        require_non_empty(Section::AgeRange, &key, folder)?;
        self.age_ranges.insert(key, folder);
        Ok(())
    }

    /// Adds a regex rule after checking that the pattern compiles.
    pub fn add_regex(&mut self, pattern: &str, folder: &str) -> Result<(), ConfigError> {
        require_non_empty(Section::Regex, pattern, folder)?;
        compile_pattern(pattern).map_err(|reason| invalid(Section::Regex, pattern, reason))?;
        self.regex.insert(pattern, folder);
        Ok(())
    }

    /// Removes a rule from `section`, returning its folder.
    ///
    /// Extensions may be given without their dot and age rules as a bare
    /// day count, mirroring how they are added.
    pub fn remove(&mut self, section: Section, pattern: &str) -> Option<String> {
        let rules = self.section_mut(section);
        match section {
            Section::Extension => rules.remove(&normalize_extension(pattern)),
            Section::AgeRange if !pattern.contains('-') => rules
                .remove(pattern)
                .or_else(|| rules.remove(&format!("{}-0", pattern.trim()))),
            _ => rules.remove(pattern),
        }
    }

    /// Checks every size, age and regex key for syntax errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for rule in &self.size_ranges {
            rule.pattern
                .parse::<SizeRange>()
                .map_err(|reason| invalid(Section::SizeRange, &rule.pattern, reason))?;
        }
        for rule in &self.age_ranges {
            rule.pattern
                .parse::<AgeRange>()
                .map_err(|reason| invalid(Section::AgeRange, &rule.pattern, reason))?;
        }
        for rule in &self.regex {
            compile_pattern(&rule.pattern)
                .map_err(|reason| invalid(Section::Regex, &rule.pattern, reason))?;
        }
        Ok(())
    }

    /// Total number of rules across all sections.
    pub fn rule_count(&self) -> usize {
        Section::ALL.iter().map(|s| self.section(*s).len()).sum()
    }
}

/// Prepends a dot to an extension that lacks one.
pub fn normalize_extension(extension: &str) -> String {
    let extension = extension.trim();
    if extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{}", extension)
    }
}

fn require_non_empty(section: Section, pattern: &str, folder: &str) -> Result<(), ConfigError> {
    if pattern.trim().is_empty() {
        return Err(invalid(section, pattern, "pattern must not be empty".to_string()));
    }
    if folder.trim().is_empty() {
        return Err(invalid(section, pattern, "folder must not be empty".to_string()));
    }
    Ok(())
}

fn invalid(section: Section, pattern: &str, reason: String) -> ConfigError {
    ConfigError::InvalidRuleSyntax {
        section,
        pattern: pattern.to_string(),
        reason,
    }
}
