//! Loading and persisting the rule configuration.
//!
//! The configuration is a JSON document (see [`crate::rules`] for its
//! layout). `endwith` and `contains` are required; every other key is
//! optional. Saves hold an exclusive lock on a `<name>.lock` sidecar and
//! write a temporary sibling file that is renamed into place, so readers
//! only ever see a complete document.

use crate::rules::{RuleSet, Section};
use fs2::FileExt;
use log::{error, info, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default configuration file name, relative to the working directory.
pub const DEFAULT_RULES_FILE: &str = "rules.json";

/// Errors that can occur while loading, saving or editing rules.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigMissing(PathBuf),
    /// Unparsable document, or a required section is missing.
    ConfigMalformed { path: PathBuf, reason: String },
    /// A size range, age or regex literal failed to parse.
    InvalidRuleSyntax {
        section: Section,
        pattern: String,
        reason: String,
    },
    /// IO error while reading or writing a configuration file.
    IoError { path: PathBuf, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigMissing(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigMalformed { path, reason } => {
                write!(f, "Invalid configuration {}: {}", path.display(), reason)
            }
            ConfigError::InvalidRuleSyntax {
                section,
                pattern,
                reason,
            } => write!(f, "Invalid {} rule '{}': {}", section, pattern, reason),
            ConfigError::IoError { path, reason } => {
                write!(f, "IO error on {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Reads and writes a [`RuleSet`] at a fixed path.
#[derive(Debug, Clone)]
pub struct RuleStore {
    path: PathBuf,
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new(DEFAULT_RULES_FILE)
    }
}

impl RuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sidecar file locked while the configuration is being written.
    pub fn lock_path(&self) -> PathBuf {
        sibling_path(&self.path, ".lock")
    }

    /// Loads the active configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigMissing` if the file does not exist.
    /// Returns `ConfigError::ConfigMalformed` if the JSON is invalid or lacks
    /// the `endwith`/`contains` sections.
    pub fn load(&self) -> ConfigResult<RuleSet> {
        read_rules(&self.path)
    }

    /// Loads the active configuration, substituting an empty [`RuleSet`] on
    /// any failure.
    pub fn load_or_default(&self) -> RuleSet {
        match self.load() {
            Ok(rules) => rules,
            Err(ConfigError::ConfigMissing(path)) => {
                info!("No rules at {}, starting with an empty set", path.display());
                RuleSet::default()
            }
            Err(e) => {
                error!("Error loading rules: {}", e);
                RuleSet::default()
            }
        }
    }

    /// Persists `rules` as the active configuration.
    pub fn save(&self, rules: &RuleSet) -> ConfigResult<()> {
        write_rules(rules, &self.path)
    }

    /// Writes `rules` to an arbitrary destination.
    pub fn export(&self, rules: &RuleSet, destination: &Path) -> ConfigResult<()> {
        write_rules(rules, destination)?;
        info!("Configuration exported to: {}", destination.display());
        Ok(())
    }

    /// Reads a configuration from `source`, validates it and makes it the
    /// active one. The active file is left untouched if validation fails.
    pub fn import(&self, source: &Path) -> ConfigResult<RuleSet> {
        let rules = read_rules(source)?;
        rules.validate()?;
        self.save(&rules)?;
        info!("Configuration imported from: {}", source.display());
        Ok(rules)
    }
}

fn read_rules(path: &Path) -> ConfigResult<RuleSet> {
    if !path.exists() {
        return Err(ConfigError::ConfigMissing(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    serde_json::from_str(&content).map_err(|e| ConfigError::ConfigMalformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn write_rules(rules: &RuleSet, path: &Path) -> ConfigResult<()> {
    let io_error = |e: std::io::Error| ConfigError::IoError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let json = serde_json::to_string_pretty(rules).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        reason: format!("JSON serialization failed: {}", e),
    })?;

    // Held until the end of the function; serializes concurrent writers.
    // The target itself is never opened, so it only changes on rename.
    let lock_path = sibling_path(path, ".lock");
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(io_error)?;
    lock.lock_exclusive().map_err(io_error)?;

    let tmp_path = sibling_path(path, &format!(".{}.tmp", std::process::id()));
    let result = (|| {
        let mut tmp = fs::File::create(&tmp_path)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() && tmp_path.exists() {
        if let Err(e) = fs::remove_file(&tmp_path) {
            warn!("Could not remove {}: {}", tmp_path.display(), e);
        }
    }
    if let Err(e) = FileExt::unlock(&lock) {
        warn!("Could not release lock on {}: {}", lock_path.display(), e);
    }

    result.map_err(io_error)
}

/// `rules.json` + `suffix`, next to `path`.
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| DEFAULT_RULES_FILE.into());
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_rules() -> RuleSet {
        let mut rules = RuleSet::default();
        rules.add_extension("pdf", "docs").unwrap();
        rules.add_substring("invoice", "billing").unwrap();
        rules.add_size_range("0-1", "small").unwrap();
        rules.add_age_range(7, "recent").unwrap();
        rules.add_regex(".*_backup.*", "backups").unwrap();
        rules.generate_tree = true;
        rules.tree_max_depth = Some(2);
        rules
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = RuleStore::new(temp_dir.path().join("rules.json"));

        assert!(matches!(store.load(), Err(ConfigError::ConfigMissing(_))));
        assert_eq!(store.load_or_default(), RuleSet::default());
    }

    #[test]
    fn test_load_requires_both_sections() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.json");
        fs::write(&path, r#"{"endwith": {".pdf": "docs"}, "regex": {}}"#).unwrap();
        let store = RuleStore::new(&path);

        assert!(matches!(
            store.load(),
            Err(ConfigError::ConfigMalformed { .. })
        ));
        assert_eq!(store.load_or_default(), RuleSet::default());
    }

    #[test]
    fn test_load_invalid_json_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(RuleStore::new(&path).load_or_default(), RuleSet::default());
    }

    #[test]
    fn test_optional_sections_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.json");
        fs::write(&path, r#"{"endwith": {}, "contains": {"x": "y"}}"#).unwrap();

        let rules = RuleStore::new(&path).load().unwrap();
        assert!(rules.size_ranges.is_empty());
        assert!(rules.age_ranges.is_empty());
        assert!(rules.regex.is_empty());
        assert!(!rules.generate_tree);
        assert_eq!(rules.tree_max_depth, None);
        assert_eq!(rules.substrings.get("x"), Some("y"));
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = RuleStore::new(temp_dir.path().join("rules.json"));
        let rules = sample_rules();

        store.save(&rules).unwrap();
        assert_eq!(store.load().unwrap(), rules);

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {:?}", leftovers);
    }

    #[test]
    fn test_save_locks_sidecar_not_target() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.json");
        let store = RuleStore::new(&path);

        // A failed first save must not leave an empty document behind.
        fs::create_dir(temp_dir.path().join(format!("rules.json.{}.tmp", std::process::id())))
            .unwrap();
        assert!(store.save(&sample_rules()).is_err());
        assert!(!path.exists());
        assert!(temp_dir.path().join("rules.json.lock").exists());
    }

    #[test]
    fn test_concurrent_saves_leave_valid_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.json");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let mut rules = RuleSet::default();
                    rules.add_substring(&format!("writer{}", i), "out").unwrap();
                    RuleStore::new(path).save(&rules)
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let rules = RuleStore::new(&path).load().unwrap();
        assert_eq!(rules.substrings.len(), 1);
    }

    #[test]
    fn test_saved_document_uses_original_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = RuleStore::new(temp_dir.path().join("rules.json"));
        store.save(&sample_rules()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(value["endwith"][".pdf"], "docs");
        assert_eq!(value["contains"]["invoice"], "billing");
        assert_eq!(value["date_ranges"]["7-0"], "recent");
        assert_eq!(value["tree_max_depth"], 2);
    }

    #[test]
    fn test_import_replaces_active_config() {
        let temp_dir = TempDir::new().unwrap();
        let store = RuleStore::new(temp_dir.path().join("rules.json"));
        store.save(&RuleSet::default()).unwrap();

        let source = temp_dir.path().join("shared.json");
        RuleStore::new(&source).save(&sample_rules()).unwrap();

        let imported = store.import(&source).unwrap();
        assert_eq!(imported, sample_rules());
        assert_eq!(store.load().unwrap(), sample_rules());
    }

    #[test]
    fn test_import_rejects_invalid_and_keeps_active() {
        let temp_dir = TempDir::new().unwrap();
        let store = RuleStore::new(temp_dir.path().join("rules.json"));
        store.save(&sample_rules()).unwrap();

        let missing_section = temp_dir.path().join("bad.json");
        fs::write(&missing_section, r#"{"endwith": {}}"#).unwrap();
        assert!(store.import(&missing_section).is_err());

        let bad_regex = temp_dir.path().join("bad_regex.json");
        fs::write(&bad_regex, r#"{"endwith": {}, "contains": {}, "regex": {"(": "x"}}"#).unwrap();
        assert!(matches!(
            store.import(&bad_regex),
            Err(ConfigError::InvalidRuleSyntax { .. })
        ));

        assert_eq!(store.load().unwrap(), sample_rules());
    }

    #[test]
    fn test_export_writes_destination() {
        let temp_dir = TempDir::new().unwrap();
        let store = RuleStore::new(temp_dir.path().join("rules.json"));
        let destination = temp_dir.path().join("export.json");

        store.export(&sample_rules(), &destination).unwrap();
        assert_eq!(RuleStore::new(&destination).load().unwrap(), sample_rules());
    }
}
