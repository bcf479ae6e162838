//! Configuration system for the linter
//!
//! Reads configuration from:
//! - `.sqlintrc.yaml` / `.sqlintrc.yml` / `.sqlintrc.json` (project-level)
//! - the same names in the home directory (user-level)

use crate::diagnostic::Severity;
use crate::rule::RuleMetadata;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Evaluate files and tree nodes in parallel (unset = true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,

    /// Number of parallel jobs (0 = auto-detect)
    pub jobs: usize,
}

impl EngineConfig {
    pub fn is_parallel(&self) -> bool {
        self.parallel.unwrap_or(true)
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,

    pub color: ColorMode,

    pub verbose: bool,

    /// Show the summary statistics in text output (unset = true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<bool>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: ColorMode::Auto,
            verbose: false,
            statistics: None,
        }
    }
}

impl OutputConfig {
    pub fn show_statistics(&self) -> bool {
        self.statistics.unwrap_or(true)
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Compact,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "compact" => Ok(OutputFormat::Compact),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// File handling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Include patterns, used when a directory is given on the command line
    pub include: Vec<String>,

    /// Exclude patterns
    pub exclude: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            include: vec![
                "**/*.cst.json".to_string(),
                "**/*.cst.yaml".to_string(),
                "**/*.cst.yml".to_string(),
            ],
            exclude: vec!["**/target/**".to_string(), "**/node_modules/**".to_string()],
        }
    }
}

impl FilesConfig {
    /// Check if a path matches any exclude pattern
    pub fn is_excluded(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.exclude.iter().any(|pattern| {
            globset::Glob::new(pattern)
                .map(|glob| glob.compile_matcher().is_match(path_str.as_ref()))
                .unwrap_or(false)
        })
    }
}

/// Rule configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Disabled rules (ids or names)
    pub disabled: Vec<String>,

    /// Enabled rules (empty = all)
    pub enabled: Vec<String>,

    /// Severity overrides (rule id or name -> severity)
    pub severity: HashMap<String, Severity>,

    /// Per-file rule ignores (glob pattern -> rule ids)
    pub per_file: HashMap<String, Vec<String>>,
}

/// Inline `-- noqa` handling
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NoqaConfig {
    /// Honor noqa comments (unset = true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl NoqaConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Other configuration files to inherit from
    pub extends: Vec<String>,

    pub engine: EngineConfig,

    pub output: OutputConfig,

    pub files: FilesConfig,

    pub rules: RulesConfig,

    pub noqa: NoqaConfig,
}

impl Config {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_depth(path, 0)
    }

    /// Load with recursion depth limit (to prevent infinite loops)
    fn load_with_depth(path: &Path, depth: usize) -> Result<Self, ConfigError> {
        const MAX_DEPTH: usize = 10;
        if depth >= MAX_DEPTH {
            return Err(ConfigError::Invalid(
                "Maximum config inheritance depth exceeded".to_string(),
            ));
        }

        let content = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let mut config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        if !config.extends.is_empty() {
            let base_dir = path.parent().unwrap_or(Path::new("."));
            let mut base_config = Self::default();

            for extend in &config.extends {
                let extend_path = if Path::new(extend).is_absolute() {
                    PathBuf::from(extend)
                } else {
                    base_dir.join(extend)
                };
                base_config.merge(Self::load_with_depth(&extend_path, depth + 1)?);
            }

            base_config.merge(config);
            config = base_config;
        }

        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        if other.engine.jobs != 0 {
            self.engine.jobs = other.engine.jobs;
        }
        if other.engine.parallel.is_some() {
            self.engine.parallel = other.engine.parallel;
        }

        if other.output.format != OutputFormat::Text {
            self.output.format = other.output.format;
        }
        if other.output.verbose {
            self.output.verbose = true;
        }
        if other.output.color != ColorMode::Auto {
            self.output.color = other.output.color;
        }
        if other.output.statistics.is_some() {
            self.output.statistics = other.output.statistics;
        }

        extend_unique(&mut self.files.include, other.files.include);
        extend_unique(&mut self.files.exclude, other.files.exclude);

        self.rules.disabled.extend(other.rules.disabled);
        if !other.rules.enabled.is_empty() {
            self.rules.enabled = other.rules.enabled;
        }
        self.rules.severity.extend(other.rules.severity);
        for (pattern, rules) in other.rules.per_file {
            self.rules.per_file.entry(pattern).or_default().extend(rules);
        }

        if other.noqa.enabled.is_some() {
            self.noqa.enabled = other.noqa.enabled;
        }
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_names = [".sqlintrc.yaml", ".sqlintrc.yml", ".sqlintrc.json"];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            for name in &config_names {
                let path = home.join(name);
                if path.exists() {
                    return Self::load(&path);
                }
            }
        }

        Ok(Self::default())
    }

    /// Merge CLI arguments into configuration
    pub fn merge_cli(
        &mut self,
        format: Option<OutputFormat>,
        verbose: Option<bool>,
        jobs: Option<usize>,
        disabled_rules: Option<Vec<String>>,
        enabled_rules: Option<Vec<String>>,
    ) {
        if let Some(f) = format {
            self.output.format = f;
        }
        if let Some(v) = verbose {
            self.output.verbose = v;
        }
        if let Some(j) = jobs {
            self.engine.jobs = j;
        }
        if let Some(disabled) = disabled_rules {
            self.rules.disabled.extend(disabled);
        }
        if let Some(enabled) = enabled_rules {
            self.rules.enabled = enabled;
        }
    }

    /// Check if a rule is enabled
    pub fn is_rule_enabled(&self, rule: &RuleMetadata) -> bool {
        if self.rules.disabled.iter().any(|r| rule.is_named(r)) {
            return false;
        }
        self.rules.enabled.is_empty() || self.rules.enabled.iter().any(|r| rule.is_named(r))
    }

    /// Get severity override for a rule
    pub fn get_severity_override(&self, rule: &RuleMetadata) -> Option<Severity> {
        self.rules
            .severity
            .iter()
            .find(|(reference, _)| rule.is_named(reference))
            .map(|(_, severity)| *severity)
    }

    /// Check if a rule should be ignored for a file
    pub fn should_ignore_rule_for_file(&self, rule: &RuleMetadata, file_path: &Path) -> bool {
        let file_str = file_path.to_string_lossy();

        for (pattern, rules) in &self.rules.per_file {
            if let Ok(glob) = globset::Glob::new(pattern) {
                let matcher = glob.compile_matcher();
                if matcher.is_match(file_str.as_ref())
                    && rules.iter().any(|r| r == "all" || rule.is_named(r))
                {
                    return true;
                }
            }
        }

        false
    }
}

fn extend_unique(target: &mut Vec<String>, items: Vec<String>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l006() -> RuleMetadata {
        RuleMetadata::new("L006", "operator-spacing", "desc")
    }

    #[test]
    fn test_default_config() {
        let config = Config::new();
        assert!(config.engine.is_parallel());
        assert_eq!(config.engine.jobs, 0);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.output.show_statistics());
        assert!(config.noqa.is_enabled());
        assert!(!config.files.include.is_empty());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "compact".parse::<OutputFormat>().unwrap(),
            OutputFormat::Compact
        );
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_config_merge_cli() {
        let mut config = Config::new();
        config.merge_cli(
            Some(OutputFormat::Json),
            Some(true),
            Some(4),
            Some(vec!["L006".to_string()]),
            None,
        );

        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.verbose);
        assert_eq!(config.engine.jobs, 4);
        assert!(!config.is_rule_enabled(&l006()));
    }

    #[test]
    fn test_rule_enabled_by_id_or_name() {
        let mut config = Config::new();
        assert!(config.is_rule_enabled(&l006()));

        config.rules.enabled = vec!["operator-spacing".to_string()];
        assert!(config.is_rule_enabled(&l006()));

        config.rules.enabled = vec!["L039".to_string()];
        assert!(!config.is_rule_enabled(&l006()));

        config.rules.enabled.clear();
        config.rules.disabled = vec!["l006".to_string()];
        assert!(!config.is_rule_enabled(&l006()));
    }

    #[test]
    fn test_severity_override() {
        let mut config = Config::new();
        config
            .rules
            .severity
            .insert("operator-spacing".to_string(), Severity::Error);

        assert_eq!(config.get_severity_override(&l006()), Some(Severity::Error));
        let other = RuleMetadata::new("L039", "unnecessary-whitespace", "desc");
        assert_eq!(config.get_severity_override(&other), None);
    }

    #[test]
    fn test_per_file_ignore() {
        let mut config = Config::new();
        config
            .rules
            .per_file
            .insert("**/legacy/**".to_string(), vec!["L006".to_string()]);

        assert!(config.should_ignore_rule_for_file(&l006(), Path::new("db/legacy/old.sql")));
        assert!(!config.should_ignore_rule_for_file(&l006(), Path::new("db/new.sql")));
    }

    #[test]
    fn test_excluded_files() {
        let config = Config::new();
        assert!(config
            .files
            .is_excluded(Path::new("project/target/debug/x.cst.json")));
        assert!(!config.files.is_excluded(Path::new("project/sql/x.cst.json")));
    }

    #[test]
    fn test_yaml_deserialize() {
        let yaml = r#"
engine:
  parallel: false
  jobs: 4
output:
  format: compact
rules:
  disabled:
    - L039
  severity:
    L006: error
noqa:
  enabled: false
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(!config.engine.is_parallel());
        assert_eq!(config.engine.jobs, 4);
        assert_eq!(config.output.format, OutputFormat::Compact);
        assert_eq!(config.rules.disabled, vec!["L039".to_string()]);
        assert_eq!(config.get_severity_override(&l006()), Some(Severity::Error));
        assert!(!config.noqa.is_enabled());
    }

    #[test]
    fn test_extends() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.yaml"),
            "rules:\n  disabled: [L039]\nengine:\n  jobs: 2\n",
        )
        .unwrap();
        let child = dir.path().join(".sqlintrc.yaml");
        std::fs::write(
            &child,
            "extends: [base.yaml]\nrules:\n  severity:\n    L006: info\n",
        )
        .unwrap();

        let config = Config::load(&child).unwrap();
        assert_eq!(config.rules.disabled, vec!["L039".to_string()]);
        assert_eq!(config.engine.jobs, 2);
        assert_eq!(config.get_severity_override(&l006()), Some(Severity::Info));
    }

    #[test]
    fn test_extends_keeps_base_toggles_the_child_leaves_unset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.yaml"),
            "engine:\n  parallel: false\nnoqa:\n  enabled: false\noutput:\n  statistics: false\n",
        )
        .unwrap();
        let child = dir.path().join(".sqlintrc.yaml");
        std::fs::write(&child, "extends: [base.yaml]\nengine:\n  jobs: 3\n").unwrap();

        let config = Config::load(&child).unwrap();
        assert!(!config.engine.is_parallel());
        assert!(!config.noqa.is_enabled());
        assert!(!config.output.show_statistics());
        assert_eq!(config.engine.jobs, 3);

        std::fs::write(&child, "extends: [base.yaml]\nnoqa:\n  enabled: true\n").unwrap();
        let config = Config::load(&child).unwrap();
        assert!(config.noqa.is_enabled());
        assert!(!config.engine.is_parallel());
    }

    #[test]
    fn test_unknown_config_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqlint.toml");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
    }
}
