//! Configuration parsing and management.

use crate::error::ConfigError;
use quire_types::Backend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Extensions loaded when the config does not disable them
pub const DEFAULT_EXTENSIONS: &[&str] = &["core", "floats"];

/// Main configuration struct matching the quire.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: Backend,

    #[serde(default)]
    pub paths: PathsConfig,

    /// Render pool size; 0 uses the available parallelism
    #[serde(default)]
    pub workers: usize,

    /// Drop the default extension list; only `extensions` are loaded
    #[serde(default)]
    pub disable_defaults: bool,

    #[serde(default)]
    pub extensions: Vec<String>,

    /// Options per extension, validated against the extension's schema
    #[serde(default)]
    pub extension_config: BTreeMap<String, serde_yaml::Mapping>,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_source")]
    pub source: PathBuf,

    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_source() -> PathBuf {
    PathBuf::from("docs")
}

fn default_output() -> PathBuf {
    PathBuf::from("site")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            output: default_output(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            paths: PathsConfig::default(),
            workers: 0,
            disable_defaults: false,
            extensions: Vec::new(),
            extension_config: BTreeMap::new(),
            config_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        // An empty file is a valid, all-defaults config
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Get the source directory, resolved relative to config file
    pub fn source_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.source)
    }

    /// Get the output directory, resolved relative to config file
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.output)
    }

    /// Extension names to load, in order, with duplicates removed
    pub fn extension_names(&self) -> Vec<String> {
        let defaults = if self.disable_defaults {
            &[][..]
        } else {
            DEFAULT_EXTENSIONS
        };

        let mut names: Vec<String> = Vec::new();
        for name in defaults
            .iter()
            .map(|s| s.to_string())
            .chain(self.extensions.iter().cloned())
        {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Options configured for `extension`, if any
    pub fn options_for(&self, extension: &str) -> Option<&serde_yaml::Mapping> {
        self.extension_config.get(extension)
    }

    /// Resolve a path relative to the config file location
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(parent) = self.config_path.as_ref().and_then(|p| p.parent()) {
            parent.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.backend, Backend::Html);
        assert_eq!(config.paths.source, PathBuf::from("docs"));
        assert_eq!(config.workers, 0);
        assert_eq!(config.extension_names(), vec!["core", "floats"]);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
backend: latex
paths:
  source: pages
  output: build
workers: 3
extensions:
  - floats
  - extra
extension_config:
  core:
    smart_punctuation: false
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.backend, Backend::Latex);
        assert_eq!(config.workers, 3);
        assert_eq!(config.extension_names(), vec!["core", "floats", "extra"]);
        let core = config.options_for("core").unwrap();
        assert_eq!(
            core.get("smart_punctuation").and_then(|v| v.as_bool()),
            Some(false)
        );
    }

    #[test]
    fn test_disable_defaults() {
        let config = Config::from_yaml("disable_defaults: true\nextensions: [core]\n").unwrap();
        assert_eq!(config.extension_names(), vec!["core"]);
    }

    #[test]
    fn test_paths_relative_to_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quire.yml");
        std::fs::write(&path, "paths:\n  source: notes\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.source_dir(), dir.path().join("notes"));
        assert_eq!(config.output_dir(), dir.path().join("site"));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(matches!(
            Config::from_yaml("backend: pdf\n"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let config = Config::from_yaml("paths:\n  output: out\n").unwrap();
        assert_eq!(config.paths.source, PathBuf::from("docs"));
        assert_eq!(config.paths.output, PathBuf::from("out"));
        assert_eq!(config.extension_names(), vec!["core", "floats"]);
    }
}
