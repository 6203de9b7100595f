//! Engine configuration with multi-source merging.
//!
//! Precedence, lowest to highest: built-in defaults, project file
//! (`aperture.toml`), local overrides (`aperture.local.toml`, gitignored),
//! `APERTURE_*` environment variables.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use aperture_evaluator::ResolutionPolicy;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How ambiguous evaluator matches are treated.
    pub resolution: ResolutionPolicy,

    /// Whether grant/deny decisions and visibility commits are logged.
    pub audit: Audit,
}

/// Audit logging switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Audit {
    pub enabled: bool,
}

impl Default for Audit {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Configuration loader with builder pattern.
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    /// Creates a loader rooted at the current directory.
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "APERTURE".to_string(),
        }
    }

    /// Sets the project directory.
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Sets the environment variable prefix (default: "APERTURE").
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Loads configuration from all sources with proper precedence.
    pub fn load(self) -> Result<EngineConfig> {
        let mut builder = config::Config::builder();

        // 1. Built-in defaults
        builder = builder.add_source(config::Config::try_from(&EngineConfig::default())?);

        // 2. Project config (aperture.toml)
        let project_file = self.project_dir.join("aperture.toml");
        if project_file.exists() {
            builder = builder.add_source(
                config::File::from(project_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 3. Local config (aperture.local.toml, gitignored)
        let local_file = self.project_dir.join("aperture.local.toml");
        if local_file.exists() {
            builder = builder.add_source(
                config::File::from(local_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 4. Environment variables (APERTURE_*)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .separator("_")
                .try_parsing(true),
        );

        let merged = builder.build().context("Failed to build configuration")?;
        merged
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Loads configuration or returns defaults if loading fails.
    pub fn load_or_default(self) -> EngineConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = ConfigLoader::new()
            .with_project_dir(temp_dir.path())
            .load()
            .expect("Failed to load config");

        assert_eq!(config.resolution, ResolutionPolicy::Strict);
        assert!(config.audit.enabled);
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        fs::write(
            temp_dir.path().join("aperture.toml"),
            r#"
resolution = "nearest"

[audit]
enabled = false
"#,
        )
        .expect("Failed to write config");

        let config = ConfigLoader::new()
            .with_project_dir(temp_dir.path())
            .load()
            .expect("Failed to load config");

        assert_eq!(config.resolution, ResolutionPolicy::Nearest);
        assert!(!config.audit.enabled);
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        fs::write(
            temp_dir.path().join("aperture.toml"),
            "resolution = \"strict\"\n",
        )
        .expect("Failed to write project config");
        fs::write(
            temp_dir.path().join("aperture.local.toml"),
            "resolution = \"nearest\"\n",
        )
        .expect("Failed to write local config");

        let config = ConfigLoader::new()
            .with_project_dir(temp_dir.path())
            .load()
            .expect("Failed to load config");

        assert_eq!(config.resolution, ResolutionPolicy::Nearest);
    }

    #[test]
    fn test_load_or_default_on_missing_dir() {
        let config = ConfigLoader::new()
            .with_project_dir("/nonexistent/aperture-test")
            .load_or_default();

        assert_eq!(config, EngineConfig::default());
    }
}
