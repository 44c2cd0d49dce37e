//! Configuration loading and merging logic
//!
//! Handles loading configuration from multiple sources and merging them
//! according to precedence rules.

use super::{
    defaults, paths,
    schema::{Config, RefreshConfig, TraversalConfig},
};
use crate::catalog::{RelationKind, load_declarations_file};
use crate::graph::OutputFormat;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. Explicit config file (`--config`)
    /// 3. Root config
    /// 4. Built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let mut config = Self::load_defaults();

        if let Ok(root_config) = Self::load_file(&paths::root_config_path()) {
            config = Self::merge_config(config, root_config);
        }

        // An explicitly requested file must exist and parse
        if let Some(path) = explicit {
            let explicit_config = Self::load_file(path)?;
            config = Self::merge_config(config, explicit_config);
        }

        config = Self::apply_env_overrides(config);

        Ok(config)
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration by loading and checking for errors
    ///
    /// Fails on invalid YAML, zero timeouts or capacities, unknown relation
    /// names and an unreadable declarations file.
    pub fn validate(explicit: Option<&Path>) -> Result<()> {
        let root_path = paths::root_config_path();
        if root_path.exists() {
            Self::load_file(&root_path)?;
        }

        let config = Self::load(explicit).context("Failed to load merged configuration")?;

        if config.traversal.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("traversal.timeoutSeconds must be greater than 0"));
        }
        if config.traversal.cache_capacity == 0 {
            return Err(anyhow::anyhow!("traversal.cacheCapacity must be greater than 0"));
        }
        if config.refresh.interval_seconds == 0 {
            return Err(anyhow::anyhow!("refresh.intervalSeconds must be greater than 0"));
        }
        for name in &config.traversal.ignored_relations {
            name.parse::<RelationKind>()
                .with_context(|| format!("Invalid entry in traversal.ignoredRelations: {}", name))?;
        }
        if let Some(path) = &config.declarations_file {
            load_declarations_file(path)?;
        }

        Ok(())
    }

    /// Load default configuration
    pub fn load_defaults() -> Config {
        defaults::default_config()
    }

    /// Merge two configurations, with `other` taking precedence
    fn merge_config(base: Config, other: Config) -> Config {
        Config {
            default_namespace: other.default_namespace,
            output: other.output,
            declarations_file: other.declarations_file.or(base.declarations_file),
            load_crd_declarations: other.load_crd_declarations,
            traversal: TraversalConfig {
                timeout_seconds: other.traversal.timeout_seconds,
                cache_capacity: other.traversal.cache_capacity,
                prefetch_kinds: other.traversal.prefetch_kinds,
                ignored_relations: other.traversal.ignored_relations,
            },
            refresh: RefreshConfig {
                interval_seconds: other.refresh.interval_seconds,
            },
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: Config) -> Config {
        if let Ok(namespace) = std::env::var("KUBEDISCOVERY_NAMESPACE") {
            config.default_namespace = namespace;
        }

        if let Ok(output) = std::env::var("KUBEDISCOVERY_OUTPUT") {
            match OutputFormat::parse(&output) {
                Some(format) => config.output = format,
                None => tracing::warn!("Ignoring invalid KUBEDISCOVERY_OUTPUT: {}", output),
            }
        }

        if let Ok(timeout) = std::env::var("KUBEDISCOVERY_TIMEOUT") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.traversal.timeout_seconds = val;
            }
        }

        // KIND_COMPOSITION_FILE is the older name
        if let Ok(file) = std::env::var("KIND_COMPOSITION_FILE") {
            config.declarations_file = Some(PathBuf::from(file));
        }
        if let Ok(file) = std::env::var("KUBEDISCOVERY_DECLARATIONS_FILE") {
            config.declarations_file = Some(PathBuf::from(file));
        }

        config
    }

    /// Save configuration to a file
    pub fn save(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)?;
        }

        let yaml =
            serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")?;

        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Save root configuration
    pub fn save_root(config: &Config) -> Result<()> {
        Self::save(config, &paths::root_config_path())
    }
}
