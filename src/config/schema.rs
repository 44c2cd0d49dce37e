//! Configuration schema definitions
//!
//! Defines the structure of configuration files using serde for serialization.

use crate::graph::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Namespace used when a command does not name one
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    /// Default rendering of connection graphs
    #[serde(default)]
    pub output: OutputFormat,

    /// Extra kind declarations merged over the built-in catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declarations_file: Option<PathBuf>,

    /// Read relationship annotations from installed CRDs
    #[serde(default = "default_true")]
    pub load_crd_declarations: bool,

    #[serde(default)]
    pub traversal: TraversalConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,
}

/// Connection walk configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TraversalConfig {
    /// Upper bound on one walk
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Entries per lookup cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Kinds listed in parallel before a walk
    #[serde(default = "default_prefetch_kinds")]
    pub prefetch_kinds: Vec<String>,

    /// Relation kinds never followed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored_relations: Vec<String>,
}

/// Composition refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_interval_seconds")]
    pub interval_seconds: u64,
}

// Default value functions
fn default_namespace() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_cache_capacity() -> usize {
    1024
}

fn default_prefetch_kinds() -> Vec<String> {
    vec![
        "Pod".to_string(),
        "Service".to_string(),
        "ReplicaSet".to_string(),
    ]
}

fn default_refresh_interval_seconds() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_namespace: default_namespace(),
            output: OutputFormat::default(),
            declarations_file: None,
            load_crd_declarations: default_true(),
            traversal: TraversalConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            cache_capacity: default_cache_capacity(),
            prefetch_kinds: default_prefetch_kinds(),
            ignored_relations: Vec::new(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_refresh_interval_seconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.default_namespace, "default");
        assert_eq!(config.output, OutputFormat::Tree);
        assert!(config.load_crd_declarations);
        assert_eq!(config.traversal.timeout_seconds, 60);
        assert_eq!(config.refresh.interval_seconds, 30);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("defaultNamespace"));
        assert!(yaml.contains("cacheCapacity"));
        assert!(!yaml.contains("declarationsFile"));
    }

    #[test]
    fn test_config_deserialization() {
        let yaml = r#"
defaultNamespace: shop
output: branches
traversal:
  timeoutSeconds: 5
  ignoredRelations: [annotation]
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.default_namespace, "shop");
        assert_eq!(config.output, OutputFormat::Branches);
        assert_eq!(config.traversal.timeout_seconds, 5);
        assert_eq!(config.traversal.cache_capacity, 1024);
        assert_eq!(config.traversal.ignored_relations, vec!["annotation"]);
        assert_eq!(config.refresh, RefreshConfig::default());
    }
}
