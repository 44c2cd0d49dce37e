//! Layered configuration
//!
//! Built-in defaults, the root config file, an explicit `--config` file and
//! environment overrides, merged in that order.

mod defaults;
pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::Config;

use crate::graph::OutputFormat;
use anyhow::Context;
use std::path::PathBuf;

fn join_list(items: &[String]) -> String {
    items.join(",")
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Get a configuration value by key (dot notation)
pub fn get_config_value(config: &schema::Config, key: &str) -> anyhow::Result<String> {
    match key {
        "defaultNamespace" => Ok(config.default_namespace.clone()),
        "output" => Ok(config.output.as_str().to_string()),
        "declarationsFile" => Ok(config
            .declarations_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()),
        "loadCrdDeclarations" => Ok(config.load_crd_declarations.to_string()),
        "traversal.timeoutSeconds" => Ok(config.traversal.timeout_seconds.to_string()),
        "traversal.cacheCapacity" => Ok(config.traversal.cache_capacity.to_string()),
        "traversal.prefetchKinds" => Ok(join_list(&config.traversal.prefetch_kinds)),
        "traversal.ignoredRelations" => Ok(join_list(&config.traversal.ignored_relations)),
        "refresh.intervalSeconds" => Ok(config.refresh.interval_seconds.to_string()),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}

/// Set a configuration value by key (dot notation)
pub fn set_config_value(config: &mut schema::Config, key: &str, value: &str) -> anyhow::Result<()> {
    match key {
        "defaultNamespace" => {
            config.default_namespace = value.to_string();
        }
        "output" => {
            config.output = OutputFormat::parse(value).ok_or_else(|| {
                anyhow::anyhow!("output must be one of flat, branches, tree, json")
            })?;
        }
        "declarationsFile" => {
            config.declarations_file = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }
        "loadCrdDeclarations" => {
            config.load_crd_declarations = value
                .parse()
                .context("loadCrdDeclarations must be 'true' or 'false'")?;
        }
        "traversal.timeoutSeconds" => {
            config.traversal.timeout_seconds = value
                .parse()
                .context("traversal.timeoutSeconds must be a number")?;
        }
        "traversal.cacheCapacity" => {
            config.traversal.cache_capacity = value
                .parse()
                .context("traversal.cacheCapacity must be a number")?;
        }
        "traversal.prefetchKinds" => {
            config.traversal.prefetch_kinds = split_list(value);
        }
        "traversal.ignoredRelations" => {
            config.traversal.ignored_relations = split_list(value);
        }
        "refresh.intervalSeconds" => {
            config.refresh.interval_seconds = value
                .parse()
                .context("refresh.intervalSeconds must be a number")?;
        }
        _ => return Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_set_roundtrip_keys() {
        let mut config = Config::default();
        set_config_value(&mut config, "output", "JSON").unwrap();
        set_config_value(&mut config, "traversal.prefetchKinds", "Pod, Secret,").unwrap();
        set_config_value(&mut config, "refresh.intervalSeconds", "5").unwrap();

        assert_eq!(get_config_value(&config, "output").unwrap(), "json");
        assert_eq!(get_config_value(&config, "traversal.prefetchKinds").unwrap(), "Pod,Secret");
        assert_eq!(get_config_value(&config, "refresh.intervalSeconds").unwrap(), "5");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = Config::default();
        assert!(set_config_value(&mut config, "output", "yaml").is_err());
        assert!(set_config_value(&mut config, "traversal.timeoutSeconds", "soon").is_err());
        assert!(set_config_value(&mut config, "ui.skin", "dark").is_err());
        assert!(get_config_value(&config, "readOnly").is_err());
    }

    #[test]
    fn test_declarations_file_can_be_cleared() {
        let mut config = Config::default();
        set_config_value(&mut config, "declarationsFile", "/etc/kinds.yaml").unwrap();
        assert_eq!(get_config_value(&config, "declarationsFile").unwrap(), "/etc/kinds.yaml");
        set_config_value(&mut config, "declarationsFile", "").unwrap();
        assert!(config.declarations_file.is_none());
    }
}
