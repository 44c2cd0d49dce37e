//! Default configuration values

use super::schema::Config;

/// Get the default configuration
pub fn default_config() -> Config {
    Config::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = default_config();
        assert_eq!(config.default_namespace, "default");
        assert_eq!(config.traversal.prefetch_kinds, vec!["Pod", "Service", "ReplicaSet"]);
    }
}
