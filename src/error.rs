//! Errors surfaced by discovery queries

use crate::cluster::ClusterError;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("resource of kind {kind} named {name} in namespace {namespace} does not exist")]
    RootNotFound {
        kind: String,
        name: String,
        namespace: String,
    },

    #[error("unknown resource kind: {0}")]
    UnknownKind(String),

    #[error("discovery timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

impl DiscoveryError {
    pub fn root_not_found(kind: &str, name: &str, namespace: &str) -> Self {
        DiscoveryError::RootNotFound {
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DiscoveryError::RootNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_not_found_message() {
        let err = DiscoveryError::root_not_found("Pod", "ghost", "default");
        assert_eq!(
            err.to_string(),
            "resource of kind Pod named ghost in namespace default does not exist"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_cluster_error_is_transparent() {
        let err = DiscoveryError::from(ClusterError::UnknownKind("Widget".to_string()));
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("Widget"));
    }
}
