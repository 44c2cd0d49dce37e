//! Cluster access abstraction
//!
//! Everything that talks to a cluster goes through [`ClusterClient`]. The live
//! implementation lives in [`crate::kube`]; [`InMemoryCluster`] serves
//! snapshots and tests; [`CachedCluster`] wraps either for the lifetime of
//! one query.

pub mod cache;
pub mod memory;
pub mod object;

pub use cache::CachedCluster;
pub use memory::InMemoryCluster;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Cluster access errors
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("no API details registered for kind {0}")]
    UnknownKind(String),

    #[error("request for {kind} failed: {source}")]
    Request {
        kind: String,
        #[source]
        source: kube::Error,
    },

    #[error("{kind} is unavailable: {reason}")]
    Unavailable { kind: String, reason: String },
}

/// Read access to cluster objects
///
/// Both operations try a namespaced lookup first and fall back to a
/// cluster-scoped lookup. `get_object` returns `Ok(None)` when the object
/// is absent in both scopes, which is distinct from a transport error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn get_object(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Value>, ClusterError>;

    async fn list_objects(&self, kind: &str, namespace: &str) -> Result<Vec<Value>, ClusterError>;
}

/// An instance selector: one named instance or every instance (`*`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instance {
    All,
    Named(String),
}

impl Instance {
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            "*" | "" => Instance::All,
            name => Instance::Named(name.to_string()),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Instance::All => true,
            Instance::Named(wanted) => wanted == name,
        }
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instance::All => f.write_str("*"),
            Instance::Named(name) => f.write_str(name),
        }
    }
}

/// Fetch the objects an instance selector refers to
///
/// Failures are logged and treated as "nothing found".
pub async fn select_objects(
    cluster: &dyn ClusterClient,
    kind: &str,
    instance: &Instance,
    namespace: &str,
) -> Vec<Value> {
    match instance {
        Instance::All => match cluster.list_objects(kind, namespace).await {
            Ok(objects) => objects,
            Err(e) => {
                tracing::warn!("Failed to list {} in {}: {}", kind, namespace, e);
                Vec::new()
            }
        },
        Instance::Named(name) => match cluster.get_object(kind, name, namespace).await {
            Ok(Some(object)) => vec![object],
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to fetch {}/{} in {}: {}", kind, name, namespace, e);
                Vec::new()
            }
        },
    }
}
