//! In-memory cluster snapshot
//!
//! Serves objects loaded from a file (a `kind: List` document, a JSON array or
//! multi-document YAML) or inserted directly. Used for offline runs against a
//! captured snapshot and throughout the tests.

use super::{ClusterClient, ClusterError, object};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::RwLock;

/// Cluster backed by a list of objects held in memory
#[derive(Default)]
pub struct InMemoryCluster {
    objects: RwLock<Vec<Value>>,
    unavailable: RwLock<HashSet<String>>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects(objects: Vec<Value>) -> Self {
        let cluster = Self::new();
        for obj in objects {
            cluster.insert(obj);
        }
        cluster
    }

    /// Load a snapshot file
    pub async fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Reading cluster snapshot from {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read snapshot file: {:?}", path))?;

        let objects = parse_snapshot(&content)
            .with_context(|| format!("Failed to parse snapshot file: {:?}", path))?;

        tracing::debug!("Loaded {} objects from {:?}", objects.len(), path);
        Ok(Self::with_objects(objects))
    }

    /// Insert an object, replacing any object with the same kind, name and namespace
    pub fn insert(&self, obj: Value) {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.retain(|existing| !same_object(existing, &obj));
        objects.push(obj);
    }

    /// Remove an object, returning whether it existed
    pub fn remove(&self, kind: &str, name: &str, namespace: &str) -> bool {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        let before = objects.len();
        objects.retain(|obj| {
            !(object::kind(obj) == kind
                && object::name(obj) == name
                && object::namespace(obj) == namespace)
        });
        objects.len() != before
    }

    /// Make every request for `kind` fail, simulating an inaccessible resource type
    pub fn set_unavailable(&self, kind: &str) {
        self.unavailable
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind.to_string());
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self, kind: &str) -> Result<(), ClusterError> {
        let unavailable = self.unavailable.read().unwrap_or_else(|e| e.into_inner());
        if unavailable.contains(kind) {
            return Err(ClusterError::Unavailable {
                kind: kind.to_string(),
                reason: "marked unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn get_object(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Value>, ClusterError> {
        self.check_available(kind)?;
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        let candidates = || {
            objects
                .iter()
                .filter(|obj| object::kind(obj) == kind && object::name(obj) == name)
        };

        // Namespaced lookup first, then cluster-scoped
        let found = candidates()
            .find(|obj| object::namespace(obj) == namespace)
            .or_else(|| candidates().find(|obj| object::namespace(obj).is_empty()));
        Ok(found.cloned())
    }

    async fn list_objects(&self, kind: &str, namespace: &str) -> Result<Vec<Value>, ClusterError> {
        self.check_available(kind)?;
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        Ok(objects
            .iter()
            .filter(|obj| object::kind(obj) == kind)
            .filter(|obj| {
                let ns = object::namespace(obj);
                namespace.is_empty() || ns.is_empty() || ns == namespace
            })
            .cloned()
            .collect())
    }
}

/// Parse snapshot content into a flat list of objects
pub fn parse_snapshot(content: &str) -> Result<Vec<Value>> {
    let mut objects = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document).context("Invalid snapshot document")?;
        flatten_into(value, &mut objects);
    }
    Ok(objects)
}

fn flatten_into(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        Value::Object(mut map) => {
            let is_list = map
                .get("kind")
                .and_then(|k| k.as_str())
                .is_some_and(|k| k.ends_with("List"));
            match map.remove("items") {
                Some(items @ Value::Array(_)) if is_list => flatten_into(items, out),
                Some(items) => {
                    map.insert("items".to_string(), items);
                    out.push(Value::Object(map));
                }
                None => out.push(Value::Object(map)),
            }
        }
        // Empty YAML documents deserialize as null
        _ => {}
    }
}

fn same_object(a: &Value, b: &Value) -> bool {
    object::kind(a) == object::kind(b)
        && object::name(a) == object::name(b)
        && object::namespace(a) == object::namespace(b)
}
