//! Composition tree builder

use super::{ChildResource, ClusterCompositions, CompositionSnapshot, CompositionTreeNode, TOP_LEVEL};
use crate::catalog::RelationshipCatalog;
use crate::cluster::{ClusterClient, object};
use crate::graph::ResourceRef;
use crate::matcher::reference_of;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Outcome of one namespace sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub namespace: String,
    /// Composition kinds that could be listed
    pub kinds: usize,
    pub stored: usize,
    pub purged: usize,
}

/// Builds composition trees from owner references
pub struct CompositionBuilder<'a> {
    catalog: &'a RelationshipCatalog,
    cluster: &'a dyn ClusterClient,
}

impl<'a> CompositionBuilder<'a> {
    pub fn new(catalog: &'a RelationshipCatalog, cluster: &'a dyn ClusterClient) -> Self {
        Self { catalog, cluster }
    }

    /// Flat tree nodes under one top-level instance
    ///
    /// Each (kind, name) is expanded at most once, so ownership cycles in a
    /// malformed cluster cannot loop.
    pub async fn build_tree(&self, kind: &str, root: &Value) -> Vec<CompositionTreeNode> {
        let namespace = object::namespace(root).to_string();
        let mut tree = Vec::new();
        let mut visited: HashSet<(String, String)> = HashSet::new();
        let mut stack = vec![(kind.to_string(), object::name(root).to_string(), TOP_LEVEL)];

        while let Some((parent_kind, parent_name, level)) = stack.pop() {
            if !visited.insert((parent_kind.clone(), parent_name.clone())) {
                continue;
            }

            let mut next = Vec::new();
            for child_kind in self.catalog.composition_children(&parent_kind) {
                let candidates = match self.cluster.list_objects(child_kind, &namespace).await {
                    Ok(candidates) => candidates,
                    Err(e) => {
                        tracing::warn!("Failed to list {} in {}: {}", child_kind, namespace, e);
                        continue;
                    }
                };

                let children: Vec<ChildResource> = candidates
                    .iter()
                    .filter(|c| object::is_owned_by(c, &parent_kind, &parent_name))
                    .map(|c| ChildResource::owned_by(c, &parent_kind, &parent_name))
                    .collect();
                if children.is_empty() {
                    continue;
                }

                for child in &children {
                    next.push((child_kind.clone(), child.name.clone(), level + 1));
                }
                tree.push(CompositionTreeNode {
                    level: level + 1,
                    child_kind: child_kind.clone(),
                    parent_kind: parent_kind.clone(),
                    parent_name: parent_name.clone(),
                    children,
                });
            }

            stack.extend(next.into_iter().rev());
        }

        tree
    }

    /// Rebuild every composition in `namespace` into `store`, then purge vanished ones
    pub async fn build_namespace(&self, namespace: &str, store: &ClusterCompositions) -> RefreshSummary {
        let mut summary = RefreshSummary {
            namespace: namespace.to_string(),
            ..Default::default()
        };
        let mut listed_kinds = Vec::new();
        let mut present: HashSet<ResourceRef> = HashSet::new();

        for kind in self.catalog.composition_kinds() {
            let instances = match self.cluster.list_objects(&kind, namespace).await {
                Ok(instances) => instances,
                Err(e) => {
                    tracing::warn!("Failed to list {} in {}: {}", kind, namespace, e);
                    continue;
                }
            };

            for instance in &instances {
                let tree = self.build_tree(&kind, instance).await;
                present.insert(reference_of(&kind, instance));
                store.store(CompositionSnapshot::new(&kind, instance, tree));
                summary.stored += 1;
            }
            listed_kinds.push(kind);
        }

        summary.kinds = listed_kinds.len();
        summary.purged = store.purge(namespace, &listed_kinds, &present);
        tracing::debug!(
            "Composition sweep of {}: {} stored, {} purged",
            namespace,
            summary.stored,
            summary.purged
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{Instance, InMemoryCluster};
    use serde_json::json;

    fn owned(kind: &str, name: &str, owner_kind: &str, owner: &str) -> Value {
        json!({
            "kind": kind,
            "metadata": {
                "name": name,
                "namespace": "default",
                "ownerReferences": [{"apiVersion": "apps/v1", "kind": owner_kind, "name": owner}]
            }
        })
    }

    fn cluster() -> InMemoryCluster {
        InMemoryCluster::with_objects(vec![
            json!({"kind": "Deployment", "metadata": {"name": "d1", "namespace": "default"}}),
            owned("ReplicaSet", "rs1", "Deployment", "d1"),
            owned("Pod", "p1", "ReplicaSet", "rs1"),
            owned("Pod", "p2", "ReplicaSet", "rs1"),
            owned("Pod", "stray", "ReplicaSet", "other"),
        ])
    }

    #[tokio::test]
    async fn test_build_tree_follows_owner_references() {
        let cluster = cluster();
        let catalog = RelationshipCatalog::builtin();
        let builder = CompositionBuilder::new(&catalog, &cluster);
        let root = json!({"kind": "Deployment", "metadata": {"name": "d1", "namespace": "default"}});

        let tree = builder.build_tree("Deployment", &root).await;
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].child_kind, "ReplicaSet");
        assert_eq!(tree[0].level, 2);
        assert_eq!(tree[1].level, 3);
        assert_eq!(tree[1].child_kind, "Pod");
        assert_eq!(tree[1].parent_name, "rs1");
        let pods: Vec<&str> = tree[1].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(pods, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_owner_kind_must_match() {
        let cluster = InMemoryCluster::with_objects(vec![
            json!({"kind": "Deployment", "metadata": {"name": "web", "namespace": "default"}}),
            owned("ReplicaSet", "web-1", "StatefulSet", "web"),
        ]);
        let catalog = RelationshipCatalog::builtin();
        let builder = CompositionBuilder::new(&catalog, &cluster);
        let root = json!({"kind": "Deployment", "metadata": {"name": "web", "namespace": "default"}});
        assert!(builder.build_tree("Deployment", &root).await.is_empty());
    }

    #[tokio::test]
    async fn test_build_namespace_stores_and_purges() {
        let cluster = cluster();
        let catalog = RelationshipCatalog::builtin();
        let store = ClusterCompositions::new();

        let summary = CompositionBuilder::new(&catalog, &cluster)
            .build_namespace("default", &store)
            .await;
        // d1 and rs1 are both top-level instances of composition kinds
        assert_eq!(summary.stored, 2);
        assert_eq!(summary.purged, 0);
        assert_eq!(store.get_compositions("Deployment", &Instance::All, "default").len(), 1);

        assert!(cluster.remove("Deployment", "d1", "default"));
        let summary = CompositionBuilder::new(&catalog, &cluster)
            .build_namespace("default", &store)
            .await;
        assert_eq!(summary.purged, 1);
        assert!(store.get_compositions("Deployment", &Instance::All, "default").is_empty());
    }
}
