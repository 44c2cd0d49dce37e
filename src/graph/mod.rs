//! Connection graph data structures
//!
//! Nodes live in an arena indexed by their (kind, name, namespace) identity.
//! Each node keeps one primary peer edge (the edge it was discovered
//! through) while the adjacency map records every edge observed during the
//! walk.

pub mod render;
pub mod walker;

pub use render::{OutputFormat, render};
pub use walker::{ConnectionWalker, MissingResourcePolicy, WalkOptions};

use crate::catalog::RelationKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identity of a concrete resource instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: String,
    pub name: String,
    pub namespace: String,
}

impl ResourceRef {
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Edge from a node back to the node it was reached from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerEdge {
    pub peer: ResourceRef,
    pub relation: RelationKind,
    pub details: String,
}

/// A node of the connection graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Hop distance from the root, the shortest seen
    pub level: usize,
    pub kind: String,
    pub name: String,
    pub namespace: String,
    pub owner_kind: Option<String>,
    pub owner_name: Option<String>,
    /// None only for the root
    pub peer: Option<PeerEdge>,
}

impl Connection {
    pub fn root(reference: &ResourceRef) -> Self {
        Self {
            level: 0,
            kind: reference.kind.clone(),
            name: reference.name.clone(),
            namespace: reference.namespace.clone(),
            owner_kind: None,
            owner_name: None,
            peer: None,
        }
    }

    /// A node discovered from `peer` at `level`
    pub fn discovered(reference: &ResourceRef, level: usize, peer: PeerEdge) -> Self {
        Self {
            level,
            kind: reference.kind.clone(),
            name: reference.name.clone(),
            namespace: reference.namespace.clone(),
            owner_kind: None,
            owner_name: None,
            peer: Some(peer),
        }
    }

    pub fn key(&self) -> ResourceRef {
        ResourceRef::new(&self.kind, &self.name, &self.namespace)
    }

    pub fn relation(&self) -> Option<RelationKind> {
        self.peer.as_ref().map(|p| p.relation)
    }

    pub fn details(&self) -> &str {
        self.peer.as_ref().map(|p| p.details.as_str()).unwrap_or("")
    }
}

/// Identity comparison: kind, name and namespace, level excluded
pub fn same_node(a: &Connection, b: &Connection) -> bool {
    a.kind == b.kind && a.name == b.name && a.namespace == b.namespace
}

/// Result of merging a candidate node into the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First time this node was seen; it should be expanded
    Discovered,
    /// Already known; its level or peer edge may have been tightened
    Merged,
    /// The candidate is the root itself
    Ignored,
}

/// Leveled, peer-annotated graph produced by one walk
#[derive(Debug, Clone)]
pub struct ConnectionGraph {
    root: ResourceRef,
    nodes: Vec<Connection>,
    index: HashMap<ResourceRef, usize>,
    adjacency: HashMap<ResourceRef, Vec<PeerEdge>>,
}

impl ConnectionGraph {
    pub fn new(root: ResourceRef) -> Self {
        let mut index = HashMap::new();
        index.insert(root.clone(), 0);
        Self {
            nodes: vec![Connection::root(&root)],
            root,
            index,
            adjacency: HashMap::new(),
        }
    }

    /// Insert a candidate node or merge it into the existing one
    ///
    /// Merging keeps the minimum level. The stored peer edge is kept unless
    /// the candidate sits at level 1, in which case its edge replaces it.
    pub fn record_or_update(&mut self, candidate: Connection) -> MergeOutcome {
        let key = candidate.key();
        if key == self.root {
            return MergeOutcome::Ignored;
        }

        if let Some(edge) = &candidate.peer {
            if edge.peer == key {
                return MergeOutcome::Ignored;
            }
            let edges = self.adjacency.entry(key.clone()).or_default();
            if !edges.contains(edge) {
                edges.push(edge.clone());
            }
        }

        match self.index.get(&key) {
            Some(&idx) => {
                let existing = &mut self.nodes[idx];
                if candidate.level < existing.level {
                    tracing::debug!(
                        "Lowering level of {} from {} to {}",
                        key,
                        existing.level,
                        candidate.level
                    );
                    existing.level = candidate.level;
                }
                if candidate.level == 1 && candidate.peer.is_some() {
                    existing.peer = candidate.peer;
                }
                MergeOutcome::Merged
            }
            None => {
                self.index.insert(key, self.nodes.len());
                self.nodes.push(candidate);
                MergeOutcome::Discovered
            }
        }
    }

    /// Record the immediate owner of a node
    pub fn set_owner(&mut self, key: &ResourceRef, owner_kind: &str, owner_name: &str) {
        if let Some(&idx) = self.index.get(key) {
            let node = &mut self.nodes[idx];
            node.owner_kind = Some(owner_kind.to_string());
            node.owner_name = Some(owner_name.to_string());
        }
    }

    pub fn root(&self) -> &ResourceRef {
        &self.root
    }

    /// All nodes in discovery order, root first
    pub fn nodes(&self) -> &[Connection] {
        &self.nodes
    }

    pub fn get(&self, key: &ResourceRef) -> Option<&Connection> {
        self.index.get(key).map(|&idx| &self.nodes[idx])
    }

    pub fn contains(&self, key: &ResourceRef) -> bool {
        self.index.contains_key(key)
    }

    pub fn level_of(&self, key: &ResourceRef) -> Option<usize> {
        self.get(key).map(|node| node.level)
    }

    /// Every edge observed into `key`, in observation order
    pub fn edges_of(&self, key: &ResourceRef) -> &[PeerEdge] {
        self.adjacency.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Flat, serializable node list
    pub fn to_output(&self) -> Vec<ConnectionOutput> {
        self.nodes.iter().map(ConnectionOutput::from).collect()
    }
}

/// Serializable view of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionOutput {
    pub level: usize,
    pub kind: String,
    pub name: String,
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<RelationKind>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub relation_details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
}

impl From<&Connection> for ConnectionOutput {
    fn from(conn: &Connection) -> Self {
        Self {
            level: conn.level,
            kind: conn.kind.clone(),
            name: conn.name.clone(),
            namespace: conn.namespace.clone(),
            relation_type: conn.relation(),
            relation_details: conn.details().to_string(),
            peer_kind: conn.peer.as_ref().map(|p| p.peer.kind.clone()),
            peer_name: conn.peer.as_ref().map(|p| p.peer.name.clone()),
            peer_namespace: conn.peer.as_ref().map(|p| p.peer.namespace.clone()),
            owner_kind: conn.owner_kind.clone(),
            owner_name: conn.owner_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(peer: &ResourceRef, relation: RelationKind) -> PeerEdge {
        PeerEdge {
            peer: peer.clone(),
            relation,
            details: String::new(),
        }
    }

    #[test]
    fn test_new_graph_has_root_only() {
        let root = ResourceRef::new("Service", "web", "default");
        let graph = ConnectionGraph::new(root.clone());
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.level_of(&root), Some(0));
        assert!(graph.nodes()[0].peer.is_none());
    }

    #[test]
    fn test_root_is_never_recorded_again() {
        let root = ResourceRef::new("Service", "web", "default");
        let pod = ResourceRef::new("Pod", "web-1", "default");
        let mut graph = ConnectionGraph::new(root.clone());
        let outcome = graph.record_or_update(Connection::discovered(
            &root,
            2,
            edge(&pod, RelationKind::Label),
        ));
        assert_eq!(outcome, MergeOutcome::Ignored);
        assert!(graph.nodes()[0].peer.is_none());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_self_edges_are_ignored() {
        let root = ResourceRef::new("Service", "web", "default");
        let pod = ResourceRef::new("Pod", "web-1", "default");
        let mut graph = ConnectionGraph::new(root);
        let outcome =
            graph.record_or_update(Connection::discovered(&pod, 1, edge(&pod, RelationKind::Label)));
        assert_eq!(outcome, MergeOutcome::Ignored);
        assert!(!graph.contains(&pod));
    }

    #[test]
    fn test_merge_keeps_minimum_level() {
        let root = ResourceRef::new("Deployment", "web", "default");
        let a = ResourceRef::new("ReplicaSet", "web-1", "default");
        let b = ResourceRef::new("Service", "web", "default");
        let x = ResourceRef::new("Pod", "web-1-x", "default");
        let mut graph = ConnectionGraph::new(root);

        assert_eq!(
            graph.record_or_update(Connection::discovered(&x, 4, edge(&b, RelationKind::Label))),
            MergeOutcome::Discovered
        );
        assert_eq!(
            graph.record_or_update(Connection::discovered(
                &x,
                2,
                edge(&a, RelationKind::OwnerReference)
            )),
            MergeOutcome::Merged
        );
        assert_eq!(graph.level_of(&x), Some(2));
        // Not a level-1 rediscovery, so the first edge stays
        assert_eq!(graph.get(&x).unwrap().peer.as_ref().unwrap().peer, b);
        assert_eq!(graph.edges_of(&x).len(), 2);

        graph.record_or_update(Connection::discovered(&x, 6, edge(&a, RelationKind::Label)));
        assert_eq!(graph.level_of(&x), Some(2));
    }

    #[test]
    fn test_level_one_rediscovery_replaces_peer() {
        let root = ResourceRef::new("Service", "web", "default");
        let other = ResourceRef::new("Ingress", "web", "default");
        let pod = ResourceRef::new("Pod", "web-1", "default");
        let mut graph = ConnectionGraph::new(root.clone());

        graph.record_or_update(Connection::discovered(&pod, 3, edge(&other, RelationKind::Label)));
        graph.record_or_update(Connection::discovered(&pod, 1, edge(&root, RelationKind::Label)));

        let node = graph.get(&pod).unwrap();
        assert_eq!(node.level, 1);
        assert_eq!(node.peer.as_ref().unwrap().peer, root);
    }

    #[test]
    fn test_same_node_ignores_level() {
        let pod = ResourceRef::new("Pod", "web-1", "default");
        let svc = ResourceRef::new("Service", "web", "default");
        let a = Connection::discovered(&pod, 1, edge(&svc, RelationKind::Label));
        let b = Connection::discovered(&pod, 5, edge(&svc, RelationKind::Annotation));
        assert!(same_node(&a, &b));
        assert!(!same_node(&a, &Connection::root(&svc)));
    }

    #[test]
    fn test_output_carries_peer_fields() {
        let root = ResourceRef::new("Service", "web", "default");
        let pod = ResourceRef::new("Pod", "web-1", "default");
        let mut graph = ConnectionGraph::new(root);
        graph.record_or_update(Connection::discovered(
            &pod,
            1,
            PeerEdge {
                peer: ResourceRef::new("Service", "web", "default"),
                relation: RelationKind::Label,
                details: "app:web".to_string(),
            },
        ));
        graph.set_owner(&pod, "ReplicaSet", "web-abc");

        let output = graph.to_output();
        assert_eq!(output.len(), 2);
        assert_eq!(output[1].relation_type, Some(RelationKind::Label));
        assert_eq!(output[1].peer_name.as_deref(), Some("web"));
        assert_eq!(output[1].owner_kind.as_deref(), Some("ReplicaSet"));
        assert!(output[0].relation_type.is_none());
    }
}
