//! Composition trees
//!
//! A composition is the containment tree of a top-level resource, following
//! owner references along the child kinds its kind declares. Trees are built
//! per namespace sweep into a flat list of [`CompositionTreeNode`]s and
//! assembled into nested [`Composition`]s on read.

pub mod builder;
pub mod refresh;
pub mod store;

pub use builder::{CompositionBuilder, RefreshSummary};
pub use refresh::{CompositionRefresher, RefreshEvent};
pub use store::ClusterCompositions;

use crate::cluster::object;
use crate::graph::ResourceRef;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Level of a top-level resource; its direct children sit one below
pub const TOP_LEVEL: usize = 1;

/// Nested, serializable composition tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    pub level: usize,
    pub kind: String,
    pub name: String,
    pub namespace: String,
    pub status: String,
    pub children: Vec<Composition>,
}

impl Composition {
    /// Number of nodes in this tree, including itself
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Composition::size).sum::<usize>()
    }

    /// Indented text tree, two spaces per level below the top
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out);
        out
    }

    fn write_tree(&self, out: &mut String) {
        out.push_str(&"  ".repeat(self.level.saturating_sub(TOP_LEVEL)));
        out.push_str(&format!("{}/{}", self.kind, self.name));
        if !self.status.is_empty() {
            out.push_str(&format!(" ({})", self.status));
        }
        out.push('\n');
        for child in &self.children {
            child.write_tree(out);
        }
    }
}

/// A child resource matched under a parent during the build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildResource {
    pub name: String,
    pub namespace: String,
    pub status: String,
    pub owner_reference_kind: String,
    pub owner_reference_name: String,
    pub owner_reference_api_version: String,
}

impl ChildResource {
    /// Record `obj` as a child of `parent_kind/parent_name`
    pub fn owned_by(obj: &Value, parent_kind: &str, parent_name: &str) -> Self {
        let owner = object::owner_references(obj)
            .into_iter()
            .find(|o| o.kind == parent_kind && o.name == parent_name);
        Self {
            name: object::name(obj).to_string(),
            namespace: object::namespace(obj).to_string(),
            status: object::status_phase(obj),
            owner_reference_kind: parent_kind.to_string(),
            owner_reference_name: parent_name.to_string(),
            owner_reference_api_version: owner.map(|o| o.api_version).unwrap_or_default(),
        }
    }
}

/// Children of one kind found under one parent instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionTreeNode {
    /// Level of the children; the top-level resource is at [`TOP_LEVEL`]
    pub level: usize,
    pub child_kind: String,
    pub parent_kind: String,
    pub parent_name: String,
    pub children: Vec<ChildResource>,
}

/// Stored composition of one top-level resource
#[derive(Debug, Clone)]
pub struct CompositionSnapshot {
    pub kind: String,
    pub name: String,
    pub namespace: String,
    pub status: String,
    pub tree: Vec<CompositionTreeNode>,
    pub refreshed_at: DateTime<Utc>,
}

impl CompositionSnapshot {
    pub fn new(kind: &str, obj: &Value, tree: Vec<CompositionTreeNode>) -> Self {
        Self {
            kind: kind.to_string(),
            name: object::name(obj).to_string(),
            namespace: object::namespace(obj).to_string(),
            status: object::status_phase(obj),
            tree,
            refreshed_at: Utc::now(),
        }
    }

    pub fn reference(&self) -> ResourceRef {
        ResourceRef::new(&self.kind, &self.name, &self.namespace)
    }

    /// Assemble the nested tree
    ///
    /// Every child recorded under a parent is kept, so siblings sharing a
    /// level and kind each get their own subtree.
    pub fn assemble(&self) -> Composition {
        Composition {
            level: TOP_LEVEL,
            kind: self.kind.clone(),
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            status: self.status.clone(),
            children: self.children_of(&self.kind, &self.name, TOP_LEVEL),
        }
    }

    fn children_of(&self, parent_kind: &str, parent_name: &str, parent_level: usize) -> Vec<Composition> {
        self.tree
            .iter()
            .filter(|node| {
                node.level == parent_level + 1
                    && node.parent_kind == parent_kind
                    && node.parent_name == parent_name
            })
            .flat_map(|node| {
                node.children.iter().map(move |child| Composition {
                    level: node.level,
                    kind: node.child_kind.clone(),
                    name: child.name.clone(),
                    namespace: child.namespace.clone(),
                    status: child.status.clone(),
                    children: self.children_of(&node.child_kind, &child.name, node.level),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn child(name: &str, owner_kind: &str, owner: &str) -> ChildResource {
        ChildResource {
            name: name.to_string(),
            namespace: "default".to_string(),
            status: "Running".to_string(),
            owner_reference_kind: owner_kind.to_string(),
            owner_reference_name: owner.to_string(),
            owner_reference_api_version: "apps/v1".to_string(),
        }
    }

    fn snapshot() -> CompositionSnapshot {
        let deployment = json!({"kind": "Deployment", "metadata": {"name": "d1", "namespace": "default"}});
        CompositionSnapshot::new(
            "Deployment",
            &deployment,
            vec![
                CompositionTreeNode {
                    level: 2,
                    child_kind: "ReplicaSet".to_string(),
                    parent_kind: "Deployment".to_string(),
                    parent_name: "d1".to_string(),
                    children: vec![child("rs1", "Deployment", "d1"), child("rs2", "Deployment", "d1")],
                },
                CompositionTreeNode {
                    level: 3,
                    child_kind: "Pod".to_string(),
                    parent_kind: "ReplicaSet".to_string(),
                    parent_name: "rs1".to_string(),
                    children: vec![child("p1", "ReplicaSet", "rs1")],
                },
                CompositionTreeNode {
                    level: 3,
                    child_kind: "Pod".to_string(),
                    parent_kind: "ReplicaSet".to_string(),
                    parent_name: "rs2".to_string(),
                    children: vec![child("p2", "ReplicaSet", "rs2"), child("p3", "ReplicaSet", "rs2")],
                },
            ],
        )
    }

    #[test]
    fn test_assemble_keeps_sibling_fan_out() {
        let tree = snapshot().assemble();
        assert_eq!(tree.kind, "Deployment");
        assert_eq!(tree.level, 1);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].name, "rs1");
        assert_eq!(tree.children[0].children.len(), 1);
        assert_eq!(tree.children[1].children.len(), 2);
        assert_eq!(tree.children[1].children[1].name, "p3");
        assert_eq!(tree.children[1].children[1].level, 3);
        assert_eq!(tree.size(), 6);
    }

    #[test]
    fn test_render_tree_indents_children() {
        let rendered = snapshot().assemble().render_tree();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Deployment/d1");
        assert_eq!(lines[1], "  ReplicaSet/rs1 (Running)");
        assert_eq!(lines[2], "    Pod/p1 (Running)");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_child_resource_records_owner() {
        let pod = json!({
            "kind": "Pod",
            "metadata": {
                "name": "p1",
                "namespace": "default",
                "ownerReferences": [{"apiVersion": "apps/v1", "kind": "ReplicaSet", "name": "rs1"}]
            },
            "status": {"phase": "Running"}
        });
        let child = ChildResource::owned_by(&pod, "ReplicaSet", "rs1");
        assert_eq!(child.owner_reference_api_version, "apps/v1");
        assert_eq!(child.status, "Running");
    }

    #[test]
    fn test_composition_serializes_camel_case() {
        let value = serde_json::to_value(snapshot().assemble()).unwrap();
        assert_eq!(value["kind"], "Deployment");
        assert_eq!(value["children"][0]["children"][0]["name"], "p1");
        assert_eq!(value["level"], 1);
        assert_eq!(value["children"][0]["level"], 2);
    }
}
