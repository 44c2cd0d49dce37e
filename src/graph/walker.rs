//! Connection graph walker
//!
//! Breadth-first walk from a root resource. Each node is expanded in a fixed
//! order: forward rules of its kind, reverse rules of kinds that target it,
//! its owner, its owned children, then its composition children. Newly
//! discovered neighbors are queued; known neighbors are only merged, which
//! is what terminates the walk. Nodes leave the queue in level order, so the
//! level a node is first recorded at is already its shortest.

use super::{Connection, ConnectionGraph, MergeOutcome, PeerEdge, ResourceRef};
use crate::catalog::{RelationKind, RelationshipCatalog};
use crate::cluster::{ClusterClient, Instance, object};
use crate::composition::ClusterCompositions;
use crate::error::DiscoveryError;
use crate::matcher::{Direction, MatchQuery, Relative, ResourceMatcher, reference_of};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};

/// What to do when a referenced resource cannot be found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingResourcePolicy {
    /// Fail the walk
    Abort,
    /// Leave the resource out and keep walking
    Skip,
}

/// Per-walk options
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Relations never followed
    pub ignored_relations: HashSet<RelationKind>,
}

impl WalkOptions {
    fn follows(&self, relation: RelationKind) -> bool {
        !self.ignored_relations.contains(&relation)
    }
}

/// Walks the connection graph of one root resource
pub struct ConnectionWalker<'a> {
    catalog: &'a RelationshipCatalog,
    cluster: &'a dyn ClusterClient,
    compositions: Option<&'a ClusterCompositions>,
    options: WalkOptions,
}

impl<'a> ConnectionWalker<'a> {
    pub fn new(catalog: &'a RelationshipCatalog, cluster: &'a dyn ClusterClient) -> Self {
        Self {
            catalog,
            cluster,
            compositions: None,
            options: WalkOptions::default(),
        }
    }

    /// Bridge stored composition trees into the walk
    pub fn with_compositions(mut self, compositions: &'a ClusterCompositions) -> Self {
        self.compositions = Some(compositions);
        self
    }

    pub fn with_options(mut self, options: WalkOptions) -> Self {
        self.options = options;
        self
    }

    /// Discover every resource connected to `kind/name` in `namespace`
    ///
    /// Only a missing root fails the walk; lookups that fail further out
    /// just contribute no neighbors.
    pub async fn discover(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
    ) -> Result<ConnectionGraph, DiscoveryError> {
        let root_obj = self
            .resolve(kind, name, namespace, MissingResourcePolicy::Abort)
            .await?
            .ok_or_else(|| DiscoveryError::root_not_found(kind, name, namespace))?;

        let root = reference_of(kind, &root_obj);
        tracing::debug!("Discovering connections of {} in {}", root, namespace);

        let mut graph = ConnectionGraph::new(root.clone());
        let mut queue: VecDeque<(ResourceRef, Option<Value>)> = VecDeque::new();
        queue.push_back((root, Some(root_obj)));

        while let Some((node, prefetched)) = queue.pop_front() {
            let obj = match prefetched {
                Some(obj) => obj,
                None => {
                    match self
                        .resolve(&node.kind, &node.name, namespace, MissingResourcePolicy::Skip)
                        .await?
                    {
                        Some(obj) => obj,
                        None => continue,
                    }
                }
            };

            if let Some(owner) = object::owner(&obj) {
                graph.set_owner(&node, &owner.kind, &owner.name);
            }

            let level = graph.level_of(&node).unwrap_or(0) + 1;
            for relative in self.expand(&node, &obj, namespace).await? {
                if !self.options.follows(relative.relation) || relative.reference == node {
                    continue;
                }
                let candidate = Connection::discovered(
                    &relative.reference,
                    level,
                    PeerEdge {
                        peer: node.clone(),
                        relation: relative.relation,
                        details: relative.details,
                    },
                );
                if graph.record_or_update(candidate) == MergeOutcome::Discovered {
                    queue.push_back((relative.reference, None));
                }
            }
        }

        tracing::debug!("Discovered {} connected resources", graph.len());
        Ok(graph)
    }

    /// Neighbors of one node, in expansion order
    async fn expand(
        &self,
        node: &ResourceRef,
        obj: &Value,
        namespace: &str,
    ) -> Result<Vec<Relative>, DiscoveryError> {
        let matcher = ResourceMatcher::new(self.cluster);
        let mut relatives = Vec::new();

        // Rules declared by this kind
        for rule in self.catalog.rules_for(&node.kind) {
            if rule.relation == RelationKind::OwnerReference || !self.options.follows(rule.relation)
            {
                continue;
            }
            let query = MatchQuery {
                source_kind: &node.kind,
                rule,
                anchor: &node.name,
                namespace,
                direction: Direction::Forward,
            };
            relatives.extend(matcher.find_relatives(query).await);
        }

        // Rules of other kinds that target this kind
        for source_kind in self.catalog.reverse_kinds(&node.kind) {
            for rule in self.catalog.rules_for(&source_kind) {
                if rule.target_kind != node.kind
                    || rule.relation == RelationKind::OwnerReference
                    || !self.options.follows(rule.relation)
                {
                    continue;
                }
                let query = MatchQuery {
                    source_kind: &source_kind,
                    rule,
                    anchor: &node.name,
                    namespace,
                    direction: Direction::Reverse,
                };
                relatives.extend(matcher.find_relatives(query).await);
            }
        }

        if !self.options.follows(RelationKind::OwnerReference) {
            return Ok(relatives);
        }

        // Owner
        if let Some(owner) = object::owner(obj) {
            if self.catalog.api_details(&owner.kind).is_some() {
                if let Some(owner_obj) = self
                    .resolve(&owner.kind, &owner.name, namespace, MissingResourcePolicy::Skip)
                    .await?
                {
                    relatives.push(Relative {
                        reference: reference_of(&owner.kind, &owner_obj),
                        relation: RelationKind::OwnerReference,
                        details: String::new(),
                    });
                }
            } else {
                tracing::debug!("Owner kind {} of {} is not in the catalog", owner.kind, node);
            }
        }

        // Owned children
        for child_kind in self.catalog.child_kinds(&node.kind) {
            let children = match self.cluster.list_objects(&child_kind, namespace).await {
                Ok(children) => children,
                Err(e) => {
                    tracing::warn!("Failed to list {} in {}: {}", child_kind, namespace, e);
                    continue;
                }
            };
            for child in children
                .iter()
                .filter(|c| object::is_owned_by(c, &node.kind, &node.name))
            {
                relatives.push(Relative {
                    reference: reference_of(&child_kind, child),
                    relation: RelationKind::OwnerReference,
                    details: String::new(),
                });
            }
        }

        // Composition children
        if let Some(store) = self.compositions {
            if !self.catalog.composition_children(&node.kind).is_empty() {
                let instance = Instance::Named(node.name.clone());
                for composition in store.get_compositions(&node.kind, &instance, namespace) {
                    for child in &composition.children {
                        let reference =
                            ResourceRef::new(&child.kind, &child.name, &child.namespace);
                        // Already found by the owned-children pass
                        if relatives.iter().any(|r| r.reference == reference) {
                            continue;
                        }
                        if self
                            .resolve(&child.kind, &child.name, namespace, MissingResourcePolicy::Skip)
                            .await?
                            .is_none()
                        {
                            continue;
                        }
                        relatives.push(Relative {
                            reference,
                            relation: RelationKind::OwnerReference,
                            details: String::new(),
                        });
                    }
                }
            }
        }

        Ok(relatives)
    }

    /// Look up a resource under the given policy
    async fn resolve(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
        policy: MissingResourcePolicy,
    ) -> Result<Option<Value>, DiscoveryError> {
        match self.cluster.get_object(kind, name, namespace).await {
            Ok(Some(obj)) => Ok(Some(obj)),
            Ok(None) => match policy {
                MissingResourcePolicy::Abort => {
                    Err(DiscoveryError::root_not_found(kind, name, namespace))
                }
                MissingResourcePolicy::Skip => {
                    tracing::debug!("Skipping missing {}/{} in {}", kind, name, namespace);
                    Ok(None)
                }
            },
            Err(e) => match policy {
                MissingResourcePolicy::Abort => Err(DiscoveryError::Cluster(e)),
                MissingResourcePolicy::Skip => {
                    tracing::warn!("Failed to fetch {}/{} in {}: {}", kind, name, namespace, e);
                    Ok(None)
                }
            },
        }
    }
}
