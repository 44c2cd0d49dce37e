//! Resource matching strategies
//!
//! Given a relationship rule declared by a source kind, find the instances
//! on the other end. Forward matching starts from one named source instance
//! and looks at every target; reverse matching starts from one named target
//! instance and looks at every source.
//!
//! Lookup failures never escape a strategy: they are logged and the rule
//! simply yields no relatives.

mod annotation;
mod env;
mod label;
mod spec_property;

use crate::catalog::{RelationKind, RelationshipRule};
use crate::cluster::{ClusterClient, Instance, object, select_objects};
use crate::graph::ResourceRef;
use serde_json::Value;

/// Which side of a rule the anchor instance sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Anchor is the source; relatives are targets
    Forward,
    /// Anchor is the target; relatives are sources
    Reverse,
}

/// A resource found through a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relative {
    pub reference: ResourceRef,
    pub relation: RelationKind,
    pub details: String,
}

/// One matching request
#[derive(Debug, Clone, Copy)]
pub struct MatchQuery<'q> {
    /// Kind declaring the rule
    pub source_kind: &'q str,
    pub rule: &'q RelationshipRule,
    /// Source instance name (forward) or target instance name (reverse)
    pub anchor: &'q str,
    pub namespace: &'q str,
    pub direction: Direction,
}

impl MatchQuery<'_> {
    fn source_instance(&self) -> Instance {
        match self.direction {
            Direction::Forward => Instance::Named(self.anchor.to_string()),
            Direction::Reverse => Instance::All,
        }
    }

    fn target_instance(&self) -> Instance {
        match self.direction {
            Direction::Forward => Instance::All,
            Direction::Reverse => Instance::Named(self.anchor.to_string()),
        }
    }

    /// Build the relative for a matched (source, target) pair
    fn relative(&self, source: &Value, target: &Value, details: String) -> Relative {
        let (kind, obj) = match self.direction {
            Direction::Forward => (self.rule.target_kind.as_str(), target),
            Direction::Reverse => (self.source_kind, source),
        };
        Relative {
            reference: reference_of(kind, obj),
            relation: self.rule.relation,
            details,
        }
    }
}

/// Identity of an object; cluster-scoped objects have an empty namespace
pub fn reference_of(kind: &str, obj: &Value) -> ResourceRef {
    ResourceRef::new(kind, object::name(obj), object::namespace(obj))
}

/// Runs matching strategies against a cluster
pub struct ResourceMatcher<'a> {
    cluster: &'a dyn ClusterClient,
}

impl<'a> ResourceMatcher<'a> {
    pub fn new(cluster: &'a dyn ClusterClient) -> Self {
        Self { cluster }
    }

    /// Find the relatives of `query.anchor` through `query.rule`
    pub async fn find_relatives(&self, query: MatchQuery<'_>) -> Vec<Relative> {
        tracing::debug!(
            "Matching {} rule of {} ({:?}) from {} to {}",
            query.rule.relation,
            query.source_kind,
            query.direction,
            query.anchor,
            query.rule.target_kind
        );

        let mut relatives = match query.rule.relation {
            RelationKind::Label => label::find(self, &query).await,
            RelationKind::SpecProperty => spec_property::find(self, &query).await,
            RelationKind::EnvironmentVariable => env::find(self, &query).await,
            RelationKind::Annotation => annotation::find(self, &query).await,
            // Owner references are followed by the walker directly
            RelationKind::OwnerReference => Vec::new(),
        };

        let mut seen = std::collections::HashSet::new();
        relatives.retain(|r| seen.insert(r.reference.clone()));
        relatives
    }

    async fn objects(&self, kind: &str, instance: &Instance, namespace: &str) -> Vec<Value> {
        select_objects(self.cluster, kind, instance, namespace).await
    }

    /// Source and target candidates for a query
    async fn candidates(&self, query: &MatchQuery<'_>) -> (Vec<Value>, Vec<Value>) {
        let sources = self
            .objects(query.source_kind, &query.source_instance(), query.namespace)
            .await;
        if sources.is_empty() {
            return (sources, Vec::new());
        }
        let targets = self
            .objects(
                &query.rule.target_kind,
                &query.target_instance(),
                query.namespace,
            )
            .await;
        (sources, targets)
    }
}
