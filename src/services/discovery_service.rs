//! Discovery facade
//!
//! Owns the catalog, the cluster client and the composition store, and runs
//! each query against a fresh traversal-scoped cache.

use crate::catalog::{RelationKind, RelationshipCatalog};
use crate::cluster::{CachedCluster, ClusterClient, Instance};
use crate::composition::{
    ClusterCompositions, Composition, CompositionBuilder, CompositionRefresher, RefreshEvent,
    RefreshSummary,
};
use crate::config::schema::Config;
use crate::error::DiscoveryError;
use crate::graph::{ConnectionGraph, ConnectionWalker, WalkOptions};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Knobs applied to every connection query
#[derive(Debug, Clone)]
pub struct TraversalSettings {
    pub timeout: Duration,
    pub cache_capacity: usize,
    /// Kinds listed in parallel before a walk starts
    pub prefetch_kinds: Vec<String>,
    pub ignored_relations: HashSet<RelationKind>,
}

impl Default for TraversalSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl TraversalSettings {
    /// Settings from configuration; unknown relation names are skipped
    pub fn from_config(config: &Config) -> Self {
        let ignored_relations = config
            .traversal
            .ignored_relations
            .iter()
            .filter_map(|name| match name.parse::<RelationKind>() {
                Ok(relation) => Some(relation),
                Err(e) => {
                    tracing::warn!("Ignoring traversal.ignoredRelations entry {:?}: {}", name, e);
                    None
                }
            })
            .collect();
        Self {
            timeout: Duration::from_secs(config.traversal.timeout_seconds),
            cache_capacity: config.traversal.cache_capacity,
            prefetch_kinds: config.traversal.prefetch_kinds.clone(),
            ignored_relations,
        }
    }
}

/// Entry point for composition and connection queries
pub struct DiscoveryService {
    catalog: Arc<RelationshipCatalog>,
    cluster: Arc<dyn ClusterClient>,
    compositions: ClusterCompositions,
    settings: TraversalSettings,
}

impl DiscoveryService {
    pub fn new(
        catalog: Arc<RelationshipCatalog>,
        cluster: Arc<dyn ClusterClient>,
        settings: TraversalSettings,
    ) -> Self {
        Self {
            catalog,
            cluster,
            compositions: ClusterCompositions::new(),
            settings,
        }
    }

    pub fn catalog(&self) -> &RelationshipCatalog {
        &self.catalog
    }

    pub fn compositions(&self) -> &ClusterCompositions {
        &self.compositions
    }

    pub fn settings(&self) -> &TraversalSettings {
        &self.settings
    }

    fn scoped_cluster(&self) -> CachedCluster {
        CachedCluster::new(self.cluster.clone(), self.settings.cache_capacity)
    }

    fn resolve_kind(&self, kind: &str) -> Result<String, DiscoveryError> {
        self.catalog
            .resolve_kind(kind)
            .ok_or_else(|| DiscoveryError::UnknownKind(kind.to_string()))
    }

    /// Populate or refresh the composition store for `namespace`
    ///
    /// Safe to call repeatedly: snapshots are upserted and those of vanished
    /// top-level resources are purged.
    pub async fn build_composition_tree(&self, namespace: &str) -> RefreshSummary {
        let cluster = self.scoped_cluster();
        CompositionBuilder::new(&self.catalog, &cluster)
            .build_namespace(namespace, &self.compositions)
            .await
    }

    /// Stored compositions of `kind`; `instance` may be `*`
    pub fn get_compositions(
        &self,
        kind: &str,
        instance: &str,
        namespace: &str,
    ) -> Result<Vec<Composition>, DiscoveryError> {
        let kind = self.resolve_kind(kind)?;
        Ok(self
            .compositions
            .get_compositions(&kind, &Instance::parse(instance), namespace))
    }

    /// Walk the connection graph rooted at `kind/instance`
    pub async fn discover_connections(
        &self,
        kind: &str,
        instance: &str,
        namespace: &str,
    ) -> Result<ConnectionGraph, DiscoveryError> {
        let kind = self.resolve_kind(kind)?;
        let cluster = self.scoped_cluster();

        let walk = async {
            self.prefetch(&cluster, namespace).await;
            ConnectionWalker::new(&self.catalog, &cluster)
                .with_compositions(&self.compositions)
                .with_options(WalkOptions {
                    ignored_relations: self.settings.ignored_relations.clone(),
                })
                .discover(&kind, instance, namespace)
                .await
        };

        let graph = tokio::time::timeout(self.settings.timeout, walk)
            .await
            .map_err(|_| DiscoveryError::Timeout(self.settings.timeout))??;

        let (hits, misses) = cluster.stats();
        tracing::debug!("Lookup cache: {} hits, {} misses", hits, misses);
        Ok(graph)
    }

    /// List commonly needed kinds in parallel to warm the cache
    async fn prefetch(&self, cluster: &CachedCluster, namespace: &str) {
        let kinds: Vec<&String> = self
            .settings
            .prefetch_kinds
            .iter()
            .filter(|kind| self.catalog.api_details(kind).is_some())
            .collect();
        if kinds.is_empty() {
            return;
        }

        let results = futures::future::join_all(
            kinds
                .iter()
                .map(|kind| cluster.list_objects(kind, namespace)),
        )
        .await;
        for (kind, result) in kinds.iter().zip(results) {
            if let Err(e) = result {
                tracing::debug!("Prefetch of {} failed: {}", kind, e);
            }
        }
    }

    /// Start the periodic composition refresh for `namespace`
    pub fn spawn_refresher(
        self: &Arc<Self>,
        namespace: &str,
        interval: Duration,
    ) -> (CompositionRefresher, mpsc::UnboundedReceiver<RefreshEvent>) {
        let service = Arc::clone(self);
        let namespace = namespace.to_string();
        CompositionRefresher::spawn(interval, move || {
            let service = Arc::clone(&service);
            let namespace = namespace.clone();
            async move { service.build_composition_tree(&namespace).await }
        })
    }
}
