//! Shared composition store
//!
//! One mutex guards the whole collection; every read or write holds it for
//! the full operation.

use super::{Composition, CompositionSnapshot};
use crate::cluster::Instance;
use crate::graph::ResourceRef;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Composition snapshots keyed by (kind, name, namespace)
#[derive(Debug, Clone, Default)]
pub struct ClusterCompositions {
    inner: Arc<Mutex<Vec<CompositionSnapshot>>>,
}

impl ClusterCompositions {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CompositionSnapshot>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a snapshot or replace the one with the same identity
    pub fn store(&self, snapshot: CompositionSnapshot) {
        let mut snapshots = self.lock();
        let key = snapshot.reference();
        match snapshots.iter_mut().find(|s| s.reference() == key) {
            Some(existing) => *existing = snapshot,
            None => snapshots.push(snapshot),
        }
    }

    /// Drop snapshots of `kinds` in `namespace` whose resource is not in `present`
    ///
    /// Kinds outside `kinds` are left alone, so a kind that could not be
    /// listed keeps its previous snapshots. Returns the number removed.
    pub fn purge(&self, namespace: &str, kinds: &[String], present: &HashSet<ResourceRef>) -> usize {
        let mut snapshots = self.lock();
        let before = snapshots.len();
        snapshots.retain(|s| {
            s.namespace != namespace
                || !kinds.contains(&s.kind)
                || present.contains(&s.reference())
        });
        before - snapshots.len()
    }

    /// Assembled compositions of `kind` in `namespace` matching `instance`
    ///
    /// Kind comparison ignores case. An empty namespace matches every namespace.
    pub fn get_compositions(&self, kind: &str, instance: &Instance, namespace: &str) -> Vec<Composition> {
        self.lock()
            .iter()
            .filter(|s| s.kind.eq_ignore_ascii_case(kind))
            .filter(|s| namespace.is_empty() || s.namespace == namespace)
            .filter(|s| instance.matches(&s.name))
            .map(CompositionSnapshot::assemble)
            .collect()
    }

    /// Identities of every stored snapshot
    pub fn references(&self) -> Vec<ResourceRef> {
        self.lock().iter().map(CompositionSnapshot::reference).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
