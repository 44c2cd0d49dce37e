//! kubediscovery library
//!
//! Relationship discovery for Kubernetes resources: a catalog of declared
//! relationships between kinds, matching strategies that find related
//! instances, a composition tree builder and a connection graph walker.
//! The binary is a thin CLI over [`services::DiscoveryService`].

pub mod catalog;
pub mod cli;
pub mod cluster;
pub mod composition;
pub mod config;
pub mod error;
pub mod graph;
pub mod kube;
pub mod matcher;
pub mod services;

// Re-export commonly used types for convenience
pub use catalog::{RelationKind, RelationshipCatalog, RelationshipRule};
pub use cluster::{ClusterClient, InMemoryCluster, Instance};
pub use composition::{ClusterCompositions, Composition};
pub use error::DiscoveryError;
pub use graph::{Connection, ConnectionGraph, OutputFormat, ResourceRef};
pub use services::{DiscoveryService, TraversalSettings};
