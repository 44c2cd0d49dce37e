//! Service layer
//!
//! Front ends (the CLI today) go through [`DiscoveryService`] rather than
//! driving the walker, builder and caches directly.

pub mod discovery_service;

pub use discovery_service::{DiscoveryService, TraversalSettings};
