//! Kubernetes client module
//!
//! Handles connection to the Kubernetes API server and provides the live
//! [`ClusterClient`](crate::cluster::ClusterClient) implementation.
//!
//! HTTP/HTTPS proxies are honoured through the standard `HTTP_PROXY`,
//! `HTTPS_PROXY` and `NO_PROXY` environment variables.

mod crds;
mod fetch;

pub use crds::fetch_crd_declarations;
pub use fetch::KubeCluster;

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

/// Initialize and return a Kubernetes client
///
/// Without an explicit context the default loading strategy applies:
/// 1. In-cluster config (if running in a pod)
/// 2. KUBECONFIG environment variable
/// 3. ~/.kube/config
pub async fn create_client(context: Option<&str>) -> Result<Client> {
    let config = match context {
        Some(name) => {
            let options = KubeConfigOptions {
                context: Some(name.to_string()),
                ..Default::default()
            };
            Config::from_kubeconfig(&options)
                .await
                .with_context(|| format!("Failed to load kubeconfig context '{}'", name))?
        }
        None => Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };

    tracing::debug!("Connecting to Kubernetes API at {}", config.cluster_url);
    let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
    Ok(client)
}

/// Get the current Kubernetes context name, if a kubeconfig is present
pub fn current_context() -> Option<String> {
    match Kubeconfig::read() {
        Ok(kubeconfig) => kubeconfig.current_context,
        Err(e) => {
            tracing::debug!("No kubeconfig available: {}", e);
            None
        }
    }
}
