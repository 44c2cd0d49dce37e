//! Discovery command handlers

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{RelationKind, RelationshipCatalog, load_declarations_file};
use crate::cluster::{ClusterClient, InMemoryCluster};
use crate::composition::RefreshEvent;
use crate::config::Config;
use crate::error::DiscoveryError;
use crate::graph::{OutputFormat, render};
use crate::services::{DiscoveryService, TraversalSettings};

/// Where cluster objects come from
#[derive(Debug, Clone, Default)]
pub struct ClusterOptions {
    /// Kubeconfig context; the current one when unset
    pub context: Option<String>,
    /// Offline snapshot file instead of a live cluster
    pub snapshot: Option<PathBuf>,
}

/// Output of the composition command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CompositionFormat {
    #[default]
    Tree,
    Json,
}

/// Build the catalog from built-ins, the declarations file and, when a
/// client is given, CRD annotations
pub async fn load_catalog(config: &Config, client: Option<&kube::Client>) -> Result<RelationshipCatalog> {
    let mut catalog = RelationshipCatalog::builtin();

    if let Some(path) = &config.declarations_file {
        let declarations = load_declarations_file(path)
            .with_context(|| format!("Failed to load kind declarations from {}", path.display()))?;
        tracing::debug!("Loaded {} kind declarations from {}", declarations.len(), path.display());
        for declaration in &declarations {
            catalog.apply_declaration(declaration);
        }
    }

    if let Some(client) = client {
        if config.load_crd_declarations {
            match crate::kube::fetch_crd_declarations(client).await {
                Ok(declarations) => {
                    for declaration in &declarations {
                        catalog.apply_declaration(declaration);
                    }
                }
                Err(e) => tracing::warn!("Skipping CRD declarations: {:#}", e),
            }
        }
    }

    Ok(catalog)
}

/// Connect to the cluster (or snapshot) and build the discovery service
pub async fn connect(
    config: &Config,
    options: &ClusterOptions,
    extra_ignored: &[RelationKind],
) -> Result<DiscoveryService> {
    let mut settings = TraversalSettings::from_config(config);
    settings.ignored_relations.extend(extra_ignored.iter().copied());

    let (catalog, cluster): (Arc<RelationshipCatalog>, Arc<dyn ClusterClient>) =
        match &options.snapshot {
            Some(path) => {
                let snapshot = InMemoryCluster::from_file(path).await?;
                tracing::debug!("Loaded {} objects from {}", snapshot.len(), path.display());
                let catalog = Arc::new(load_catalog(config, None).await?);
                let cluster: Arc<dyn ClusterClient> = Arc::new(snapshot);
                (catalog, cluster)
            }
            None => {
                let client = crate::kube::create_client(options.context.as_deref()).await?;
                let catalog = Arc::new(load_catalog(config, Some(&client)).await?);
                let cluster: Arc<dyn ClusterClient> =
                    Arc::new(crate::kube::KubeCluster::new(client, catalog.clone()));
                (catalog, cluster)
            }
        };

    Ok(DiscoveryService::new(catalog, cluster, settings))
}

/// Report a missing root and exit, or pass other errors up
fn exit_if_not_found(err: DiscoveryError) -> anyhow::Error {
    if err.is_not_found() {
        eprintln!("{}", err);
        std::process::exit(1);
    }
    err.into()
}

/// `connections <kind> <instance> [namespace]`
pub async fn handle_connections(
    service: &DiscoveryService,
    kind: &str,
    instance: &str,
    namespace: &str,
    format: OutputFormat,
) -> Result<()> {
    // Compositions feed the walk's containment edges
    service.build_composition_tree(namespace).await;

    let graph = service
        .discover_connections(kind, instance, namespace)
        .await
        .map_err(exit_if_not_found)?;

    let rendered = render(&graph, format).context("Failed to serialize connections")?;
    print!("{}", rendered);
    if format == OutputFormat::Json {
        println!();
    }
    Ok(())
}

/// `composition <kind> <instance|*> [namespace]`
pub async fn handle_composition(
    service: &DiscoveryService,
    kind: &str,
    instance: &str,
    namespace: &str,
    format: CompositionFormat,
) -> Result<()> {
    service.build_composition_tree(namespace).await;
    let compositions = service.get_compositions(kind, instance, namespace)?;

    match format {
        CompositionFormat::Json => {
            let json = serde_json::to_string_pretty(&compositions)
                .context("Failed to serialize compositions")?;
            println!("{}", json);
        }
        CompositionFormat::Tree => {
            if compositions.is_empty() {
                println!(
                    "No compositions of {} matching {} in namespace {}",
                    kind, instance, namespace
                );
            }
            for composition in &compositions {
                print!("{}", composition.render_tree());
            }
        }
    }
    Ok(())
}

/// `watch [namespace]`: refresh compositions until Ctrl-C
pub async fn handle_watch(service: DiscoveryService, namespace: &str, interval: Duration) -> Result<()> {
    let service = Arc::new(service);
    let (refresher, mut events) = service.spawn_refresher(namespace, interval);
    eprintln!(
        "Refreshing compositions in {} every {}s, press Ctrl-C to stop",
        namespace,
        interval.as_secs()
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(RefreshEvent::Refreshed(summary)) => {
                    println!(
                        "{} namespace={} kinds={} stored={} purged={} total={}",
                        chrono::Local::now().format("%H:%M:%S"),
                        summary.namespace,
                        summary.kinds,
                        summary.stored,
                        summary.purged,
                        service.compositions().len()
                    );
                }
                Some(RefreshEvent::Stopped) | None => break,
            },
            signal = &mut ctrl_c => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    refresher.stop().await;
    Ok(())
}

/// `kinds`: print the catalog
pub fn handle_kinds(catalog: &RelationshipCatalog) {
    for kind in catalog.kinds() {
        match catalog.api_details(&kind) {
            Some(details) => println!(
                "{} ({}, {}, {})",
                kind,
                details.plural,
                details.api_version(),
                if details.namespaced { "namespaced" } else { "cluster" }
            ),
            None => println!("{}", kind),
        }
        let composition = catalog.composition_children(&kind);
        if !composition.is_empty() {
            println!("  composition: {}", composition.join(", "));
        }
        for rule in catalog.rules_for(&kind) {
            println!("  {} -> {}: {}", rule.relation, rule.target_kind, rule.declaration);
        }
    }
}
