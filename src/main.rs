//! kubediscovery - composition trees and relationship graphs of Kubernetes resources
//!
//! Starting from one resource, finds everything connected to it through owner
//! references, label selectors, spec fields, environment variables and
//! annotations.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kubediscovery::catalog::RelationKind;
use kubediscovery::cli::{self, ClusterOptions, CompositionFormat, ConfigSubcommand};
use kubediscovery::config::ConfigLoader;
use kubediscovery::graph::OutputFormat;
use std::path::PathBuf;
use std::time::Duration;

/// Discover how Kubernetes resources relate to each other
#[derive(Parser, Debug)]
#[command(name = "kubediscovery")]
#[command(about = "Discover composition trees and relationship graphs of Kubernetes resources", long_about = None)]
struct Args {
    /// Enable debug logging to a temp file
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    /// Configuration file layered over the root config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    context: Option<String>,

    /// Read objects from a YAML/JSON snapshot instead of a live cluster
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Show every resource connected to one resource
    Connections {
        /// Resource kind, plural or singular, any case
        kind: String,
        /// Resource name
        instance: String,
        /// Namespace (defaults to defaultNamespace)
        namespace: Option<String>,
        /// Output format (defaults to the configured output)
        #[arg(short = 'o', long, value_enum)]
        output: Option<OutputFormat>,
        /// Relations not to follow, comma separated
        #[arg(long, value_delimiter = ',')]
        ignore: Vec<RelationKind>,
    },
    /// Show the containment tree of one or all (`*`) instances of a kind
    Composition {
        kind: String,
        #[arg(default_value = "*")]
        instance: String,
        namespace: Option<String>,
        #[arg(short = 'o', long, value_enum, default_value_t = CompositionFormat::Tree)]
        output: CompositionFormat,
    },
    /// Periodically rebuild compositions until interrupted
    Watch {
        namespace: Option<String>,
        /// Seconds between sweeps (defaults to refresh.intervalSeconds)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// List the kinds, compositions and relationship rules in the catalog
    Kinds,
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_file = cli::init_logging(args.debug);
    if let Some(ref log_path) = log_file {
        eprintln!(
            "Debug logging enabled. Logs written to: {}",
            log_path.display()
        );
    }

    let command = match args.command {
        Command::Version => {
            cli::display_version();
            return Ok(());
        }
        Command::Config { subcommand } => {
            return cli::handle_config_command(subcommand, args.config.as_deref()).await;
        }
        command => command,
    };

    let config = ConfigLoader::load(args.config.as_deref()).context("Failed to load configuration")?;
    tracing::debug!("Configuration loaded: {:?}", config);

    let options = ClusterOptions {
        context: args.context,
        snapshot: args.snapshot,
    };
    let namespace_or_default =
        |namespace: Option<String>| namespace.unwrap_or_else(|| config.default_namespace.clone());

    match command {
        Command::Connections {
            kind,
            instance,
            namespace,
            output,
            ignore,
        } => {
            let service = cli::connect(&config, &options, &ignore).await?;
            let namespace = namespace_or_default(namespace);
            cli::handle_connections(
                &service,
                &kind,
                &instance,
                &namespace,
                output.unwrap_or(config.output),
            )
            .await?;
        }
        Command::Composition {
            kind,
            instance,
            namespace,
            output,
        } => {
            let service = cli::connect(&config, &options, &[]).await?;
            let namespace = namespace_or_default(namespace);
            cli::handle_composition(&service, &kind, &instance, &namespace, output).await?;
        }
        Command::Watch {
            namespace,
            interval,
        } => {
            let service = cli::connect(&config, &options, &[]).await?;
            let namespace = namespace_or_default(namespace);
            let interval = Duration::from_secs(
                interval.unwrap_or(config.refresh.interval_seconds).max(1),
            );
            cli::handle_watch(service, &namespace, interval).await?;
        }
        Command::Kinds => {
            let client = if options.snapshot.is_some() {
                None
            } else {
                match kubediscovery::kube::create_client(options.context.as_deref()).await {
                    Ok(client) => Some(client),
                    Err(e) => {
                        tracing::warn!("Listing built-in kinds only: {:#}", e);
                        None
                    }
                }
            };
            let catalog = cli::load_catalog(&config, client.as_ref()).await?;
            cli::handle_kinds(&catalog);
        }
        // Handled before configuration is loaded
        Command::Version | Command::Config { .. } => {}
    }

    Ok(())
}
