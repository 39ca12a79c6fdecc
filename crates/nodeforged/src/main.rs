//! nodeforged — the nodeforge daemon.
//!
//! Assembles the state store, the infrastructure backend, the resize
//! conductor and the REST API into one process.
//!
//! # Usage
//!
//! ```text
//! nodeforged --config /etc/nodeforge/nodeforge.toml serve
//! nodeforged serve --listen 127.0.0.1:9511 --data-dir ./data
//! nodeforged seed-demo --data-dir ./data --workers 3
//! nodeforged --config nodeforge.toml check-config
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use nodeforge_core::{BackendKind, NodeforgeConfig};
use nodeforge_resize::{
    Conductor, InfraBackend, ResizeConfig, SimulatedBackend, SimulatedConfig, TimeoutBackend,
};
use nodeforge_state::{Cluster, LifecycleStatus, NodeGroup, NodeGroupRole, StateStore};

#[derive(Parser)]
#[command(name = "nodeforged", about = "nodeforge daemon")]
struct Cli {
    /// Path to nodeforge.toml. Built-in defaults are used when omitted.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the resize API.
    Serve {
        /// Address to listen on (overrides `server.listen`).
        #[arg(long)]
        listen: Option<String>,

        /// Data directory for persistent state (overrides `state.data_dir`).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Parse and validate the configuration, then print it with defaults filled in.
    CheckConfig,

    /// Create a demo cluster with one master and one worker nodegroup.
    SeedDemo {
        /// Data directory for persistent state (overrides `state.data_dir`).
        #[arg(long)]
        data_dir: Option<PathBuf>,

        #[arg(long, default_value = "demo")]
        name: String,

        /// Initial size of the default worker nodegroup.
        #[arg(long, default_value_t = 3)]
        workers: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => NodeforgeConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => NodeforgeConfig::default(),
    };

    match cli.command {
        Command::CheckConfig => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::Serve { listen, data_dir } => {
            if let Some(listen) = listen {
                config.server.listen = listen;
            }
            if let Some(data_dir) = data_dir {
                config.state.data_dir = data_dir;
            }
            config.validate()?;
            init_tracing(&config)?;
            serve(config).await
        }
        Command::SeedDemo {
            data_dir,
            name,
            workers,
        } => {
            if let Some(data_dir) = data_dir {
                config.state.data_dir = data_dir;
            }
            init_tracing(&config)?;
            seed_demo(&config, &name, workers)
        }
    }
}

/// `RUST_LOG` wins over the configured filter.
fn init_tracing(config: &NodeforgeConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log.filter)
            .with_context(|| format!("invalid log filter {:?}", config.log.filter))?,
    };

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

fn open_state(config: &NodeforgeConfig) -> anyhow::Result<StateStore> {
    std::fs::create_dir_all(&config.state.data_dir)
        .with_context(|| format!("creating {}", config.state.data_dir.display()))?;
    let db_path = config.db_path();
    let state = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");
    Ok(state)
}

fn build_backend(config: &NodeforgeConfig) -> anyhow::Result<Arc<dyn InfraBackend>> {
    let timeout = config.backend_timeout()?;
    let backend = match config.backend.kind {
        BackendKind::Simulated => SimulatedBackend::new(SimulatedConfig {
            delay: config.backend_delay()?,
            fail_resizes: config.backend.fail_resizes,
            fail_rollbacks: config.backend.fail_rollbacks,
        }),
    };
    info!(kind = ?config.backend.kind, ?timeout, "infra backend initialized");
    Ok(Arc::new(TimeoutBackend::new(backend, timeout)))
}

/// Operations do not survive a restart. A cluster left in
/// `update_in_progress` keeps refusing resizes until an operator resets it.
fn report_interrupted(state: &StateStore) -> anyhow::Result<()> {
    for cluster in state.list_clusters()? {
        match cluster.status {
            LifecycleStatus::UpdateInProgress => warn!(
                cluster_id = %cluster.id,
                name = %cluster.name,
                "cluster was mid-operation at shutdown; resizes will be refused"
            ),
            status if status.is_terminal() => warn!(
                cluster_id = %cluster.id,
                name = %cluster.name,
                %status,
                reason = cluster.status_reason.as_deref().unwrap_or(""),
                "cluster needs operator attention"
            ),
            _ => {}
        }
    }
    Ok(())
}

async fn serve(config: NodeforgeConfig) -> anyhow::Result<()> {
    info!("nodeforge daemon starting");

    // ── Initialize subsystems ──────────────────────────────────

    let state = open_state(&config)?;
    report_interrupted(&state)?;

    let backend = build_backend(&config)?;
    let resize_config = ResizeConfig::from(&config.resize);
    let conductor = Conductor::new(state, backend, &resize_config);
    info!(
        max_nodes_per_nodegroup = ?resize_config.max_nodes_per_nodegroup,
        "resize conductor initialized"
    );

    // ── Start API server ───────────────────────────────────────

    let router = nodeforge_api::build_router(conductor);
    let addr = config.listen_addr()?;

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("nodeforge daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn seed_demo(config: &NodeforgeConfig, name: &str, workers: u32) -> anyhow::Result<()> {
    let state = open_state(config)?;

    let cluster = Cluster::new(name, "demo-template");
    let master = NodeGroup::new(&cluster.id, "default-master", NodeGroupRole::Master, 1).as_default();
    let worker =
        NodeGroup::new(&cluster.id, "default-worker", NodeGroupRole::Worker, workers).as_default();

    state.put_cluster(&cluster)?;
    state.put_nodegroup(&master)?;
    state.put_nodegroup(&worker)?;

    info!(cluster_id = %cluster.id, %name, workers, "demo cluster created");
    println!("{}", cluster.id);
    Ok(())
}
