use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use airlift::agent::{agent_router, AgentState};
use airlift::mirror::RepoMirror;
use airlift::state::SecretStateStore;

#[derive(Parser)]
#[command(
    name = "airlift",
    version,
    about = "Mirror git repositories into air-gapped Kubernetes clusters"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Push every git checkout under a directory to the cluster's git service
    Mirror {
        /// Directory holding one checkout per repository
        dir: PathBuf,
    },
    /// Serve the mutating admission webhook
    Agent {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8443")]
        bind: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let client = kube::Client::try_default()
        .await
        .context("unable to build a kubernetes client")?;
    let store = Arc::new(SecretStateStore::new(client.clone()));

    match cli.command {
        Command::Mirror { dir } => {
            let mirror = RepoMirror::new(client, store);
            mirror.push_directory(&dir).await?;
        }
        Command::Agent { bind } => {
            let router = agent_router(AgentState::new(store));
            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("unable to bind {bind}"))?;
            tracing::info!("agent listening on {bind}");
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("agent server failed")?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    // If no handler can be installed, run until killed.
    let _ = tokio::signal::ctrl_c().await;
}
