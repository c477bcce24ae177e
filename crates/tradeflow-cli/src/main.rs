//! Tradeflow CLI - 命令行工具

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tradeflow_bridge::{HttpBridge, WorkflowTracker};
use tradeflow_collab::RoomManager;
use tradeflow_core::Config;
use tradeflow_server::{RoomApiState, WorkflowApiState, create_router};

#[derive(Parser)]
#[command(name = "tradeflow")]
#[command(about = "Tradeflow - collaborative AI trading workflow canvas", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show effective configuration
    Config {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            host,
            verbose,
            config,
        } => serve(port, host, verbose, config).await,
        Commands::Config { config } => {
            let path = config.unwrap_or_else(Config::default_path);
            let config = Config::load(&path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn serve(
    port: Option<u16>,
    host: Option<String>,
    verbose: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let path = config_path.unwrap_or_else(Config::default_path);
    let mut config = Config::load(&path)?;
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(host) = host {
        config.server.host = host;
    }

    let level = if verbose {
        "debug".to_string()
    } else {
        config.server.log_level.clone()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let room_manager = Arc::new(RoomManager::new(config.collab.clone()));
    let bridge = Arc::new(HttpBridge::new(config.bridge.clone())?);
    let tracker = WorkflowTracker::new(
        bridge.clone(),
        Duration::from_secs(config.bridge.poll_interval_secs),
    );

    let router = create_router(
        RoomApiState::with_manager(room_manager.clone()),
        WorkflowApiState::new(bridge, tracker, room_manager),
    )
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Tradeflow 服务启动: http://{}", addr);

    axum::serve(listener, router).await?;
    Ok(())
}
