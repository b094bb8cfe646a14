//! Influenxers Server
//!
//! Exposes the Influenxers agent through its front doors:
//! - `POST /agent` over HTTP, with the peer-messaging listener alongside
//! - the Discord mention listener
//! - A2A (JSON-RPC + agent card) through radkit's runtime
//! - a one-shot CLI run

mod api;

use anyhow::Context;
use clap::{Parser, Subcommand};
use influenxers_core::chat::{DiscordGateway, DiscordRest, MentionHandler};
use influenxers_core::mesh::{
    start_peer_listener, HttpBusTransport, MeshConfig, PeerListenerHandle,
};
use influenxers_core::skills::serve_a2a;
use influenxers_core::tools::services::ServiceClient;
use influenxers_core::{InfluenxersAgent, Settings, TaskRunner};
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::watch};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Clone)]
#[command(author, version, about = "Influenxers - influencer video marketing agent")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the HTTP endpoint and peer listener (default)
    Serve {
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,
        /// Do not join the message bus even if MESH_SERVER_URL is set
        #[arg(long)]
        no_mesh: bool,
    },
    /// Start the Discord mention listener
    Discord,
    /// Serve the agent to other agents over A2A
    A2a {
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0:8001")]
        address: String,
        /// Public URL advertised in the agent card
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Run a single task and print the result (CLI mode, no server)
    Run {
        /// The task to run
        task: String,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "influenxers=info,influenxers_server=info,influenxers_core=info,tower_http=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves when the process is asked to stop, and flips the watch flag.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for interrupt");
        return;
    }
    info!("interrupt received, shutting down");
    let _ = shutdown_tx.send(true);
}

async fn join_mesh(runner: Arc<dyn TaskRunner>, config: &MeshConfig) -> Option<PeerListenerHandle> {
    let transport = Arc::new(HttpBusTransport::new(config.clone()));
    match start_peer_listener(runner, transport, config).await {
        Ok(handle) => {
            info!(agent_id = %config.agent_id, bus = %config.server_url, "peer listener running");
            Some(handle)
        }
        Err(e) => {
            // The HTTP front door stays up without the bus.
            error!(error = %e, "failed to join message bus");
            None
        }
    }
}

async fn run_server(
    settings: &Settings,
    runner: Arc<dyn TaskRunner>,
    host: &str,
    port: u16,
    mesh_enabled: bool,
) -> anyhow::Result<()> {
    let mesh = match (&settings.mesh, mesh_enabled) {
        (Some(config), true) => join_mesh(runner.clone(), config).await,
        (None, true) => {
            info!("MESH_SERVER_URL not set, peer listener disabled");
            None
        }
        (_, false) => None,
    };

    let app = api::router(Arc::new(api::AppState { runner }));

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", host, port))?;
    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, "Influenxers server running");
    info!("   Agent:    POST /agent");
    info!("   OpenAPI:  GET  /api/v1/openapi.json");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(shutdown_signal(shutdown_tx));

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await;

    if let Some(handle) = mesh {
        handle.shutdown().await;
    }
    served?;
    info!("server stopped");
    Ok(())
}

async fn run_discord(settings: &Settings, runner: Arc<dyn TaskRunner>) -> anyhow::Result<()> {
    let token = settings
        .discord_token
        .clone()
        .context("DISCORD_TOKEN must be set to run the chat listener")?;

    let sink = Arc::new(DiscordRest::new(token.clone()));
    let handler = Arc::new(MentionHandler::new(runner, sink));
    let gateway = DiscordGateway::new(token, handler);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(shutdown_signal(shutdown_tx));

    info!("starting chat listener");
    gateway.run(shutdown_rx).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("failed to load .env: {}", e);
        }
    }
    let args = Args::parse();
    // radkit's runtime installs its own subscriber when it starts serving.
    if !matches!(args.command, Some(CliCommand::A2a { .. })) {
        init_tracing();
    }

    let settings = Settings::from_env()?;
    ServiceClient::install(settings.services.clone());

    info!(
        service = "influenxers",
        version = env!("CARGO_PKG_VERSION"),
        provider = settings.model.provider.display_name(),
        model = %settings.model.model,
        "starting"
    );
    if std::env::var(settings.model.provider.env_var()).is_err() {
        warn!(
            env_var = settings.model.provider.env_var(),
            "LLM API key not set; agent calls will fail"
        );
    }

    let runner: Arc<dyn TaskRunner> = Arc::new(InfluenxersAgent::new(settings.model.clone()));

    match args.command {
        Some(CliCommand::Serve {
            host,
            port,
            no_mesh,
        }) => run_server(&settings, runner, &host, port, !no_mesh).await,
        None => run_server(&settings, runner, "0.0.0.0", 8000, true).await,
        Some(CliCommand::Discord) => run_discord(&settings, runner).await,
        Some(CliCommand::A2a { address, base_url }) => {
            serve_a2a(settings.model.clone(), &address, base_url).await
        }
        Some(CliCommand::Run { task }) => match runner.run(&task).await {
            Ok(output) => {
                println!("{}", output);
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        },
    }
}
