//! Host Pulse binary.
//!
//! Runs the health sampler and serves its record over HTTP and WebSocket.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use host_pulse::{
    platform_source, start_web_server, MetricsSource, MetricsStore, Sampler, WebConfig,
    DEFAULT_WEB_PORT,
};
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "host_pulse")]
#[command(about = "Host health sampler with pull and push publication")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sampler and web server (default)
    Serve(ServeArgs),

    /// Take a single measurement and exit
    Snapshot(SnapshotArgs),
}

#[derive(Args, Default)]
struct ServeArgs {
    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Maximum WebSocket connections
    #[arg(long, default_value_t = 100)]
    max_connections: usize,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Serve(args)) => serve_command(&cli, args).await?,
        Some(Commands::Snapshot(args)) => snapshot_command(args).await?,
        None => {
            let serve_args = ServeArgs {
                max_connections: 100,
                ..Default::default()
            };
            serve_command(&cli, &serve_args).await?
        }
    }

    Ok(())
}

fn log_level(cli: &Cli) -> Level {
    if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// `RUST_LOG` directives win over the level picked by the CLI flags.
fn log_filter(level: Level, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level.as_str().to_ascii_lowercase()))
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(log_level(cli), rust_log.as_deref()))
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;

    Ok(())
}

async fn serve_command(cli: &Cli, args: &ServeArgs) -> anyhow::Result<()> {
    let (store, writer) = MetricsStore::new();
    let source = platform_source();
    info!("Using {} metrics source", source.name());

    let sampler = Arc::new(Sampler::new(source, writer));
    let capabilities = sampler.capabilities();
    if !capabilities.network {
        info!("Network byte counters unavailable on this platform; network reported as 0");
    }

    let shutdown = CancellationToken::new();
    let sampler_task = Arc::clone(&sampler).spawn(shutdown.clone());

    tokio::spawn(cancel_on_interrupt(tokio::signal::ctrl_c(), shutdown.clone()));

    let web_config = WebConfig::new(&cli.host, cli.port)
        .with_cors(!args.no_cors)
        .with_max_websocket_connections(args.max_connections);

    info!("Web server configuration:");
    info!("  - Bind address: {}", web_config.bind_address());
    info!("  - CORS enabled: {}", web_config.enable_cors);
    info!("  - Max WebSocket connections: {}", web_config.max_websocket_connections);

    let served = start_web_server(web_config, store, capabilities, shutdown.clone()).await;
    shutdown.cancel();
    sampler_task.await.context("sampler task failed")?;
    served?;

    Ok(())
}

/// Cancel `shutdown` once `signal` reports an interrupt. A signal handler
/// that could not be installed leaves the service running.
async fn cancel_on_interrupt<F>(signal: F, shutdown: CancellationToken)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("Interrupt received, stopping sampler");
            shutdown.cancel();
        }
        Err(e) => warn!("Failed to listen for interrupt: {}", e),
    }
}

async fn snapshot_command(args: &SnapshotArgs) -> anyhow::Result<()> {
    let (_store, writer) = MetricsStore::new();
    let sampler = Sampler::new(platform_source(), writer);
    let metrics = sampler.sample_once().await;

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&metrics.report())?);
        }
        OutputFormat::Pretty => {
            let network = match metrics.network_mbps {
                Some(rate) => format!("{:.1} Mbps", rate),
                None => "unavailable".to_string(),
            };
            println!(
                "Host health ({})",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            );
            println!("==========================================");
            println!("  CPU:     {:.1}%", metrics.cpu_percent);
            println!("  Memory:  {:.1}%", metrics.memory_percent);
            println!("  Disk:    {:.1}%", metrics.disk_percent);
            println!("  Network: {}", network);
        }
    }

    Ok(())
}
