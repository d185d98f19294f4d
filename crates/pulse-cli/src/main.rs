use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use axum::{routing::get, Router};
use clap::{Args, Parser, Subcommand};
use opentelemetry_otlp::WithExportConfig;
use pulse_common::config::{DriverConfig, PulseConfig, ServeConfig};
use pulse_common::credentials::read_token;
use pulse_driver::{Driver, HttpTransport, JsonlSink, TargetDescriptor};
use tokio::sync::watch;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pulse", version, about = "Greeting echo service and batch load driver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the greeting echo endpoint
    Serve(ServeArgs),
    /// Fire request batches at a target and append outcome counts to a file
    Drive(DriveArgs),
    Version,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long)]
    host: Option<String>,
    #[arg(short, long)]
    port: Option<u16>,
    /// Greeting returned as `{"result": <message>}`
    #[arg(short, long)]
    message: Option<String>,
}

#[derive(Args, Debug)]
struct DriveArgs {
    /// Target URL (http or https)
    #[arg(short, long)]
    url: Option<String>,
    /// File holding the bearer token
    #[arg(short, long)]
    token_file: Option<PathBuf>,
    /// Concurrent requests per batch
    #[arg(short = 'n', long)]
    parallelism: Option<usize>,
    /// Aggregate output file, one JSON line per cycle
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(long)]
    cadence_ms: Option<u64>,
    /// Stop after this many cycles instead of running until ctrl-c
    #[arg(long)]
    cycles: Option<u64>,
    /// Do not probe the target before the first cycle
    #[arg(long)]
    skip_preflight: bool,
    /// Expose driver metrics on this address
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,
}

impl DriveArgs {
    fn apply(&self, cfg: &mut DriverConfig) {
        if let Some(url) = &self.url { cfg.url = url.clone(); }
        if let Some(path) = &self.token_file { cfg.token_file = path.clone(); }
        if let Some(n) = self.parallelism { cfg.parallelism = n; }
        if let Some(path) = &self.output { cfg.output = path.clone(); }
        if let Some(ms) = self.cadence_ms { cfg.cadence_ms = ms; }
        if self.cycles.is_some() { cfg.max_cycles = self.cycles; }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Drive(args) => drive(args).await,
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };
    opentelemetry::global::shutdown_tracer_provider();
    result
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut cfg: ServeConfig = PulseConfig::load()?.serve;
    if let Some(host) = args.host { cfg.host = host; }
    if let Some(port) = args.port { cfg.port = port; }
    if let Some(message) = args.message { cfg.message = message; }

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    };
    pulse_echo::serve(&cfg, shutdown)
        .await
        .with_context(|| format!("echo service on {}:{} failed", cfg.host, cfg.port))
}

async fn drive(args: DriveArgs) -> anyhow::Result<()> {
    let mut cfg = PulseConfig::load()?.driver;
    args.apply(&mut cfg);
    cfg.validate()?;

    let token = read_token(&cfg.token_file)?;
    let target = TargetDescriptor::new(&cfg.url, &token, cfg.payload.clone())?;
    let transport = HttpTransport::new(Duration::from_millis(cfg.attempt_timeout_ms))
        .context("failed to build http client")?;
    let driver = Driver::from_config(transport, target, &cfg);

    if let Some(addr) = args.metrics_addr {
        spawn_metrics_server(addr).await?;
    }
    if !args.skip_preflight {
        driver.preflight().await?;
        tracing::info!("target {} reachable", cfg.url);
    }

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown signal received");
                let _ = tx.send(true);
            }
            Err(e) => {
                tracing::warn!("cannot listen for ctrl-c: {}", e);
                // keep the sender alive so the driver is not stopped
                std::future::pending::<()>().await;
            }
        }
    });

    tracing::info!(
        parallelism = cfg.parallelism,
        cadence_ms = cfg.cadence_ms,
        "driving {}, appending to {}",
        cfg.url,
        cfg.output.display()
    );
    let mut sink = JsonlSink::new(&cfg.output);
    let summary = driver.run(&mut sink, rx).await;
    println!("completed {} cycles ({} sink failures)", summary.cycles, summary.sink_failures);
    Ok(())
}

async fn spawn_metrics_server(addr: SocketAddr) -> anyhow::Result<()> {
    pulse_obs::init();
    let app = Router::new().route(
        "/metrics",
        get(|| async {
            let (content_type, body) = pulse_obs::render();
            ([("content-type", content_type)], body)
        }),
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind metrics address {}", addr))?;
    tracing::info!("metrics on http://{}/metrics", addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("metrics server stopped: {}", e);
        }
    });
    Ok(())
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );

    if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint))
            .install_simple()
            .ok();
        if let Some(tracer) = tracer {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .with(OpenTelemetryLayer::new(tracer))
                .init();
            return;
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
