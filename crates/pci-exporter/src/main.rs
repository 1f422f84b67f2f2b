//! pci-exporter - Prometheus exporter for PCI device attributes.
//!
//! Reads link speed, link width, revision, ids and region sizes of PCI
//! devices from sysfs on every scrape and serves them as gauges.

mod access_log;
mod handlers;
mod state;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use axum::routing::get;
use axum::{Router, middleware};
use clap::Parser;
use tower_http::compression::CompressionLayer;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(target_os = "linux")]
use pci_exporter_core::collector::RealFs;
#[cfg(not(target_os = "linux"))]
use pci_exporter_core::collector::mock::MockFs;
use pci_exporter_core::collector::sysfs::DEFAULT_PCI_PATH;
use pci_exporter_core::collector::{
    CollectorConfig, DEFAULT_WORKERS, DriverFilter, MAX_WORKERS, MetricKind, PciCollector,
    SysfsLayout,
};
use pci_exporter_core::{Exporter, RegistryError};

use access_log::HEALTH_PATH;
use state::WebApp;

// ============================================================
// CLI
// ============================================================

#[derive(Parser)]
#[command(
    name = "pci-exporter",
    about = "Prometheus exporter for PCI devices",
    version = pci_exporter_core::VERSION
)]
struct Args {
    /// Driver(s) whose bound devices are exported (comma-separated).
    /// Empty exports every device on the bus.
    #[arg(long, default_value = "", env = "PCI_EXPORTER_DRIVER")]
    driver: String,

    /// Listen address.
    #[arg(long, default_value = "0.0.0.0:9101", env = "PCI_EXPORTER_LISTEN")]
    listen: String,

    /// Path of the metrics endpoint.
    #[arg(long, default_value = "/metrics", env = "PCI_EXPORTER_TELEMETRY_PATH")]
    telemetry_path: String,

    /// Root of the PCI bus in sysfs (for testing/mocking).
    #[arg(long, default_value = DEFAULT_PCI_PATH, env = "PCI_EXPORTER_SYSFS_PCI_PATH")]
    sysfs_pci_path: PathBuf,

    /// Maximum number of threads reading sysfs during one scrape (1-64).
    #[arg(
        long,
        default_value_t = DEFAULT_WORKERS as u16,
        value_parser = clap::value_parser!(u16).range(1..=MAX_WORKERS as i64),
        env = "PCI_EXPORTER_WORKERS"
    )]
    workers: u16,

    /// Scrape deadline in seconds.
    #[arg(long, default_value = "10", env = "PCI_EXPORTER_SCRAPE_TIMEOUT")]
    scrape_timeout: u64,

    /// Metric kinds to skip (comma-separated): link_speed, link_width,
    /// revision, region_size, info.
    #[arg(long, value_delimiter = ',')]
    disable: Vec<MetricKind>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["pci_exporter", "pci_exporter_core"] {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("invalid log directive for {}: {}", target, e),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// ============================================================
// Main
// ============================================================

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(async_main(args));
}

async fn async_main(args: Args) {
    let kinds: Vec<MetricKind> = MetricKind::ALL
        .into_iter()
        .filter(|kind| !args.disable.contains(kind))
        .collect();
    if kinds.is_empty() {
        error!("every metric kind is disabled, nothing to export");
        process::exit(1);
    }

    if let Err(reason) = validate_telemetry_path(&args.telemetry_path) {
        error!(path = %args.telemetry_path, "invalid telemetry path: {reason}");
        process::exit(1);
    }

    let config = CollectorConfig {
        layout: SysfsLayout::from_pci_root(&args.sysfs_pci_path),
        filter: DriverFilter::parse(&args.driver),
        kinds,
        workers: usize::from(args.workers),
    };

    info!(version = pci_exporter_core::VERSION, "starting");
    info!(
        sysfs = %args.sysfs_pci_path.display(),
        drivers = ?config.filter.drivers(),
        kinds = ?config.kinds.iter().map(|k| k.name()).collect::<Vec<_>>(),
        workers = config.workers,
        scrape_timeout_s = args.scrape_timeout,
        "collector config"
    );
    if config.filter.is_empty() {
        info!("no driver filter, exporting every pci device");
    }

    let exporter = match create_exporter(config) {
        Ok(exporter) => exporter,
        Err(e) => {
            error!(error = %e, "failed to register collector");
            process::exit(1);
        }
    };

    let app = WebApp::new(
        exporter,
        Duration::from_secs(args.scrape_timeout),
        &args.telemetry_path,
    );

    let addr: SocketAddr = match args.listen.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(listen = %args.listen, error = %e, "invalid listen address");
            process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            process::exit(1);
        }
    };
    info!(%addr, path = %args.telemetry_path, "listening");

    let service = build_router(app).into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
        process::exit(1);
    }

    info!("stopped");
}

/// Checks the metrics path before it reaches the router, which panics on
/// capture (`:`, `{}`) and wildcard (`*`) segments.
fn validate_telemetry_path(path: &str) -> Result<(), &'static str> {
    if !path.starts_with('/') {
        return Err("must start with '/'");
    }
    if path == "/" || path == HEALTH_PATH {
        return Err("clashes with a built-in route");
    }
    if path.contains("//") {
        return Err("contains an empty segment");
    }
    if path.contains([':', '*', '{', '}']) {
        return Err("must not contain ':', '*', '{' or '}'");
    }
    Ok(())
}

pub(crate) fn build_router(app: WebApp) -> Router {
    let telemetry_path = app.telemetry_path.clone();
    Router::new()
        .route(&telemetry_path, get(handlers::handle_metrics))
        .route(HEALTH_PATH, get(handlers::handle_health))
        .route("/", get(handlers::handle_index))
        .with_state(app)
        .layer(middleware::from_fn(access_log::access_log))
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn create_exporter(config: CollectorConfig) -> Result<Exporter, RegistryError> {
    #[cfg(target_os = "linux")]
    {
        let collector = PciCollector::new(RealFs::new(), config)?;
        Exporter::new(collector)
    }
    #[cfg(not(target_os = "linux"))]
    {
        warn!("not running on linux, serving a mock pci tree");
        let collector = PciCollector::new(MockFs::typical_host(), config)?;
        Exporter::new(collector)
    }
}
