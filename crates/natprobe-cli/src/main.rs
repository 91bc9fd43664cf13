//! natprobe CLI
//!
//! Classifies the NAT between this host and the Internet using two STUN
//! servers.

mod config;

use clap::Parser;
use natprobe_discovery::NatDetector;
use natprobe_transport::{StunController, StunTransport};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::Config;

/// natprobe - detect NAT presence and type with STUN
#[derive(Parser)]
#[command(name = "natprobe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Primary STUN server
    server1: String,

    /// Second STUN server, used to detect symmetric mappings
    server2: String,

    /// STUN server port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };
    if let Some(port) = cli.port {
        config.stun.port = port;
    }
    config.validate()?;

    init_logging(cli.verbose, &config.logging.level);

    let controller = StunController::bind(&config.controller_config()?).await?;
    let detector = NatDetector::new(&controller, config.detector_config());

    let result = detector.detect(&cli.server1, &cli.server2).await;

    let stats = controller.stats();
    debug!(
        requests = stats.requests_sent,
        responses = stats.responses_received,
        timeouts = stats.timeouts,
        socket_errors = stats.socket_errors,
        "transport statistics"
    );

    let report = result?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    Ok(())
}

/// `RUST_LOG` wins, then `--verbose`, then the configured level
fn init_logging(verbose: bool, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { level })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
