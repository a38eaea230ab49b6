use std::{io, path::PathBuf};

use anyhow::Result;
use clap::{ArgAction, Parser};
use trail_server::{
    config::{self, CliOverrides},
    run_http_server,
};
use tracing_subscriber::EnvFilter;

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_CONFIG_FILE: &str = "geotrail.toml";

#[derive(Parser, Debug)]
#[command(name = "geotrail-server", version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Path to the TOML configuration file (default: ./geotrail.toml if present)
    #[arg(long = "config", value_name = "FILE")]
    config_path: Option<PathBuf>,

    /// Optional log filter (e.g. info, debug, trail_core=trace)
    #[arg(long = "log-level", value_name = "LEVEL")]
    log_level: Option<String>,

    /// Host binding for the HTTP server
    #[arg(long = "host", value_name = "HOST")]
    host: Option<String>,

    /// Port binding for the HTTP server
    #[arg(long = "port", value_name = "PORT")]
    port: Option<u16>,

    /// Directory receiving location_log.txt, locations.csv and locations.jsonl
    #[arg(long = "log-dir", value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Additional CORS allowed origins
    #[arg(long = "cors-origin", value_name = "ORIGIN")]
    cors_origins: Vec<String>,

    /// Send an email for every recorded location (needs [notifier] to)
    #[arg(long = "enable-email", action = ArgAction::SetTrue)]
    enable_email: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args);
    tracing::info!(
        "{}",
        geotrail_build_info::formatted_banner("geotrail-server", SERVER_VERSION)
    );

    let config_path = args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let file_config = config::load_file_config(Some(&config_path))?;
    if file_config.is_none() && args.config_path.is_some() {
        tracing::warn!(
            "config file {} not found, using defaults",
            config_path.display()
        );
    }

    let cli = CliOverrides {
        host: args.host.clone(),
        port: args.port,
        log_dir: args.log_dir.clone(),
        cors_origins: args.cors_origins.clone(),
        enable_email: args.enable_email.then_some(true),
    };

    let app_config = config::resolve(&cli, file_config.as_ref())?;
    run_http_server(app_config).await
}

fn init_tracing(args: &Args) {
    let filter = args
        .log_level
        .as_deref()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    let _ = builder.try_init();
}
