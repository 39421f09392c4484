//! `ferrumqd`: the broker daemon.

use std::{path::PathBuf, process};

use anyhow::{Context, Result};
use clap::Parser;
use ferrumq::{init_logging, version, Broker, LogFormat, LoggingConfig, Options};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "ferrumqd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "ferrumq broker daemon", long_about = None)]
struct Args {
    /// Path to a TOML, YAML or JSON config file
    #[arg(long, env = "FERRUMQ_CONFIG")]
    config: Option<PathBuf>,
    /// Directory holding the metadata file and the queues
    #[arg(long)]
    data_path: Option<PathBuf>,
    /// Listen address of the admin HTTP surface
    #[arg(long)]
    http_address: Option<String>,
    /// debug, info, warn, error or fatal
    #[arg(long)]
    log_level: Option<String>,
    /// Shorthand for --log-level=debug
    #[arg(short, long)]
    verbose: bool,
    /// Numeric identity of this node
    #[arg(long)]
    node_id: Option<i64>,
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
    /// Directory for a daily-rotated log file
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Args {
    fn into_options(self) -> Result<Options> {
        let mut opts = Options::load(self.config.as_deref()).context("loading options")?;

        if let Some(path) = self.data_path {
            opts.data_path = Some(path);
        }
        if let Some(address) = self.http_address {
            opts.http_address = address;
        }
        if let Some(level) = self.log_level {
            opts.log_level = level;
        }
        if self.verbose {
            opts.verbose = true;
        }
        if let Some(id) = self.node_id {
            opts.id = id;
        }
        if let Some(format) = self.log_format {
            opts.log_format = format;
        }
        if let Some(dir) = self.log_dir {
            opts.log_dir = Some(dir);
        }

        Ok(opts.resolve()?)
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Args::parse()).await {
        if tracing::dispatcher::has_been_set() {
            error!("{e:#}");
        } else {
            eprintln!("ferrumqd: {e:#}");
        }
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let opts = args.into_options()?;
    let _logging = init_logging(&LoggingConfig::from_options(&opts))?;

    let broker = Broker::create(opts)?;
    broker.load_metadata()?;
    // Rewrite the file right away so it reflects what was actually restored.
    broker.persist_metadata()?;
    broker.start().await?;

    shutdown_signal().await;
    info!(version = %version::string("ferrumqd"), "shutting down");
    broker.exit().await;
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
