//! devorch - development orchestrator with code regeneration and hot restart.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use devorch::config::{ConfigLoader, DevConfig};
use devorch::orchestrator::Orchestrator;

#[derive(Parser)]
#[command(
    name = "devorch",
    about = "Run services, regenerate code on interface changes and restart on edits",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ConfigArgs {
    /// Configuration file. Defaults to .devorch.toml, then the user config dir.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Comma-separated service names, replacing the configured list.
    #[arg(short, long, value_delimiter = ',')]
    services: Vec<String>,
    /// Listen address for the status endpoint.
    #[arg(long)]
    status_addr: Option<String>,
    /// Never run the regeneration step.
    #[arg(long)]
    no_generate: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start services and watch for changes.
    Dev(ConfigArgs),
    /// Print the resolved configuration as TOML.
    Config(ConfigArgs),
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn resolve_config(args: ConfigArgs) -> Result<DevConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_file(path)?,
        None => ConfigLoader::new().load()?,
    };
    if !args.services.is_empty() {
        config.set_service_names(&args.services);
    }
    if let Some(addr) = args.status_addr {
        config.status.addr = addr;
    }
    if args.no_generate {
        config.regenerate.enabled = false;
    }
    config.validate()?;
    Ok(config)
}

async fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Dev(args) => {
            let config = resolve_config(args)?;
            let reason = Orchestrator::new(config)?.run().await?;
            tracing::info!(reason = %reason, "Orchestrator stopped");
        }
        Commands::Config(args) => {
            let config = resolve_config(args)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli.command).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            eprintln!("devorch: {e}");
            1
        }
    };
    // The console may still be blocked on stdin; exit without waiting for it.
    std::process::exit(code);
}
