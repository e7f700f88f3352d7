//! spirvcross-natives CLI
//!
//! Diagnostics for the native library bootstrap: try a load, show the
//! detected platform, list the bundled libraries, and remove staging
//! directories left behind by earlier processes.

mod commands;
mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use spirvcross_natives::LoaderConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spirvcross-natives")]
#[command(about = "Stage and load the spirvcrossj native libraries", long_about = None)]
#[command(version)]
struct Cli {
    /// Loader configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Color output: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage and load the native libraries, then report per-library outcomes
    Load {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the detected platform and library file names
    Platform {
        /// Detect from this OS identity string instead of the running OS
        #[arg(long)]
        os: Option<String>,
    },

    /// List the bundled library resources
    List,

    /// Remove stale staging directories
    Sweep {
        /// Treat directories older than this many seconds as stale
        #[arg(long)]
        max_age_secs: Option<u64>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<LoaderConfig> {
    let config = match path {
        Some(path) => LoaderConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let color = output::resolve_color_choice(cli.color.as_deref());
    let config = load_config(cli.config.as_ref())?;
    tracing::debug!("Loader config: {:?}", config);

    match cli.command {
        Commands::Load { json } => {
            let ready = commands::load::execute(config, json, color)?;
            if !ready {
                std::process::exit(1);
            }
        }
        Commands::Platform { os } => commands::platform::execute(os.as_deref()),
        Commands::List => commands::list::execute(&config),
        Commands::Sweep { max_age_secs } => commands::sweep::execute(&config, max_age_secs),
    }

    Ok(())
}
