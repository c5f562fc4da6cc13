//! privfs entry point.
//!
//! Launch the interactive REPL:
//! ```bash
//! cargo run -p privfs-repl
//! ```
//!
//! Or run commands and exit:
//! ```bash
//! privfs --memory -c "content hi" -c write -c read
//! ```
//!
//! `privfs --print-config > ~/.config/privfs/config.toml` writes a starter
//! config.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use privfs_kernel::config::Backend;
use privfs_kernel::{paths, Config, ExportMode};
use privfs_repl::Repl;

#[derive(Parser, Debug)]
#[command(name = "privfs", version, about = "Private file store with import and export")]
struct Args {
    /// Config file (default: $XDG_CONFIG_HOME/privfs/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep files in memory for this run only
    #[arg(long, conflicts_with = "root")]
    memory: bool,

    /// Private storage directory
    #[arg(long)]
    root: Option<PathBuf>,

    /// Export mode: auto, picker or download
    #[arg(long)]
    export: Option<ExportMode>,

    /// Run a command and exit (repeatable)
    #[arg(short = 'c', long = "command")]
    commands: Vec<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(paths::config_file);
    let mut config = Config::load_or_default(&config_path)?;
    if args.memory {
        config.storage.backend = Backend::Memory;
    }
    if let Some(root) = args.root {
        config.storage.backend = Backend::Local;
        config.storage.root = root;
    }
    if let Some(mode) = args.export {
        config.export.mode = mode;
    }
    config.validate().context("Invalid configuration")?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let mut repl = Repl::new(&config)?;
    if args.commands.is_empty() {
        privfs_repl::run(repl)
    } else {
        privfs_repl::run_commands(&mut repl, &args.commands)
    }
}
