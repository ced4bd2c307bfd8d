//! Pagewright CLI - static page builder.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "pagewright")]
#[command(about = "Bundle styles, render components and mirror assets into a static page")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to pagewright.toml config file
    #[arg(short, long, default_value = config::CONFIG_FILENAME)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the page into a clean output directory
    Build {
        /// Project root the source paths are relative to
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Output directory (defaults to config or "project-dist"); wiped first
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Bundle stylesheets only, into <output>/bundle.css
    Styles {
        /// Project root the source paths are relative to
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Directory receiving bundle.css; other files in it are kept
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Copy a directory tree into a clean destination
    Mirror {
        /// Directory to copy
        source: PathBuf,

        /// Destination (defaults to "<source>-copy"); wiped first
        destination: Option<PathBuf>,
    },

    /// Create a sample project in the current directory
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    // Execute command
    match cli.command {
        Commands::Build { root, output, json } => {
            commands::build::run(&cli.config, root, output, json).await?;
        }
        Commands::Styles { root, output } => {
            commands::styles::run(&cli.config, root, output).await?;
        }
        Commands::Mirror {
            source,
            destination,
        } => {
            commands::mirror::run(source, destination).await?;
        }
        Commands::Init { yes } => {
            commands::init::run(yes).await?;
        }
    }

    Ok(())
}
