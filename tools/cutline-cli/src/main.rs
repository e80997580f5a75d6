//! Cutline CLI: command-line interface for project editing and export.
//!
//! Usage:
//!   cutline init <NAME>         Create a new empty project
//!   cutline info <PATH>         Show project information
//!   cutline validate <PATH>     Validate a project document
//!   cutline edit <PATH> <OP>    Apply one edit operation and save
//!   cutline preview <PATH>      Run headless playback and report stats
//!   cutline export <PATH>       Export a project to a media file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "cutline",
    about = "Timeline editing, preview, and export for Cutline projects",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project
    Init {
        /// Project name
        name: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Show project information
    Info {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Validate a project document and its asset references
    Validate {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Apply one edit operation to the timeline and save
    Edit {
        /// Path to the project directory
        path: PathBuf,

        #[command(subcommand)]
        action: commands::edit::EditAction,
    },

    /// Run headless playback against the timeline and report stats
    Preview {
        /// Path to the project directory
        path: PathBuf,

        /// How long to run, in seconds
        #[arg(long, default_value = "5.0")]
        duration: f64,

        /// Playhead position to start from, in seconds
        #[arg(long)]
        from: Option<f64>,
    },

    /// Export a project to a media file
    Export {
        /// Path to the project directory
        path: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: mp4-h264, mp4-h265, gif, webm
        #[arg(long)]
        format: Option<String>,

        /// Output width
        #[arg(long)]
        width: Option<u32>,

        /// Output height
        #[arg(long)]
        height: Option<u32>,

        /// Output frame rate
        #[arg(long)]
        fps: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    cutline_common::logging::init_logging(&cutline_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
    });

    match cli.command {
        Commands::Init { name, output } => commands::init::run(name, output),
        Commands::Info { path } => commands::info::run(path),
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Edit { path, action } => commands::edit::run(path, action),
        Commands::Preview {
            path,
            duration,
            from,
        } => commands::preview::run(path, duration, from).await,
        Commands::Export {
            path,
            output,
            format,
            width,
            height,
            fps,
        } => commands::export::run(path, output, format, width, height, fps).await,
    }
}
