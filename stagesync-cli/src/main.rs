//! stagesync: stage a version-stamped build and mirror it to a remote host.
//!
//! # Usage
//!
//! ```text
//! stagesync init [--config PATH] [--force]
//! stagesync stage [--config PATH] [--build-version V]
//! stagesync deploy [--config PATH] [--dry-run] [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{deploy::DeployArgs, init::InitArgs, stage::StageArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "stagesync",
    version,
    about = "Stamp a build version into a staged snapshot and mirror it over SFTP",
    long_about = None,
)]
struct Cli {
    /// Log more (repeat for trace output).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter config file.
    Init(InitArgs),

    /// Build the version-stamped snapshot without uploading it.
    Stage(StageArgs),

    /// Stage, then mirror the snapshot onto the configured target.
    Deploy(DeployArgs),
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_target(false)
        .format_timestamp(None)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Stage(args) => args.run(),
        Commands::Deploy(args) => args.run(),
    }
}
