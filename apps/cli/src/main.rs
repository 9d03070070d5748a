//! `flowcore` CLI: loads a workflow definition from a JSON file, drives it
//! through the execution core, and prints journal + broadcast output to
//! stdout. A demonstration harness for the public API, not the authoring
//! surface.

mod commands;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "flowcore", about = "Run and validate flowcore workflow definitions", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a workflow definition and print the resulting journal rows.
    Run {
        /// Path to the workflow definition JSON file.
        path: PathBuf,
        /// Optional path to a JSON file supplying the trigger payload
        /// (defaults to `null`).
        #[arg(long)]
        trigger: Option<PathBuf>,
        /// How the run is reported in the journal's trigger_mode column.
        #[arg(long, value_enum, default_value = "manual")]
        mode: commands::TriggerModeArg,
    },
    /// Build the execution graph and report structural problems without
    /// running anything.
    Validate {
        /// Path to the workflow definition JSON file.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run { path, trigger, mode } => commands::run(&path, trigger.as_deref(), mode).await,
        Command::Validate { path } => commands::validate(&path),
    };

    if let Err(err) = result {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
