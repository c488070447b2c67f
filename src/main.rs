// ABOUTME: Entry point for the hoist CLI application.
// ABOUTME: Parses arguments, wires Ctrl+C to cancellation and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::ProjectSource;
use hoist::cancel::CancelSignal;
use hoist::error::Result;
use hoist::output::{Output, OutputMode};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = OutputMode::from_flags(cli.quiet, cli.json);
    let cancel = CancelSignal::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    if let Err(e) = run(cli, mode, &cancel).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mode: OutputMode, cancel: &CancelSignal) -> Result<()> {
    let source = ProjectSource {
        file: &cli.file,
        project_name: cli.project_name.as_deref(),
        tenant: &cli.tenant,
    };
    let output = Output::new(mode);

    match &cli.command {
        Commands::Config => commands::config(&source, &output),
        Commands::Package { service, output: destination } => {
            commands::package(&source, service, destination.as_deref(), cancel, output).await
        }
        Commands::Prepare { upload_url, force } => {
            commands::prepare(&source, upload_url.as_deref(), *force, cancel, output).await
        }
    }
}
