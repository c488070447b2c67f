// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines global flags and the config, package and prepare subcommands.

use clap::{Parser, Subcommand};
use hoist::compose::DEFAULT_MANIFEST_PATTERN;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hoist")]
#[command(about = "Prepare compose projects and their build contexts for remote deployment")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Compose file or glob
    #[arg(short, long, global = true, default_value = DEFAULT_MANIFEST_PATTERN)]
    pub file: String,

    /// Project name; overrides the name declared in the compose file
    #[arg(short = 'p', long, global = true)]
    pub project_name: Option<String>,

    /// Fallback project name when the compose file declares none
    #[arg(long, global = true, env = "HOIST_TENANT", default_value = "default")]
    pub tenant: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the deployment descriptor for the project
    Config,

    /// Package one service's build context
    Package {
        /// Service to package
        service: String,

        /// Write the archive to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Package and upload every build context, then print the deployment request
    Prepare {
        /// Base URL the archive digest is appended to; omit for a dry run
        #[arg(long)]
        upload_url: Option<String>,

        /// Upload without a digest so nothing is reused remotely
        #[arg(long)]
        force: bool,
    },
}
