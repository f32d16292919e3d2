// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hoist")]
#[command(about = "Deploy applications from source or a pre-built image")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output (for CI)
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Output JSON lines (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build an image and release it to the app
    Deploy(DeployArgs),

    /// Print the app config a deploy would use
    Config(ConfigArgs),
}

/// Flags that locate the app and its config.
#[derive(Args, Debug, Clone)]
pub struct AppArgs {
    /// Directory to deploy from (defaults to the current directory)
    #[arg(value_name = "WORKING_DIRECTORY")]
    pub working_directory: Option<PathBuf>,

    /// Application name; overrides `app` in the config
    #[arg(short, long)]
    pub app: Option<String>,

    /// Path to the app config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Set environment variables in the form NAME=VALUE (repeatable)
    #[arg(short, long = "env", value_name = "NAME=VALUE")]
    pub env: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub app: AppArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    #[command(flatten)]
    pub app: AppArgs,

    /// The image tag or ID to deploy
    #[arg(short, long)]
    pub image: Option<String>,

    /// Image label to use when tagging and pushing to the registry
    #[arg(long)]
    pub image_label: Option<String>,

    /// Sync the source tree to the remote builder and build there instead of with Docker
    #[arg(long, conflicts_with = "image")]
    pub nix: bool,

    /// Perform builds remotely without using the local docker daemon
    #[arg(long)]
    pub remote_only: bool,

    /// Only perform builds locally using the local docker daemon
    #[arg(long, conflicts_with = "remote_only")]
    pub local_only: bool,

    /// Build but do not deploy
    #[arg(long)]
    pub build_only: bool,

    /// Return immediately instead of monitoring deployment progress
    #[arg(long)]
    pub detach: bool,

    /// The strategy for replacing running instances (canary, rolling, bluegreen, immediate)
    #[arg(long)]
    pub strategy: Option<String>,

    /// Path to a Dockerfile; defaults to the Dockerfile in the working directory
    #[arg(long)]
    pub dockerfile: Option<PathBuf>,

    /// Set of build-time variables in the form NAME=VALUE (repeatable)
    #[arg(long = "build-arg", value_name = "NAME=VALUE")]
    pub build_args: Vec<String>,

    /// Target build stage when the Dockerfile has more than one
    #[arg(long)]
    pub build_target: Option<String>,

    /// Do not use the build cache when building the image
    #[arg(long)]
    pub no_cache: bool,

    /// Abort a remote build when syncing the source tree fails
    #[arg(long)]
    pub strict_sync: bool,
}
