// ABOUTME: Locates the app a command acts on and the config it deploys with.
// ABOUTME: Shared by every command that takes a working directory and --app.

use crate::cli::AppArgs;
use hoist::config::{Config, ConfigSource, determine_app_config};
use hoist::error::{Error, Result};
use hoist::types::AppName;
use std::env;
use std::path::PathBuf;

/// Working directory, app name, and resolved config for one command.
pub struct ResolvedApp {
    pub working_dir: PathBuf,
    pub name: AppName,
    pub config: Config,
}

pub async fn resolve_app(args: &AppArgs, source: &dyn ConfigSource) -> Result<ResolvedApp> {
    let working_dir = match &args.working_directory {
        Some(dir) => std::path::absolute(dir)?,
        None => env::current_dir()?,
    };

    let local = match &args.config {
        Some(path) => Some(Config::load(path)?),
        None => Config::discover(&working_dir)?,
    };

    // --app beats the name in the local config
    let name = match (&args.app, local.as_ref().and_then(|c| c.app.as_ref())) {
        (Some(flag), _) => AppName::new(flag)?,
        (None, Some(name)) => name.clone(),
        (None, None) => return Err(Error::MissingAppName),
    };

    let config = determine_app_config(local, source, &name, &args.env).await?;
    tracing::debug!(app = %name, path = ?config.path, "resolved app config");

    Ok(ResolvedApp {
        working_dir,
        name,
        config,
    })
}
