// ABOUTME: Config command implementation.
// ABOUTME: Prints the app definition a deploy from this directory would send.

use super::app::resolve_app;
use crate::cli::ConfigArgs;
use hoist::api::ApiClient;
use hoist::config::Settings;
use hoist::error::{Error, Result};
use hoist::output::{Output, OutputMode};

pub async fn show_config(args: ConfigArgs, output: Output) -> Result<()> {
    let settings = Settings::from_env()?;
    let client = ApiClient::new(&settings.api_url, settings.api_token.clone())
        .map_err(Error::ApiClient)?;

    let app = resolve_app(&args.app, &client).await?;

    match &app.config.path {
        Some(path) => output.progress(&format!("Using {}", path.display())),
        None => output.progress(&format!("Using the deployed config of {}", app.name)),
    }

    let rendered = match output.mode() {
        OutputMode::Json => serde_json::to_string(&app.config.definition)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?,
        OutputMode::Normal | OutputMode::Quiet => serde_yaml::to_string(&app.config.definition)?,
    };
    println!("{}", rendered.trim_end());

    Ok(())
}
