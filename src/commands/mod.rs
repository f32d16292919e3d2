// ABOUTME: Command module aggregator for the hoist CLI.
// ABOUTME: Re-exports the deploy and config command handlers.

mod app;
mod config;
mod deploy;

pub use config::show_config;
pub use deploy::deploy;
