// ABOUTME: Library root for hoist - exposes the deploy pipeline for the CLI and tests.
// ABOUTME: The main binary is in main.rs.

pub mod api;
pub mod build;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod probe;
pub mod tunnel;
pub mod types;
pub mod watch;
