// ABOUTME: Per-run choices that steer image acquisition and release tracking.
// ABOUTME: Filled from command-line flags; everything else comes from the app config.

use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    pub working_dir: PathBuf,
    /// Pre-built image reference; beats `build.image` in the config.
    pub image: Option<String>,
    pub image_label: Option<String>,
    /// Build on the remote builder from synced source instead of with docker.
    pub nix: bool,
    /// Stop once the image exists; nothing is published or released.
    pub build_only: bool,
    /// Return once the release is created.
    pub detach: bool,
    pub strategy: Option<String>,
    pub dockerfile: Option<PathBuf>,
    /// Raw `NAME=VALUE` build args from the command line.
    pub build_args: Vec<String>,
    pub build_target: Option<String>,
    pub no_cache: bool,
}

impl DeployOptions {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            ..Default::default()
        }
    }

    /// Images are pushed unless the run stops after building.
    pub fn publish(&self) -> bool {
        !self.build_only
    }
}
