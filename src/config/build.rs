// ABOUTME: Build section of the app config.
// ABOUTME: Declares a pre-built image or how to build one from source.

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildConfig {
    /// Pre-built image to deploy instead of building.
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub dockerfile: Option<String>,

    #[serde(default, alias = "build-target")]
    pub build_target: Option<String>,

    #[serde(default, deserialize_with = "super::deserialize::deserialize_string_map")]
    pub args: HashMap<String, String>,

    #[serde(default)]
    pub builder: Option<String>,

    #[serde(default)]
    pub buildpacks: Vec<String>,
}
