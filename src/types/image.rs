// ABOUTME: Deployment image descriptor and image tag derivation.
// ABOUTME: Tags are fixed per run so every stage agrees on the same identity.

use super::app_name::AppName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size reported for images built on the remote builder, which never reports a measured size.
pub const REMOTE_BUILD_SIZE_PLACEHOLDER: u64 = 10;

/// Fully qualified image reference used to deploy a release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageTag(String);

impl ImageTag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The artifact a release is created from.
///
/// Produced by exactly one acquisition path per run and never modified after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentImage {
    pub tag: ImageTag,
    pub id: String,
    pub size: u64,
}

/// Derives deployment tags for a single run.
///
/// The default label embeds the run's start time, captured once, so asking for
/// the same app twice yields the same tag.
#[derive(Debug, Clone)]
pub struct TagFactory {
    registry: String,
    run_stamp: i64,
    image_ref_override: Option<String>,
}

impl TagFactory {
    pub fn new(registry: impl Into<String>, run_started: DateTime<Utc>) -> Self {
        Self {
            registry: registry.into(),
            run_stamp: run_started.timestamp(),
            image_ref_override: None,
        }
    }

    /// Use a fixed image reference for every tag (CI pipelines that pre-assign refs).
    pub fn with_override(mut self, image_ref: Option<String>) -> Self {
        self.image_ref_override = image_ref.filter(|r| !r.is_empty());
        self
    }

    /// Tag for `app`, qualified by `label` or by the run's default label.
    pub fn tag(&self, app: &AppName, label: Option<&str>) -> ImageTag {
        if let Some(ref image_ref) = self.image_ref_override {
            return ImageTag::new(image_ref.clone());
        }

        let label = match label {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => format!("deployment-{}", self.run_stamp),
        };
        ImageTag::new(format!("{}/{}:{}", self.registry, app, label))
    }
}

/// Render a byte count the way humans read image sizes (`1.2 MB`).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "kB", "MB", "GB", "TB", "PB"];

    if bytes < 1000 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
