// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod app_name;
mod id;
mod image;

pub use app_name::{AppName, AppNameError};
pub use id::{EvaluationId, Id, MachineId, ReleaseCommandId, ReleaseId};
pub use image::{DeploymentImage, ImageTag, REMOTE_BUILD_SIZE_PLACEHOLDER, TagFactory, format_size};
