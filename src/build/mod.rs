// ABOUTME: Image acquisition for a deploy.
// ABOUTME: Remote source builds over the tunnel, docker builds, and pre-built references.

mod acquire;
mod docker;
mod error;
mod remote;
mod sync;

pub use acquire::{
    ImageSources, acquire_image, fetch_image_ref, merge_build_args, resolve_build_target,
    resolve_dockerfile_path,
};
pub use docker::{
    DaemonSelection, DockerResolver, ImageOptions, ImageResolver, RefOptions, docker_build_args,
};
pub use error::{BuildError, NotReadyCause, RemoteBuildError, ResolveError, SyncError};
pub use remote::{BuilderLocator, RemoteBuild, RemoteBuilder, build_command};
pub use sync::{RsyncSync, SourceSync, SyncFailurePolicy, rsync_args};
