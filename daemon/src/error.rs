use std::path::PathBuf;
use thiserror::Error;

use warden_protocol::management::instance::DescriptorError;

/// Failures surfaced to the fleet layer. Filesystem and launch problems
/// propagate as typed values; nothing in the core retries.
#[derive(Debug, Error)]
pub enum InstanceError {
    /// Provisioning hit an existing working directory. The caller skips
    /// provisioning and proceeds.
    #[error("instance directory already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// The referenced server jar is absent from the artifact directory,
    /// or its file name failed sanitization. The instance cannot start;
    /// the daemon itself is unaffected.
    #[error("missing artifact: {0}")]
    MissingArtifact(String),

    /// A command was issued with no live server process attached.
    #[error("no server process attached")]
    NotRunning,

    /// An on-disk member list did not parse as the expected structure.
    /// Unlike `server.properties`, these files are this daemon's own
    /// output, so corruption is reported rather than tolerated.
    #[error("malformed member list {}: {}", .file.display(), .source)]
    MalformedList {
        file: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(#[from] DescriptorError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InstanceError>;
