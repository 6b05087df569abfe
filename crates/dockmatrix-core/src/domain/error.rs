//! Error taxonomy for dockmatrix.

/// Errors produced while reducing upstream version lists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("version {version:?} has no leading major component")]
    MissingMajor { version: String },

    #[error("invalid version {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("release channel {channel:?} has no parseable version")]
    EmptyChannel { channel: String },
}

/// dockmatrix errors.
#[derive(Debug, thiserror::Error)]
pub enum DockmatrixError {
    #[error("invalid tag pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("runtime index error: {0}")]
    RuntimeIndex(String),

    #[error("failed to start build for {reference}: {reason}")]
    BuildSpawn { reference: String, reason: String },

    #[error("build of {reference} failed with exit code {code}")]
    BuildFailed { reference: String, code: i32 },

    #[error("release API error: {message}")]
    ReleaseApi { status: Option<u16>, message: String },

    #[error("git error: {0}")]
    GitError(String),
}

impl DockmatrixError {
    /// Release API error carrying an HTTP status.
    pub fn release_status(status: u16, message: impl Into<String>) -> Self {
        DockmatrixError::ReleaseApi {
            status: Some(status),
            message: message.into(),
        }
    }

    /// True for a release lookup that came back 404.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DockmatrixError::ReleaseApi {
                status: Some(404),
                ..
            }
        )
    }

    /// Process exit code for this failure.
    ///
    /// A failed build exits with the build tool's own code; everything else
    /// exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            DockmatrixError::BuildFailed { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}

/// Result type for dockmatrix operations.
pub type Result<T> = std::result::Result<T, DockmatrixError>;
