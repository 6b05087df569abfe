//! Build tool failures.

use dockmatrix_core::DockmatrixError;

#[derive(Debug, thiserror::Error)]
pub enum BuildxError {
    #[error("could not start {program} for {reference}: {source}")]
    Spawn {
        program: String,
        reference: String,
        #[source]
        source: std::io::Error,
    },

    #[error("build of {reference} exited with code {code}")]
    Failed { reference: String, code: i32 },

    /// Terminated without an exit code, e.g. by a signal.
    #[error("build of {reference} was terminated")]
    Terminated { reference: String },
}

impl BuildxError {
    /// Exit code the process should end with.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildxError::Failed { code, .. } => *code,
            _ => 1,
        }
    }
}

impl From<BuildxError> for DockmatrixError {
    fn from(err: BuildxError) -> Self {
        let code = err.exit_code();
        match err {
            BuildxError::Spawn {
                program,
                reference,
                source,
            } => DockmatrixError::BuildSpawn {
                reference,
                reason: format!("{program}: {source}"),
            },
            BuildxError::Failed { reference, .. } | BuildxError::Terminated { reference } => {
                DockmatrixError::BuildFailed { reference, code }
            }
        }
    }
}
