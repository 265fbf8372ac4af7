use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced across process boundaries (CLI, file I/O). Violations of the
/// algorithmic contracts in `regress`/`binning` are programmer errors and `panic!`
/// instead, matching the rest of this crate's validation style.
#[derive(Debug, Error)]
pub enum QalgoError {
    #[error("input path does not exist or is not readable: {0}")]
    MissingInput(PathBuf),

    #[error("expected a .mzML file, got: {0}")]
    BadExtension(PathBuf),

    #[error("-f/-file and -r/-recursive are mutually exclusive")]
    ConflictingInputMode,

    #[error("neither -f/-file nor -r/-recursive was given")]
    NoInputMode,

    #[error("output directory does not exist: {0}")]
    SummaryDirMissing(PathBuf),

    #[error("unknown binning subset method: {0}")]
    UnknownSubsetMethod(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QalgoError>;

impl QalgoError {
    /// Maps to the exit codes fixed by the CLI contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            QalgoError::MissingInput(_) => 101,
            QalgoError::BadExtension(_) => 101,
            QalgoError::ConflictingInputMode => 100,
            QalgoError::NoInputMode => 100,
            QalgoError::UnknownSubsetMethod(_) => 201,
            QalgoError::SummaryDirMissing(_) => 0, // warning, not fatal
            QalgoError::Io(_) => 1,
            QalgoError::Json(_) => 1,
        }
    }
}
