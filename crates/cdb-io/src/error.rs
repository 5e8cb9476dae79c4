//! Error types for cdb-io

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Malformed fixed-width field, unexpected end of block, or unknown
    /// required header token. Always fatal to the current decode call.
    #[error("format error at line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("archive contains neither a node block nor an element block")]
    EmptyArchive,

    #[error("unsupported element shape: {0}")]
    UnsupportedShape(String),

    #[error("missing {0} numbers and allow_missing is disabled")]
    MissingNumbering(&'static str),

    #[error("invalid component type {0:?}: expected NODE or ELEMENT")]
    InvalidComponentType(String),

    #[error("parameters were not requested when the archive was read")]
    ParametersNotRequested,

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        ArchiveError::Format {
            line,
            message: message.into(),
        }
    }
}
