use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("dataset with src_tag {src_tag} not found at {path}")]
    #[diagnostic(help("every configured src_tag needs a matching <src_tag>.json resource"))]
    ResourceNotFound { src_tag: String, path: PathBuf },

    #[error("malformed dataset {src_tag}: {reason}")]
    MalformedDataset { src_tag: String, reason: String },

    #[error("invalid src_tag: {0}")]
    InvalidSourceTag(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to parse SMILES search cache: {0}")]
    CacheParse(String),

    #[error("structure lookup request failed: {0}")]
    StructureHttp(String),

    #[error("structure lookup returned status {status}: {message}")]
    StructureStatus { status: u16, message: String },
}

impl From<rusqlite::Error> for BuildError {
    fn from(err: rusqlite::Error) -> Self {
        BuildError::Database(err.to_string())
    }
}
