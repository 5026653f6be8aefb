use crate::codec::CodecError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Record not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Invalid schema for {}: {source}", path.display())]
    InvalidSchema {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Encode error: {0}")]
    Encode(CodecError),

    #[error("Invalid record id: {0:?}")]
    InvalidId(String),

    #[error("Config error: {0}")]
    Config(#[from] serde_yaml::Error),
}

impl Error {
    /// True for the record-absent case, however it was detected.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
