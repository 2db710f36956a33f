use std::path::PathBuf;
use thiserror::Error;

use super::IndexError;
use crate::network::NetworkError;

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("Unknown error: empty book identifier or URL")]
    EmptyLocator,

    #[error("Couldn't create directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Couldn't build a file name for {0}")]
    InvalidLocator(String),

    #[error("Local path index error: {0}")]
    Index(#[from] IndexError),

    #[error("Download failed: {0}")]
    Transfer(#[from] NetworkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
