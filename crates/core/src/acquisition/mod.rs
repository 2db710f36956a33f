//! Book acquisition.
//!
//! Maps remote book identifiers to files under the download root and drives
//! the transfer. A normalized identifier owns at most one local file; the
//! mapping is recorded in a [`LocalPathIndex`] before the transfer starts and
//! the file's presence on disk marks a finished download.

mod error;
mod index;
mod manager;
mod normalize;
mod path;

pub use error::AcquisitionError;
pub use index::{IndexError, LocalPathIndex, SqlitePathIndex};
pub use manager::{AcquisitionManager, DownloadRequest};
pub use normalize::normalize_url;
pub use path::book_file_path;
