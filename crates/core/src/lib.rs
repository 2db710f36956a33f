//! Aggregated search and acquisition over online book catalogs.
//!
//! The library fans searches out to every enabled catalog, manages the
//! sign-in and purchase state of bookstore catalogs, and downloads books into
//! a local directory at most once per book.

pub mod acquisition;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod library;
pub mod metrics;
pub mod network;
pub mod registry;
pub mod searcher;
pub mod settings;
pub mod testing;

pub use acquisition::{
    normalize_url, AcquisitionError, AcquisitionManager, DownloadRequest, LocalPathIndex,
    SqlitePathIndex,
};
pub use auth::{
    AuthError, AuthenticationManager, AuthenticationStatus, BookstoreSession, StoreReplyReader,
};
pub use catalog::{
    AdvancedQuery, BookFormat, CatalogBackend, CatalogEntry, FeedReader, OpdsCatalog,
};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use library::{Collaborators, LibraryError, NetworkLibrary};
pub use network::{DownloadListener, HttpExecutor, NetworkError, NetworkExecutor};
pub use registry::CatalogRegistry;
pub use searcher::{BookCollection, SearchError, SearchOrchestrator, SearchOutcome};
pub use settings::{SettingsStore, SqliteSettingsStore};
