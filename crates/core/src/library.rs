//! Composition root of the network library.
//!
//! [`NetworkLibrary`] owns the catalog registry, the search orchestrator and
//! the acquisition manager, and is the one object applications hold.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::acquisition::{
    AcquisitionError, AcquisitionManager, DownloadRequest, IndexError, LocalPathIndex,
    SqlitePathIndex,
};
use crate::auth::{AuthError, StoreReplyReader};
use crate::catalog::{
    AdvancedQuery, BookFormat, BookstoreCatalog, CatalogBackend, CatalogEntry, DescriptorReader,
    FeedReader, TomlDescriptorReader,
};
use crate::config::{validate_config, Config, ConfigError};
use crate::network::{DownloadListener, HttpExecutor, NetworkExecutor, SslCertificate};
use crate::registry::CatalogRegistry;
use crate::searcher::{SearchOrchestrator, SearchOutcome};
use crate::settings::{SettingsError, SettingsStore, SqliteSettingsStore};

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("Local path index error: {0}")]
    Index(#[from] IndexError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Unknown catalog: {0}")]
    UnknownCatalog(String),

    #[error("No download link for \"{0}\"")]
    NoDownloadLink(String),

    #[error("\"{0}\" must be purchased before it can be downloaded")]
    PurchaseRequired(String),
}

/// External collaborators of the library.
pub struct Collaborators {
    pub executor: Arc<dyn NetworkExecutor>,
    pub feed_reader: Arc<dyn FeedReader>,
    pub store_replies: Arc<dyn StoreReplyReader>,
    pub descriptors: Arc<dyn DescriptorReader>,
    pub settings: Arc<dyn SettingsStore>,
    pub path_index: Arc<dyn LocalPathIndex>,
}

impl Collaborators {
    /// HTTP executor, TOML descriptors and SQLite stores in `library.database`.
    /// Only the format parsers have to be supplied.
    pub fn with_defaults(
        config: &Config,
        feed_reader: Arc<dyn FeedReader>,
        store_replies: Arc<dyn StoreReplyReader>,
    ) -> Result<Self, LibraryError> {
        let database = &config.library.database;
        Ok(Self {
            executor: Arc::new(HttpExecutor::new(config.network.clone())),
            feed_reader,
            store_replies,
            descriptors: Arc::new(TomlDescriptorReader::new()),
            settings: Arc::new(SqliteSettingsStore::new(database)?),
            path_index: Arc::new(SqlitePathIndex::new(database)?),
        })
    }
}

pub struct NetworkLibrary {
    registry: CatalogRegistry,
    search: SearchOrchestrator,
    acquisition: AcquisitionManager,
}

impl NetworkLibrary {
    pub fn new(
        registry: CatalogRegistry,
        executor: Arc<dyn NetworkExecutor>,
        path_index: Arc<dyn LocalPathIndex>,
        download_root: PathBuf,
    ) -> Self {
        Self {
            registry,
            search: SearchOrchestrator::new(Arc::clone(&executor)),
            acquisition: AcquisitionManager::new(download_root, path_index, executor),
        }
    }

    /// Build the library described by `config`: the configured bookstore plus
    /// every catalog descriptor in `library.catalog_dir`.
    pub fn from_config(config: &Config, collaborators: Collaborators) -> Result<Self, LibraryError> {
        validate_config(config)?;

        let mut builtin: Vec<Arc<dyn CatalogBackend>> = Vec::new();
        if let Some(bookstore) = &config.bookstore {
            debug!(site = %bookstore.site_name, "Adding bookstore catalog");
            builtin.push(Arc::new(BookstoreCatalog::new(
                bookstore.clone(),
                Arc::clone(&collaborators.executor),
                Arc::clone(&collaborators.feed_reader),
                Arc::clone(&collaborators.store_replies),
                Arc::clone(&collaborators.settings),
            )));
        }

        let registry = CatalogRegistry::load(
            builtin,
            &config.library.catalog_dir,
            collaborators.descriptors.as_ref(),
            Arc::clone(&collaborators.feed_reader),
        );

        info!(
            catalogs = registry.size(),
            download_dir = %config.library.download_dir.display(),
            executor = collaborators.executor.name(),
            "Network library ready"
        );

        Ok(Self::new(
            registry,
            collaborators.executor,
            collaborators.path_index,
            config.library.download_dir.clone(),
        ))
    }

    pub fn registry(&self) -> &CatalogRegistry {
        &self.registry
    }

    pub fn acquisition(&self) -> &AcquisitionManager {
        &self.acquisition
    }

    pub async fn simple_search(&self, pattern: &str) -> SearchOutcome {
        self.search.simple_search(&self.registry, pattern).await
    }

    pub async fn advanced_search(&self, query: &AdvancedQuery) -> SearchOutcome {
        self.search.advanced_search(&self.registry, query).await
    }

    pub fn rewrite_url(&self, url: &str, external: bool) -> String {
        self.registry.rewrite_url(url, external)
    }

    /// Recorded local file of a remote book identifier.
    pub fn local_path(&self, remote_id: &str) -> Result<Option<PathBuf>, LibraryError> {
        Ok(self.acquisition.local_path(remote_id)?)
    }

    /// Download `entry` in `format`, or in its best available format.
    ///
    /// Books that must be bought are fetched through the owning catalog's
    /// session, which supplies the identifier, link and format.
    pub async fn download_book(
        &self,
        entry: &CatalogEntry,
        format: Option<BookFormat>,
        listener: Option<Arc<dyn DownloadListener>>,
    ) -> Result<PathBuf, LibraryError> {
        let request = self.download_request(entry, format).await?;
        debug!(
            site = %entry.site_name,
            book = %entry.id,
            url = %request.url,
            format = %request.format,
            "Downloading book"
        );
        Ok(self.acquisition.download(&request, listener).await?)
    }

    async fn download_request(
        &self,
        entry: &CatalogEntry,
        format: Option<BookFormat>,
    ) -> Result<DownloadRequest, LibraryError> {
        let backend = self.registry.backend_for_site(&entry.site_name);
        let certificate = backend.map_or(SslCertificate::System, |b| b.certificate());

        let gated = entry.purchase_required && format != Some(BookFormat::TrialFb2Zip);
        if gated {
            let manager = backend
                .and_then(|b| b.authentication_manager())
                .ok_or_else(|| LibraryError::UnknownCatalog(entry.site_name.clone()))?;
            if manager.need_purchase(entry).await {
                return Err(LibraryError::PurchaseRequired(entry.title.clone()));
            }
            let url = manager
                .download_link(entry)
                .await
                .ok_or_else(|| LibraryError::NoDownloadLink(entry.title.clone()))?;
            return Ok(DownloadRequest::new(url, manager.download_format(entry))
                .with_remote_id(manager.network_book_id(entry))
                .with_certificate(certificate));
        }

        let link = match format {
            Some(format) => entry.url_for(format).map(|url| (format, url)),
            None => entry.preferred_url().map(|u| (u.format, u.url.as_str())),
        };
        let (format, url) = link.ok_or_else(|| LibraryError::NoDownloadLink(entry.title.clone()))?;
        Ok(DownloadRequest::new(url, format).with_certificate(certificate))
    }
}
