//! Deduplicating download driver.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, info, warn};

use super::{book_file_path, normalize_url, AcquisitionError, LocalPathIndex};
use crate::catalog::BookFormat;
use crate::metrics;
use crate::network::{DownloadListener, NetworkExecutor, SslCertificate};

/// One book to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Identifier the local file is keyed by. Usually the canonical book URL.
    pub remote_id: String,
    /// URL the bytes are fetched from. May carry session parameters.
    pub url: String,
    pub format: BookFormat,
    pub certificate: SslCertificate,
}

impl DownloadRequest {
    /// Request whose identifier is the download URL itself.
    pub fn new(url: impl Into<String>, format: BookFormat) -> Self {
        let url = url.into();
        Self {
            remote_id: url.clone(),
            url,
            format,
            certificate: SslCertificate::System,
        }
    }

    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = remote_id.into();
        self
    }

    pub fn with_certificate(mut self, certificate: SslCertificate) -> Self {
        self.certificate = certificate;
        self
    }
}

type IdLock = Arc<tokio::sync::Mutex<()>>;

/// Downloads books into the download root, at most once per identifier.
pub struct AcquisitionManager {
    download_root: PathBuf,
    index: Arc<dyn LocalPathIndex>,
    executor: Arc<dyn NetworkExecutor>,
    in_flight: Mutex<HashMap<String, IdLock>>,
}

impl AcquisitionManager {
    pub fn new(
        download_root: PathBuf,
        index: Arc<dyn LocalPathIndex>,
        executor: Arc<dyn NetworkExecutor>,
    ) -> Self {
        Self {
            download_root,
            index,
            executor,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    /// Recorded file for `remote_id`, whether or not it still exists.
    pub fn local_path(&self, remote_id: &str) -> Result<Option<PathBuf>, AcquisitionError> {
        Ok(self.index.get(&normalize_url(remote_id))?)
    }

    /// Where a book from `url` would be stored. See [`book_file_path`].
    pub fn build_local_path(
        &self,
        url: &str,
        format: BookFormat,
        create_directories: bool,
    ) -> Result<Option<PathBuf>, AcquisitionError> {
        book_file_path(&self.download_root, url, format, create_directories)
    }

    /// Fetch a book unless a file for its identifier is already on disk.
    ///
    /// Downloads of the same normalized identifier run one at a time; the
    /// second caller finds the first caller's file.
    pub async fn download(
        &self,
        request: &DownloadRequest,
        listener: Option<Arc<dyn DownloadListener>>,
    ) -> Result<PathBuf, AcquisitionError> {
        let remote_id = normalize_url(&request.remote_id);
        let url = normalize_url(&request.url);
        if remote_id.is_empty() || url.is_empty() {
            return Err(AcquisitionError::EmptyLocator);
        }

        let entry = self.lock_for(&remote_id);
        let _held = entry.lock.lock().await;
        self.download_locked(&remote_id, &url, request, listener)
            .await
    }

    async fn download_locked(
        &self,
        remote_id: &str,
        url: &str,
        request: &DownloadRequest,
        listener: Option<Arc<dyn DownloadListener>>,
    ) -> Result<PathBuf, AcquisitionError> {
        if let Some(stored) = self.index.get(remote_id)? {
            if is_file(&stored).await {
                debug!(remote_id = %remote_id, path = %stored.display(), "Book already downloaded");
                metrics::DOWNLOADS_TOTAL.with_label_values(&["cached"]).inc();
                return Ok(stored);
            }
        }

        let path = book_file_path(&self.download_root, remote_id, request.format, true)?
            .ok_or_else(|| AcquisitionError::InvalidLocator(remote_id.to_string()))?;

        if tokio::fs::try_exists(&path).await? {
            debug!(path = %path.display(), "Removing stale file");
            tokio::fs::remove_file(&path).await?;
        }
        self.index.set(remote_id, &path)?;

        let start = Instant::now();
        match self
            .executor
            .download_file(url, &request.certificate, &path, listener)
            .await
        {
            Ok(()) => {
                metrics::DOWNLOADS_TOTAL.with_label_values(&["success"]).inc();
                metrics::DOWNLOAD_DURATION.observe(start.elapsed().as_secs_f64());
                info!(
                    remote_id = %remote_id,
                    path = %path.display(),
                    format = %request.format,
                    "Book downloaded"
                );
                Ok(path)
            }
            Err(e) => {
                metrics::DOWNLOADS_TOTAL.with_label_values(&["failed"]).inc();
                warn!(remote_id = %remote_id, url = %url, error = %e, "Book download failed");
                // the mapping stays as a reservation; the file must not
                if let Err(remove) = tokio::fs::remove_file(&path).await {
                    if remove.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %path.display(), error = %remove, "Failed to remove partial book");
                    }
                }
                Err(e.into())
            }
        }
    }

    fn lock_for(&self, remote_id: &str) -> InFlight<'_> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let lock = Arc::clone(in_flight.entry(remote_id.to_string()).or_default());
        InFlight {
            manager: self,
            remote_id: remote_id.to_string(),
            lock,
        }
    }
}

/// Claim on the lock of one identifier. Dropping it forgets the lock once
/// no other download waits on it, also when the download future is dropped.
struct InFlight<'a> {
    manager: &'a AcquisitionManager,
    remote_id: String,
    lock: IdLock,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .manager
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        // one reference in the map, one held here
        if Arc::strong_count(&self.lock) == 2 {
            in_flight.remove(&self.remote_id);
        }
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
