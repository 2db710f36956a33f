//! Network execution engine abstraction.
//!
//! Catalog backends never touch the transport directly. They describe what to
//! fetch as [`NetworkRequest`]s, and a [`NetworkExecutor`] runs a whole batch of
//! them concurrently, handing back one outcome per request in submission order.
//! Book files are streamed to disk through [`NetworkExecutor::download_file`],
//! which reports progress to (and can be cancelled by) a [`DownloadListener`].

mod http;
mod types;

pub use http::HttpExecutor;
pub use types::*;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Runs network requests on behalf of the search, session and acquisition layers.
#[async_trait]
pub trait NetworkExecutor: Send + Sync {
    /// Executor name for logging.
    fn name(&self) -> &str;

    /// Execute all requests of a batch and wait until every one has finished.
    ///
    /// The returned vector has exactly one entry per request, in the order the
    /// requests were submitted.
    async fn execute_batch(
        &self,
        requests: Vec<NetworkRequest>,
    ) -> Vec<Result<Vec<u8>, NetworkError>>;

    /// Stream `url` into `destination`.
    async fn download_file(
        &self,
        url: &str,
        certificate: &SslCertificate,
        destination: &Path,
        listener: Option<Arc<dyn DownloadListener>>,
    ) -> Result<(), NetworkError>;

    /// Execute a single request.
    async fn execute(&self, request: NetworkRequest) -> Result<Vec<u8>, NetworkError> {
        self.execute_batch(vec![request])
            .await
            .into_iter()
            .next()
            .unwrap_or(Err(NetworkError::NoResponse))
    }
}
