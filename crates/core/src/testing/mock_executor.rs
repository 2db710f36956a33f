//! Mock network executor for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::FeedPage;
use crate::network::{
    DownloadListener, NetworkError, NetworkExecutor, NetworkRequest, SslCertificate,
};

/// Mock implementation of the NetworkExecutor trait.
///
/// Responses are keyed by URL. Unknown URLs answer with HTTP 404. Requests,
/// batch sizes and downloads are recorded for assertions.
#[derive(Debug, Default)]
pub struct MockExecutor {
    responses: Arc<RwLock<HashMap<String, Result<Vec<u8>, NetworkError>>>>,
    requests: Arc<RwLock<Vec<NetworkRequest>>>,
    batches: Arc<RwLock<Vec<usize>>>,
    downloads: Arc<RwLock<Vec<String>>>,
    partials: Arc<RwLock<HashMap<String, (Vec<u8>, NetworkError)>>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `body`, for requests and downloads alike.
    pub async fn set_body(&self, url: &str, body: Vec<u8>) {
        self.responses.write().await.insert(url.to_string(), Ok(body));
    }

    /// Answer `url` with a serialized feed page.
    pub async fn set_page(&self, url: &str, page: FeedPage) {
        let body = serde_json::to_vec(&page).unwrap_or_default();
        self.set_body(url, body).await;
    }

    /// Fail every request to `url`.
    pub async fn set_error(&self, url: &str, error: NetworkError) {
        self.responses
            .write()
            .await
            .insert(url.to_string(), Err(error));
    }

    /// Interrupt the next download of `url`: write `bytes` to the
    /// destination, then fail with `error`. Later downloads use the
    /// configured body.
    pub async fn set_partial(&self, url: &str, bytes: Vec<u8>, error: NetworkError) {
        self.partials
            .write()
            .await
            .insert(url.to_string(), (bytes, error));
    }

    /// All executed requests, in order.
    pub async fn requests(&self) -> Vec<NetworkRequest> {
        self.requests.read().await.clone()
    }

    /// Size of every executed batch, in order.
    pub async fn batch_sizes(&self) -> Vec<usize> {
        self.batches.read().await.clone()
    }

    /// URLs of all download attempts, in order.
    pub async fn downloads(&self) -> Vec<String> {
        self.downloads.read().await.clone()
    }

    async fn respond(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        self.responses
            .read()
            .await
            .get(url)
            .cloned()
            .unwrap_or_else(|| {
                Err(NetworkError::Http {
                    status: 404,
                    message: "Not Found".to_string(),
                })
            })
    }
}

#[async_trait]
impl NetworkExecutor for MockExecutor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute_batch(
        &self,
        requests: Vec<NetworkRequest>,
    ) -> Vec<Result<Vec<u8>, NetworkError>> {
        self.batches.write().await.push(requests.len());
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            outcomes.push(self.respond(&request.url).await);
            self.requests.write().await.push(request);
        }
        outcomes
    }

    async fn download_file(
        &self,
        url: &str,
        _certificate: &SslCertificate,
        destination: &Path,
        listener: Option<Arc<dyn DownloadListener>>,
    ) -> Result<(), NetworkError> {
        self.downloads.write().await.push(url.to_string());
        if let Some((bytes, error)) = self.partials.write().await.remove(url) {
            tokio::fs::write(destination, &bytes).await?;
            return Err(error);
        }
        let body = self.respond(url).await?;

        if listener.as_ref().is_some_and(|l| l.is_cancelled()) {
            return Err(NetworkError::Cancelled);
        }
        tokio::fs::write(destination, &body).await?;
        if let Some(l) = &listener {
            l.on_progress(body.len() as u64, Some(body.len() as u64));
        }
        Ok(())
    }
}
