//! `reqwest` based network executor.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Certificate, Client};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::NetworkConfig;
use crate::metrics;

use super::{DownloadListener, NetworkError, NetworkExecutor, NetworkRequest, SslCertificate};

/// Executes batches over HTTP(S), one `reqwest::Client` per certificate policy.
pub struct HttpExecutor {
    config: NetworkConfig,
    clients: Mutex<HashMap<SslCertificate, Client>>,
}

impl HttpExecutor {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client_for(&self, certificate: &SslCertificate) -> Result<Client, NetworkError> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| NetworkError::ConnectionFailed("client cache poisoned".to_string()))?;
        if let Some(client) = clients.get(certificate) {
            return Ok(client.clone());
        }

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs as u64))
            .user_agent(self.config.user_agent.clone())
            .cookie_store(true);

        match certificate {
            SslCertificate::System => {}
            SslCertificate::Custom(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    NetworkError::Certificate(format!("{}: {}", path.display(), e))
                })?;
                let cert = Certificate::from_pem(&pem)
                    .map_err(|e| NetworkError::Certificate(e.to_string()))?;
                builder = builder.add_root_certificate(cert);
            }
            SslCertificate::NoVerify => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        let client = builder
            .build()
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;
        clients.insert(certificate.clone(), client.clone());
        Ok(client)
    }

    async fn send(&self, request: &NetworkRequest) -> Result<reqwest::Response, NetworkError> {
        let client = self.client_for(&request.certificate)?;
        let builder = match &request.form {
            Some(form) => client.post(&request.url).form(form),
            None => client.get(&request.url),
        };

        let response = builder.send().await.map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NetworkError::Http {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Ok(response)
    }

    async fn fetch(&self, request: NetworkRequest) -> Result<Vec<u8>, NetworkError> {
        let start = Instant::now();
        debug!(url = %request.url, post = request.form.is_some(), "Fetching");

        let result = match self.send(&request).await {
            Ok(response) => response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(map_reqwest_error),
            Err(e) => Err(e),
        };

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::NETWORK_REQUESTS.with_label_values(&[status]).inc();
        metrics::NETWORK_REQUEST_DURATION
            .with_label_values(&[status])
            .observe(start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            warn!(url = %request.url, error = %e, "Request failed");
        }
        result
    }
}

#[async_trait]
impl NetworkExecutor for HttpExecutor {
    fn name(&self) -> &str {
        "http"
    }

    async fn execute_batch(
        &self,
        requests: Vec<NetworkRequest>,
    ) -> Vec<Result<Vec<u8>, NetworkError>> {
        debug!(requests = requests.len(), "Executing batch");

        // `buffered` keeps submission order regardless of completion order
        stream::iter(requests)
            .map(|request| self.fetch(request))
            .buffered(self.config.max_concurrent_requests.max(1))
            .collect()
            .await
    }

    async fn download_file(
        &self,
        url: &str,
        certificate: &SslCertificate,
        destination: &Path,
        listener: Option<Arc<dyn DownloadListener>>,
    ) -> Result<(), NetworkError> {
        let request = NetworkRequest::get(url).with_certificate(certificate.clone());
        let response = self.send(&request).await?;

        let partial = partial_path(destination);
        match stream_to_file(url, response, &partial, listener).await {
            Ok(downloaded) => {
                tokio::fs::rename(&partial, destination).await?;
                debug!(url = url, bytes = downloaded, path = %destination.display(), "Download complete");
                Ok(())
            }
            Err(e) => {
                if let Err(remove) = tokio::fs::remove_file(&partial).await {
                    if remove.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %partial.display(), error = %remove, "Failed to remove partial download");
                    }
                }
                Err(e)
            }
        }
    }
}

/// Sibling file a transfer is written to until it completes.
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

async fn stream_to_file(
    url: &str,
    mut response: reqwest::Response,
    path: &Path,
    listener: Option<Arc<dyn DownloadListener>>,
) -> Result<u64, NetworkError> {
    let total = response.content_length();
    let mut file = File::create(path).await?;
    let mut downloaded = 0u64;

    while let Some(chunk) = response.chunk().await.map_err(map_reqwest_error)? {
        if listener.as_ref().is_some_and(|l| l.is_cancelled()) {
            debug!(url = url, downloaded = downloaded, "Download cancelled");
            return Err(NetworkError::Cancelled);
        }
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        if let Some(l) = &listener {
            l.on_progress(downloaded, total);
        }
    }

    file.flush().await?;
    Ok(downloaded)
}

fn map_reqwest_error(e: reqwest::Error) -> NetworkError {
    if e.is_timeout() {
        NetworkError::Timeout
    } else if e.is_connect() {
        NetworkError::ConnectionFailed(e.to_string())
    } else if let Some(status) = e.status() {
        NetworkError::Http {
            status: status.as_u16(),
            message: e.to_string(),
        }
    } else {
        NetworkError::ConnectionFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_cached_per_policy() {
        let executor = HttpExecutor::new(NetworkConfig::default());
        executor.client_for(&SslCertificate::System).unwrap();
        executor.client_for(&SslCertificate::System).unwrap();
        executor.client_for(&SslCertificate::NoVerify).unwrap();
        assert_eq!(executor.clients.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_custom_certificate() {
        let executor = HttpExecutor::new(NetworkConfig::default());
        let result = executor.client_for(&SslCertificate::Custom("/nonexistent/store.pem".into()));
        assert!(matches!(result, Err(NetworkError::Certificate(_))));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let executor = HttpExecutor::new(NetworkConfig::default());
        assert!(executor.execute_batch(vec![]).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_reported_in_order() {
        let executor = HttpExecutor::new(NetworkConfig {
            timeout_secs: 2,
            ..NetworkConfig::default()
        });
        let results = executor
            .execute_batch(vec![
                NetworkRequest::get("http://127.0.0.1:9/a"),
                NetworkRequest::get("http://127.0.0.1:9/b"),
            ])
            .await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_err()));
    }
    #[test]
    fn test_partial_path_is_sibling() {
        assert_eq!(
            partial_path(Path::new("/books/a.org/1.epub")),
            PathBuf::from("/books/a.org/1.epub.part")
        );
    }

    /// Serve one response: headers announcing `declared` bytes, then `body`.
    async fn serve_once(declared: usize, body: &'static [u8]) -> String {
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                declared
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.flush().await.unwrap();
        });
        format!("http://{}/1.epub", addr)
    }

    #[tokio::test]
    async fn test_download_renames_completed_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let destination = dir.path().join("1.epub");
        let url = serve_once(10, b"FULL_BOOK!").await;

        let executor = HttpExecutor::new(NetworkConfig::default());
        executor
            .download_file(&url, &SslCertificate::System, &destination, None)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"FULL_BOOK!");
        assert!(!partial_path(&destination).exists());
    }

    #[tokio::test]
    async fn test_truncated_download_leaves_no_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let destination = dir.path().join("1.epub");
        let url = serve_once(10, b"HALF_").await;

        let executor = HttpExecutor::new(NetworkConfig {
            timeout_secs: 5,
            ..NetworkConfig::default()
        });
        let result = executor
            .download_file(&url, &SslCertificate::System, &destination, None)
            .await;

        assert!(result.is_err());
        assert!(!destination.exists());
        assert!(!partial_path(&destination).exists());
    }
}
