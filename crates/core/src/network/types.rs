//! Request, certificate and listener types shared by all executors.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Certificate policy for a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy", content = "path")]
pub enum SslCertificate {
    /// Use the platform trust store.
    #[default]
    System,
    /// Trust the certificates in this PEM file in addition to the platform store.
    Custom(PathBuf),
    /// Accept any certificate.
    NoVerify,
}

/// A single request of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRequest {
    pub url: String,
    /// When present the request is a form POST with these fields.
    pub form: Option<Vec<(String, String)>>,
    pub certificate: SslCertificate,
}

impl NetworkRequest {
    /// Plain GET with the system certificate policy.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            form: None,
            certificate: SslCertificate::System,
        }
    }

    /// Form POST with the system certificate policy.
    pub fn post_form(url: impl Into<String>, form: Vec<(String, String)>) -> Self {
        Self {
            url: url.into(),
            form: Some(form),
            certificate: SslCertificate::System,
        }
    }

    pub fn with_certificate(mut self, certificate: SslCertificate) -> Self {
        self.certificate = certificate;
        self
    }
}

/// Progress and cancellation channel for a file transfer.
pub trait DownloadListener: Send + Sync {
    /// Called after every received chunk.
    fn on_progress(&self, _downloaded: u64, _total: Option<u64>) {}

    /// Polled between chunks; returning true aborts the transfer.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Errors reported by a network executor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Download cancelled")]
    Cancelled,

    #[error("No response received")]
    NoResponse,
}

impl From<std::io::Error> for NetworkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let get = NetworkRequest::get("http://example.com/feed");
        assert!(get.form.is_none());
        assert_eq!(get.certificate, SslCertificate::System);

        let post = NetworkRequest::post_form(
            "https://example.com/login",
            vec![("login".to_string(), "bob".to_string())],
        )
        .with_certificate(SslCertificate::NoVerify);
        assert_eq!(post.form.as_ref().unwrap().len(), 1);
        assert_eq!(post.certificate, SslCertificate::NoVerify);
    }

    #[test]
    fn test_certificate_serialization() {
        assert_eq!(
            serde_json::to_string(&SslCertificate::System).unwrap(),
            r#"{"policy":"system"}"#
        );
        let custom = SslCertificate::Custom(PathBuf::from("/etc/store.pem"));
        let json = serde_json::to_string(&custom).unwrap();
        let parsed: SslCertificate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, custom);
    }

    #[test]
    fn test_error_messages() {
        let err = NetworkError::Http {
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
        let io: NetworkError = std::io::Error::other("disk full").into();
        assert_eq!(io.to_string(), "I/O error: disk full");
    }
}
