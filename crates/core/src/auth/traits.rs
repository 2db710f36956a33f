use async_trait::async_trait;
use thiserror::Error;

use super::types::AuthenticationStatus;
use crate::catalog::{BookFormat, CatalogEntry};
use crate::network::NetworkError;
use crate::settings::SettingsError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization required")]
    AuthorizationRequired,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("User name is not set")]
    MissingUserName,

    #[error("Purchase rejected: {0}")]
    PurchaseRejected(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("{0} is not supported by this catalog")]
    Unsupported(&'static str),
}

/// Session workflow of a catalog that requires signing in.
///
/// Implementations serialize their operations; every method observes the
/// effects of the calls that completed before it.
#[async_trait]
pub trait AuthenticationManager: Send + Sync {
    /// Cached status once checked. Otherwise, with `use_network`, the stored
    /// session is validated remotely; without it `Unchecked` is reported.
    async fn is_authorised(&self, use_network: bool) -> Result<AuthenticationStatus, AuthError>;

    async fn current_user_name(&self) -> String;

    /// Login name used by the next [`authorise`](Self::authorise).
    async fn set_user_name(&self, user_name: &str) -> Result<(), AuthError>;

    async fn authorise(&self, password: &str) -> Result<(), AuthError>;

    async fn log_out(&self) -> Result<(), AuthError>;

    /// Whether account data has not been loaded for the current session yet.
    async fn needs_initialization(&self) -> bool;

    async fn initialize(&self) -> Result<(), AuthError>;

    async fn need_purchase(&self, entry: &CatalogEntry) -> bool;

    async fn purchase_book(&self, entry: &CatalogEntry) -> Result<(), AuthError>;

    /// Refresh the purchased books and the account summary.
    async fn reload_purchased_books(&self) -> Result<(), AuthError>;

    /// Cached purchased books.
    async fn collect_purchased_books(&self) -> Vec<CatalogEntry>;

    async fn current_account(&self) -> Option<String>;

    async fn refill_account_link(&self) -> Option<String>;

    /// Identifier the downloaded file of `entry` is keyed by.
    fn network_book_id(&self, entry: &CatalogEntry) -> String;

    /// Session-bearing link for a book the current user may download.
    async fn download_link(&self, entry: &CatalogEntry) -> Option<String>;

    fn download_format(&self, entry: &CatalogEntry) -> BookFormat;

    fn registration_supported(&self) -> bool {
        false
    }

    async fn register_user(
        &self,
        _login: &str,
        _password: &str,
        _email: &str,
    ) -> Result<(), AuthError> {
        Err(AuthError::Unsupported("registration"))
    }

    fn password_recovery_supported(&self) -> bool {
        false
    }

    async fn recover_password(&self, _email: &str) -> Result<(), AuthError> {
        Err(AuthError::Unsupported("password recovery"))
    }
}
