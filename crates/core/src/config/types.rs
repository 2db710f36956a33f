use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub bookstore: Option<BookstoreConfig>,
}

/// Local storage locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Root directory downloaded books are stored under.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Directory holding one catalog descriptor per file.
    #[serde(default = "default_catalog_dir")]
    pub catalog_dir: PathBuf,
    /// SQLite database for the local path index and persisted settings.
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            catalog_dir: default_catalog_dir(),
            database: default_database(),
        }
    }
}

impl LibraryConfig {
    /// Anchor relative locations at `base`, the directory of the config file.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        for path in [
            &mut self.download_dir,
            &mut self.catalog_dir,
            &mut self.database,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("Books")
}

fn default_catalog_dir() -> PathBuf {
    PathBuf::from("catalogs")
}

fn default_database() -> PathBuf {
    PathBuf::from("shelfnet.db")
}

/// HTTP transport settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Requests of one batch executed at the same time (default: 8)
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_concurrent_requests: default_max_concurrent_requests(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u32 {
    30
}

fn default_max_concurrent_requests() -> usize {
    8
}

fn default_user_agent() -> String {
    format!("shelfnet/{}", env!("CARGO_PKG_VERSION"))
}

/// Built-in bookstore backend
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookstoreConfig {
    pub title: String,
    /// Host fragment used to match URLs to this store (e.g. "litres.ru")
    pub site_name: String,
    /// Base URL for catalog browsing and search
    pub catalog_url: String,
    /// Base URL for login, purchase and account requests
    pub secure_url: String,
    /// Referrer tag appended to externally shown links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<String>,
    /// PEM file with the store's certificate chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_path: Option<PathBuf>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_enabled")]
    pub registration: bool,
    #[serde(default = "default_enabled")]
    pub password_recovery: bool,
}

fn default_enabled() -> bool {
    true
}
