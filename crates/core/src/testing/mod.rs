//! Testing utilities and mock implementations.
//!
//! This module provides in-memory implementations of every collaborator
//! trait, so searches, sessions and downloads can be exercised without a
//! network or real catalogs.
//!
//! # Example
//!
//! ```rust,ignore
//! use shelfnet_core::testing::{fixtures, MockCatalog, MockExecutor};
//!
//! let executor = Arc::new(MockExecutor::new());
//! let catalog = Arc::new(MockCatalog::new("Feedbooks", "feedbooks.com"));
//!
//! // Configure the response of the catalog's search request
//! executor
//!     .set_page(&catalog.search_url("dune"), fixtures::page("feedbooks.com", &["Dune"], None))
//!     .await;
//!
//! // Run a search through SearchOrchestrator or NetworkLibrary...
//! ```

mod json_readers;
mod memory_settings;
mod mock_catalog;
mod mock_executor;

pub use json_readers::{JsonFeedReader, JsonStoreReplies};
pub use memory_settings::MemorySettingsStore;
pub use mock_catalog::MockCatalog;
pub use mock_executor::MockExecutor;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::catalog::{BookFormat, BookUrl, CatalogEntry, FeedPage};
    use crate::config::BookstoreConfig;

    /// Free book with one ePub link.
    pub fn entry(site_name: &str, id: &str, title: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            site_name: site_name.to_string(),
            title: title.to_string(),
            authors: vec!["Test Author".to_string()],
            summary: None,
            tags: Vec::new(),
            urls: vec![BookUrl {
                format: BookFormat::Epub,
                url: format!("http://{}/book/{}.epub", site_name, id),
            }],
            purchase_required: false,
            price: None,
        }
    }

    /// Bookstore book that must be bought; only a trial link is public.
    pub fn purchasable_entry(site_name: &str, id: &str, title: &str) -> CatalogEntry {
        CatalogEntry {
            urls: vec![BookUrl {
                format: BookFormat::TrialFb2Zip,
                url: format!("http://{}/trial/{}.fb2.zip", site_name, id),
            }],
            purchase_required: true,
            price: Some("99.00 RUB".to_string()),
            ..entry(site_name, id, title)
        }
    }

    /// Feed page with one entry per title.
    pub fn page(site_name: &str, titles: &[&str], next_url: Option<&str>) -> FeedPage {
        FeedPage {
            entries: titles
                .iter()
                .map(|t| entry(site_name, &t.to_lowercase().replace(' ', "-"), t))
                .collect(),
            next_url: next_url.map(str::to_string),
        }
    }

    /// Bookstore configuration with the public robot endpoints.
    pub fn bookstore_config() -> BookstoreConfig {
        BookstoreConfig {
            title: "LitRes".to_string(),
            site_name: "litres.ru".to_string(),
            catalog_url: "http://robot.litres.ru/pages".to_string(),
            secure_url: "https://robot.litres.ru/pages".to_string(),
            partner_id: Some("8076".to_string()),
            certificate_path: None,
            enabled: true,
            registration: true,
            password_recovery: true,
        }
    }
}
