//! Catalog backends.
//!
//! A catalog backend is one remote book source: an open OPDS feed described by
//! a descriptor file, or the built-in bookstore with its own session and
//! purchase protocol. Backends only build requests; the search orchestrator
//! runs them and the backend's [`FeedReader`] turns response bodies into
//! [`CatalogEntry`] values.

mod bookstore;
mod descriptor;
mod opds;
mod types;

pub use bookstore::BookstoreCatalog;
pub use descriptor::{
    CatalogDescriptor, DescriptorError, DescriptorLinks, DescriptorReader, RuleScope,
    TomlDescriptorReader, UrlRewritingRule,
};
pub use opds::OpdsCatalog;
pub use types::*;

use std::sync::Arc;
use thiserror::Error;

use crate::auth::AuthenticationManager;
use crate::network::SslCertificate;
use crate::searcher::{OperationRequest, OperationState};

/// Errors a feed reader reports for a response body it cannot use.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("Malformed feed: {0}")]
    Malformed(String),

    #[error("Catalog reported an error: {0}")]
    Remote(String),
}

/// Parses one response body of a catalog into a page of entries.
pub trait FeedReader: Send + Sync {
    /// `site_name` identifies the catalog the body came from and is stamped on
    /// every produced entry.
    fn read_feed(&self, site_name: &str, body: &[u8]) -> Result<FeedPage, FeedError>;
}

/// One remote book source.
pub trait CatalogBackend: Send + Sync {
    /// Display title, also the sort key of the registry.
    fn title(&self) -> &str;

    /// Host fragment identifying URLs that belong to this catalog.
    fn site_name(&self) -> &str;

    fn summary(&self) -> Option<&str> {
        None
    }

    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);

    fn capabilities(&self) -> Capabilities;

    /// First request of a free-text search, or `None` if this catalog has
    /// nothing to ask for this pattern.
    fn simple_search_request(
        &self,
        state: &mut OperationState,
        pattern: &str,
    ) -> Option<OperationRequest>;

    /// First request of a field search.
    fn advanced_search_request(
        &self,
        _state: &mut OperationState,
        _query: &AdvancedQuery,
    ) -> Option<OperationRequest> {
        None
    }

    /// Next round of an operation (next page, next protocol step).
    fn resume(&self, state: &mut OperationState) -> Option<OperationRequest>;

    /// Rewrite a URL belonging to this catalog, e.g. to tag links shown
    /// outside the application.
    fn rewrite_url(&self, url: &str, _external: bool) -> String {
        url.to_string()
    }

    fn certificate(&self) -> SslCertificate {
        SslCertificate::System
    }

    /// Session manager for catalogs that require signing in.
    fn authentication_manager(&self) -> Option<Arc<dyn AuthenticationManager>> {
        None
    }
}
