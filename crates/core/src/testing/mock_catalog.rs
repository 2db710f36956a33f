//! Mock catalog backend for testing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::JsonFeedReader;
use crate::catalog::{AdvancedQuery, Capabilities, CatalogBackend};
use crate::network::NetworkRequest;
use crate::searcher::{OperationRequest, OperationState};

/// Catalog whose requests go to `mock://<site>/...` URLs and whose responses
/// are JSON feed pages.
///
/// External links are marked with a `#external` fragment so rewriting is
/// observable in tests.
#[derive(Debug)]
pub struct MockCatalog {
    title: String,
    site_name: String,
    enabled: AtomicBool,
}

impl MockCatalog {
    pub fn new(title: &str, site_name: &str) -> Self {
        Self {
            title: title.to_string(),
            site_name: site_name.to_string(),
            enabled: AtomicBool::new(true),
        }
    }

    /// URL of the simple search request for `pattern`.
    pub fn search_url(&self, pattern: &str) -> String {
        format!(
            "mock://{}/search?q={}",
            self.site_name,
            urlencoding::encode(pattern)
        )
    }

    /// URL of the advanced search request for `query`.
    pub fn advanced_url(&self, query: &AdvancedQuery) -> String {
        format!(
            "mock://{}/advanced?q={}",
            self.site_name,
            urlencoding::encode(&query.terms())
        )
    }

    fn request(&self, url: String) -> OperationRequest {
        OperationRequest::new(
            NetworkRequest::get(url),
            &self.site_name,
            Arc::new(JsonFeedReader),
        )
    }
}

impl CatalogBackend for MockCatalog {
    fn title(&self) -> &str {
        &self.title
    }

    fn site_name(&self) -> &str {
        &self.site_name
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            simple_search: true,
            advanced_search: true,
            ..Capabilities::default()
        }
    }

    fn simple_search_request(
        &self,
        state: &mut OperationState,
        pattern: &str,
    ) -> Option<OperationRequest> {
        state.clear_continuation();
        Some(self.request(self.search_url(pattern)))
    }

    fn advanced_search_request(
        &self,
        state: &mut OperationState,
        query: &AdvancedQuery,
    ) -> Option<OperationRequest> {
        if query.is_empty() {
            return None;
        }
        state.clear_continuation();
        Some(self.request(self.advanced_url(query)))
    }

    fn resume(&self, state: &mut OperationState) -> Option<OperationRequest> {
        state.take_continuation().map(|url| self.request(url))
    }

    fn rewrite_url(&self, url: &str, external: bool) -> String {
        if external {
            format!("{}#external", url)
        } else {
            url.to_string()
        }
    }
}
