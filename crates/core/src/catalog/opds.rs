//! Open feed (OPDS) catalog described by a descriptor file.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::network::NetworkRequest;
use crate::searcher::{OperationRequest, OperationState};

use super::{
    AdvancedQuery, Capabilities, CatalogBackend, CatalogDescriptor, FeedReader,
};

/// Catalog backed by an OPDS feed with an optional OpenSearch template.
pub struct OpdsCatalog {
    descriptor: CatalogDescriptor,
    enabled: AtomicBool,
    reader: Arc<dyn FeedReader>,
}

impl OpdsCatalog {
    pub fn from_descriptor(descriptor: CatalogDescriptor, reader: Arc<dyn FeedReader>) -> Self {
        let enabled = AtomicBool::new(descriptor.enabled);
        Self {
            descriptor,
            enabled,
            reader,
        }
    }

    pub fn descriptor(&self) -> &CatalogDescriptor {
        &self.descriptor
    }

    /// Fill the search template with URL-encoded terms.
    fn search_url(&self, terms: &str) -> Option<String> {
        let template = self.descriptor.links.search.as_deref()?;
        let encoded = urlencoding::encode(terms);
        Some(
            template
                .replace("{searchTerms}", &encoded)
                .replace("%s", &encoded),
        )
    }

    fn request(&self, url: String) -> OperationRequest {
        OperationRequest::new(
            NetworkRequest::get(url),
            &self.descriptor.site_name,
            Arc::clone(&self.reader),
        )
    }

    fn search(&self, state: &mut OperationState, terms: &str) -> Option<OperationRequest> {
        if terms.trim().is_empty() {
            return None;
        }
        let url = self.rewrite_url(&self.search_url(terms.trim())?, false);
        debug!(site = %self.descriptor.site_name, url = %url, "Building search request");
        state.clear_continuation();
        Some(self.request(url))
    }
}

impl CatalogBackend for OpdsCatalog {
    fn title(&self) -> &str {
        &self.descriptor.title
    }

    fn site_name(&self) -> &str {
        &self.descriptor.site_name
    }

    fn summary(&self) -> Option<&str> {
        self.descriptor.summary.as_deref()
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    fn capabilities(&self) -> Capabilities {
        let searchable = self.descriptor.links.search.is_some();
        Capabilities {
            simple_search: searchable,
            advanced_search: searchable,
            ..Capabilities::default()
        }
    }

    fn simple_search_request(
        &self,
        state: &mut OperationState,
        pattern: &str,
    ) -> Option<OperationRequest> {
        self.search(state, pattern)
    }

    fn advanced_search_request(
        &self,
        state: &mut OperationState,
        query: &AdvancedQuery,
    ) -> Option<OperationRequest> {
        self.search(state, &query.terms())
    }

    /// Next-page links come from the feed itself and are used verbatim.
    fn resume(&self, state: &mut OperationState) -> Option<OperationRequest> {
        state.take_continuation().map(|url| self.request(url))
    }

    fn rewrite_url(&self, url: &str, external: bool) -> String {
        self.descriptor
            .rewrite_rules
            .iter()
            .fold(url.to_string(), |acc, rule| rule.apply(&acc, external))
    }
}
