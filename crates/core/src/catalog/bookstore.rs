//! Built-in bookstore catalog.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::auth::{AuthenticationManager, BookstoreSession, StoreReplyReader};
use crate::config::BookstoreConfig;
use crate::network::{NetworkExecutor, NetworkRequest, SslCertificate};
use crate::searcher::{OperationRequest, OperationState};
use crate::settings::SettingsStore;

use super::descriptor::append_parameter;
use super::{AdvancedQuery, Capabilities, CatalogBackend, FeedReader};

const SEARCH_PATH: &str = "catalit_browser/";
const PARTNER_PARAMETER: &str = "lfrom";

/// Proprietary bookstore with sign-in, purchases and an account.
pub struct BookstoreCatalog {
    config: BookstoreConfig,
    enabled: AtomicBool,
    reader: Arc<dyn FeedReader>,
    session: Arc<BookstoreSession>,
}

impl BookstoreCatalog {
    pub fn new(
        config: BookstoreConfig,
        executor: Arc<dyn NetworkExecutor>,
        reader: Arc<dyn FeedReader>,
        replies: Arc<dyn StoreReplyReader>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        let session = Arc::new(BookstoreSession::new(&config, executor, replies, settings));
        Self {
            enabled: AtomicBool::new(config.enabled),
            config,
            reader,
            session,
        }
    }

    pub fn session(&self) -> &Arc<BookstoreSession> {
        &self.session
    }

    fn search_url(&self, params: &[(&str, &str)]) -> String {
        let mut url = format!(
            "{}/{}?checkpoint=2000-01-01",
            self.config.catalog_url.trim_end_matches('/'),
            SEARCH_PATH
        );
        for (name, value) in params {
            url.push_str(&format!("&{}={}", name, urlencoding::encode(value)));
        }
        url
    }

    fn request(&self, url: String) -> OperationRequest {
        OperationRequest::new(
            NetworkRequest::get(url).with_certificate(self.certificate()),
            &self.config.site_name,
            Arc::clone(&self.reader),
        )
    }
}

impl CatalogBackend for BookstoreCatalog {
    fn title(&self) -> &str {
        &self.config.title
    }

    fn site_name(&self) -> &str {
        &self.config.site_name
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
            authentication: true,
            purchase: true,
            registration: self.config.registration,
            password_recovery: self.config.password_recovery,
        }
    }

    fn simple_search_request(
        &self,
        state: &mut OperationState,
        pattern: &str,
    ) -> Option<OperationRequest> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return None;
        }
        state.clear_continuation();
        Some(self.request(self.search_url(&[("search", pattern)])))
    }

    fn advanced_search_request(
        &self,
        state: &mut OperationState,
        query: &AdvancedQuery,
    ) -> Option<OperationRequest> {
        let params: Vec<(&str, &str)> = [
            ("search_title", query.title_and_series.trim()),
            ("search_person", query.author.trim()),
            ("search_tag", query.tag.trim()),
            ("search_annotation", query.annotation.trim()),
        ]
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .collect();

        if params.is_empty() {
            return None;
        }
        debug!(site = %self.config.site_name, fields = params.len(), "Building advanced search");
        state.clear_continuation();
        Some(self.request(self.search_url(&params)))
    }

    fn resume(&self, state: &mut OperationState) -> Option<OperationRequest> {
        state.take_continuation().map(|url| self.request(url))
    }

    /// Links opened outside the application carry the partner tag.
    fn rewrite_url(&self, url: &str, external: bool) -> String {
        match (&self.config.partner_id, external) {
            (Some(partner), true) => append_parameter(url, PARTNER_PARAMETER, partner),
            _ => url.to_string(),
        }
    }

    fn certificate(&self) -> SslCertificate {
        match &self.config.certificate_path {
            Some(path) => SslCertificate::Custom(path.clone()),
            None => SslCertificate::System,
        }
    }

    fn authentication_manager(&self) -> Option<Arc<dyn AuthenticationManager>> {
        let session: Arc<dyn AuthenticationManager> = self.session.clone();
        Some(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, JsonFeedReader, JsonStoreReplies, MemorySettingsStore, MockExecutor};

    fn bookstore() -> Arc<BookstoreCatalog> {
        Arc::new(BookstoreCatalog::new(
            fixtures::bookstore_config(),
            Arc::new(MockExecutor::new()),
            Arc::new(JsonFeedReader),
            Arc::new(JsonStoreReplies),
            Arc::new(MemorySettingsStore::new()),
        ))
    }

    #[test]
    fn test_simple_search_url() {
        let store = bookstore();
        let mut state = OperationState::new(store.clone());
        let request = store.simple_search_request(&mut state, "Master i Margarita").unwrap();
        assert_eq!(
            request.network_request().url,
            "http://robot.litres.ru/pages/catalit_browser/?checkpoint=2000-01-01&search=Master%20i%20Margarita"
        );
        assert!(store.simple_search_request(&mut state, "").is_none());
    }

    #[test]
    fn test_advanced_search_skips_empty_fields() {
        let store = bookstore();
        let mut state = OperationState::new(store.clone());
        let query = AdvancedQuery {
            author: "Bulgakov".to_string(),
            tag: "classic".to_string(),
            ..AdvancedQuery::default()
        };
        let url = store
            .advanced_search_request(&mut state, &query)
            .unwrap()
            .network_request()
            .url
            .clone();
        assert!(url.contains("&search_person=Bulgakov&search_tag=classic"));
        assert!(!url.contains("search_title"));
        assert!(store
            .advanced_search_request(&mut state, &AdvancedQuery::default())
            .is_none());
    }

    #[test]
    fn test_partner_tag_only_on_external_links() {
        let store = bookstore();
        assert_eq!(
            store.rewrite_url("http://www.litres.ru/book/1", true),
            "http://www.litres.ru/book/1?lfrom=8076"
        );
        assert_eq!(
            store.rewrite_url("http://www.litres.ru/book/1", false),
            "http://www.litres.ru/book/1"
        );
    }

    #[test]
    fn test_capabilities_and_session() {
        let store = bookstore();
        let caps = store.capabilities();
        assert!(caps.authentication && caps.purchase && caps.advanced_search);
        assert!(store.authentication_manager().is_some());
        assert_eq!(store.certificate(), SslCertificate::System);
    }
}
