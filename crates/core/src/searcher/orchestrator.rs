//! Round-based driver of aggregated searches.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::catalog::{AdvancedQuery, CatalogBackend};
use crate::metrics;
use crate::network::NetworkExecutor;
use crate::registry::CatalogRegistry;

use super::{BookCollection, OperationRequest, OperationState, SearchError, SearchOutcome};

/// Runs simple and advanced searches over every enabled backend of a registry.
pub struct SearchOrchestrator {
    executor: Arc<dyn NetworkExecutor>,
}

impl SearchOrchestrator {
    pub fn new(executor: Arc<dyn NetworkExecutor>) -> Self {
        Self { executor }
    }

    /// Free-text search.
    pub async fn simple_search(&self, registry: &CatalogRegistry, pattern: &str) -> SearchOutcome {
        debug!(pattern = pattern, "Starting simple search");
        self.run(registry, "simple", |backend, state| {
            backend.simple_search_request(state, pattern)
        })
        .await
    }

    /// Search by title/series, author, tag and annotation.
    pub async fn advanced_search(
        &self,
        registry: &CatalogRegistry,
        query: &AdvancedQuery,
    ) -> SearchOutcome {
        debug!(query = ?query, "Starting advanced search");
        self.run(registry, "advanced", |backend, state| {
            backend.advanced_search_request(state, query)
        })
        .await
    }

    async fn run<F>(&self, registry: &CatalogRegistry, kind: &str, mut initial: F) -> SearchOutcome
    where
        F: FnMut(&dyn CatalogBackend, &mut OperationState) -> Option<OperationRequest> + Send,
    {
        let start = Instant::now();
        let mut states: Vec<OperationState> = registry
            .backends()
            .iter()
            .map(|b| OperationState::new(Arc::clone(b)))
            .collect();

        let mut batch: Vec<(usize, OperationRequest)> = Vec::new();
        for (index, state) in states.iter_mut().enumerate() {
            let backend = Arc::clone(state.backend());
            if !backend.is_enabled() {
                state.finish();
                continue;
            }
            match initial(backend.as_ref(), state) {
                Some(request) => {
                    state.mark_pending();
                    batch.push((index, request));
                }
                None => state.finish(),
            }
        }

        let mut outcome = SearchOutcome::default();

        while outcome.error.is_none() && !batch.is_empty() {
            outcome.rounds += 1;
            debug!(round = outcome.rounds, requests = batch.len(), "Submitting search batch");

            let (owners, parts): (Vec<usize>, Vec<_>) = batch
                .drain(..)
                .map(|(index, request)| (index, request.into_parts()))
                .unzip();
            let (requests, readers): (Vec<_>, Vec<_>) = parts.into_iter().unzip();

            let responses = self.executor.execute_batch(requests).await;

            // Registration order; the first failure discards the rest of the round.
            for ((index, reader), response) in owners.into_iter().zip(readers).zip(responses) {
                let result = response
                    .map_err(|source| SearchError::Network {
                        site: reader.site_name().to_string(),
                        source,
                    })
                    .and_then(|body| {
                        reader.read(&body).map_err(|source| SearchError::Feed {
                            site: reader.site_name().to_string(),
                            source,
                        })
                    });
                match result {
                    Ok(page) => states[index].absorb(page),
                    Err(e) => {
                        warn!(round = outcome.rounds, error = %e, "Search round failed");
                        outcome.error = Some(e);
                        break;
                    }
                }
            }

            for state in &mut states {
                let entries = state.take_entries();
                if !entries.is_empty() {
                    outcome
                        .books
                        .get_or_insert_with(BookCollection::new)
                        .extend(entries);
                }
            }

            if outcome.error.is_some() {
                break;
            }

            for (index, state) in states.iter_mut().enumerate() {
                let backend = Arc::clone(state.backend());
                if state.is_finished() || !backend.is_enabled() {
                    continue;
                }
                match backend.resume(state) {
                    Some(request) => {
                        state.mark_pending();
                        batch.push((index, request));
                    }
                    None => state.finish(),
                }
            }
        }

        let result = if outcome.error.is_some() { "error" } else { "success" };
        metrics::SEARCHES_TOTAL
            .with_label_values(&[kind, result])
            .inc();
        metrics::SEARCH_ROUNDS
            .with_label_values(&[kind])
            .observe(outcome.rounds as f64);
        metrics::SEARCH_RESULTS.observe(outcome.book_count() as f64);

        info!(
            kind = kind,
            rounds = outcome.rounds,
            results = outcome.book_count(),
            duration_ms = start.elapsed().as_millis() as u64,
            failed = outcome.error.is_some(),
            "Search complete"
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkError;
    use crate::testing::{fixtures, MockCatalog, MockExecutor};

    fn registry(backends: Vec<Arc<MockCatalog>>) -> CatalogRegistry {
        CatalogRegistry::new(
            backends
                .into_iter()
                .map(|b| b as Arc<dyn CatalogBackend>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_single_round_collects_in_registration_order() {
        let executor = Arc::new(MockExecutor::new());
        let a = Arc::new(MockCatalog::new("Alpha", "alpha.org"));
        let b = Arc::new(MockCatalog::new("Beta", "beta.org"));
        executor
            .set_page(&a.search_url("tolstoy"), fixtures::page("alpha.org", &["A1", "A2"], None))
            .await;
        executor
            .set_page(&b.search_url("tolstoy"), fixtures::page("beta.org", &["B1"], None))
            .await;

        let orchestrator = SearchOrchestrator::new(executor.clone());
        let outcome = orchestrator
            .simple_search(&registry(vec![b, a]), "tolstoy")
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.rounds, 1);
        let titles: Vec<_> = outcome
            .books
            .unwrap()
            .iter()
            .map(|e| e.title.clone())
            .collect();
        assert_eq!(titles, ["A1", "A2", "B1"]);
        assert_eq!(executor.batch_sizes().await, vec![2]);
    }

    #[tokio::test]
    async fn test_pagination_adds_rounds() {
        let executor = Arc::new(MockExecutor::new());
        let a = Arc::new(MockCatalog::new("Alpha", "alpha.org"));
        let b = Arc::new(MockCatalog::new("Beta", "beta.org"));
        executor
            .set_page(
                &a.search_url("dune"),
                fixtures::page("alpha.org", &["A1"], Some("mock://alpha.org/page/2")),
            )
            .await;
        executor
            .set_page("mock://alpha.org/page/2", fixtures::page("alpha.org", &["A2"], None))
            .await;
        executor
            .set_page(&b.search_url("dune"), fixtures::page("beta.org", &["B1"], None))
            .await;

        let orchestrator = SearchOrchestrator::new(executor.clone());
        let outcome = orchestrator.simple_search(&registry(vec![a, b]), "dune").await;

        assert_eq!(outcome.rounds, 2);
        let titles: Vec<_> = outcome.books.unwrap().iter().map(|e| e.title.clone()).collect();
        assert_eq!(titles, ["A1", "B1", "A2"]);
        assert_eq!(executor.batch_sizes().await, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_no_results_gives_no_collection() {
        let executor = Arc::new(MockExecutor::new());
        let a = Arc::new(MockCatalog::new("Alpha", "alpha.org"));
        executor
            .set_page(&a.search_url("nothing"), fixtures::page("alpha.org", &[], None))
            .await;

        let outcome = SearchOrchestrator::new(executor)
            .simple_search(&registry(vec![a]), "nothing")
            .await;
        assert!(outcome.is_success());
        assert!(outcome.books.is_none());
    }

    #[tokio::test]
    async fn test_no_requests_means_no_rounds() {
        let executor = Arc::new(MockExecutor::new());
        let a = Arc::new(MockCatalog::new("Alpha", "alpha.org"));
        a.set_enabled(false);

        let outcome = SearchOrchestrator::new(executor.clone())
            .simple_search(&registry(vec![a]), "dune")
            .await;
        assert_eq!(outcome.rounds, 0);
        assert!(executor.batch_sizes().await.is_empty());
    }

    #[tokio::test]
    async fn test_later_round_failure_keeps_partial_results() {
        let executor = Arc::new(MockExecutor::new());
        let a = Arc::new(MockCatalog::new("Alpha", "alpha.org"));
        executor
            .set_page(
                &a.search_url("dune"),
                fixtures::page("alpha.org", &["A1"], Some("mock://alpha.org/page/2")),
            )
            .await;
        executor
            .set_error("mock://alpha.org/page/2", NetworkError::Timeout)
            .await;

        let outcome = SearchOrchestrator::new(executor)
            .simple_search(&registry(vec![a]), "dune")
            .await;
        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.book_count(), 1);
        assert_eq!(outcome.error.as_ref().unwrap().site(), "alpha.org");
    }

    #[tokio::test]
    async fn test_malformed_feed_is_an_error() {
        let executor = Arc::new(MockExecutor::new());
        let a = Arc::new(MockCatalog::new("Alpha", "alpha.org"));
        executor
            .set_body(&a.search_url("dune"), b"<html>not json</html>".to_vec())
            .await;

        let outcome = SearchOrchestrator::new(executor)
            .simple_search(&registry(vec![a]), "dune")
            .await;
        assert!(matches!(outcome.error, Some(SearchError::Feed { .. })));
    }

    #[tokio::test]
    async fn test_advanced_search_uses_field_request() {
        let executor = Arc::new(MockExecutor::new());
        let a = Arc::new(MockCatalog::new("Alpha", "alpha.org"));
        let query = AdvancedQuery {
            author: "Herbert".to_string(),
            ..AdvancedQuery::default()
        };
        executor
            .set_page(&a.advanced_url(&query), fixtures::page("alpha.org", &["Dune"], None))
            .await;

        let outcome = SearchOrchestrator::new(executor)
            .advanced_search(&registry(vec![a]), &query)
            .await;
        assert_eq!(outcome.book_count(), 1);
    }
}
