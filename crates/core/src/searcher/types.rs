//! Types for the aggregated search.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::catalog::{CatalogBackend, CatalogEntry, FeedError, FeedPage, FeedReader};
use crate::network::{NetworkError, NetworkRequest};

/// A request a backend wants executed, plus the reader for its response.
pub struct OperationRequest {
    request: NetworkRequest,
    site_name: String,
    reader: Arc<dyn FeedReader>,
}

impl OperationRequest {
    pub fn new(
        request: NetworkRequest,
        site_name: impl Into<String>,
        reader: Arc<dyn FeedReader>,
    ) -> Self {
        Self {
            request,
            site_name: site_name.into(),
            reader,
        }
    }

    pub fn network_request(&self) -> &NetworkRequest {
        &self.request
    }

    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    pub(crate) fn into_parts(self) -> (NetworkRequest, ResponseReader) {
        (
            self.request,
            ResponseReader {
                site_name: self.site_name,
                reader: self.reader,
            },
        )
    }
}

impl std::fmt::Debug for OperationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRequest")
            .field("request", &self.request)
            .field("site_name", &self.site_name)
            .field("reader", &"<reader>")
            .finish()
    }
}

/// Reader half of a submitted request.
pub(crate) struct ResponseReader {
    site_name: String,
    reader: Arc<dyn FeedReader>,
}

impl ResponseReader {
    pub(crate) fn read(&self, body: &[u8]) -> Result<FeedPage, FeedError> {
        self.reader.read_feed(&self.site_name, body)
    }

    pub(crate) fn site_name(&self) -> &str {
        &self.site_name
    }
}

/// Where a backend's part of an aggregated search stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationPhase {
    /// No request built yet.
    Idle,
    /// A request is part of the current batch.
    Pending,
    /// The last response left a continuation.
    Continuing,
    /// Nothing more to ask.
    Finished,
}

/// Per-backend state of one aggregated search.
pub struct OperationState {
    backend: Arc<dyn CatalogBackend>,
    entries: Vec<CatalogEntry>,
    continuation: Option<String>,
    phase: OperationPhase,
}

impl OperationState {
    pub fn new(backend: Arc<dyn CatalogBackend>) -> Self {
        Self {
            backend,
            entries: Vec::new(),
            continuation: None,
            phase: OperationPhase::Idle,
        }
    }

    pub fn backend(&self) -> &Arc<dyn CatalogBackend> {
        &self.backend
    }

    pub fn phase(&self) -> OperationPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == OperationPhase::Finished
    }

    /// Entries produced since the last fold.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    pub fn set_continuation(&mut self, url: String) {
        self.continuation = Some(url);
    }

    pub fn take_continuation(&mut self) -> Option<String> {
        self.continuation.take()
    }

    pub fn clear_continuation(&mut self) {
        self.continuation = None;
    }

    pub(crate) fn mark_pending(&mut self) {
        self.phase = OperationPhase::Pending;
    }

    pub(crate) fn finish(&mut self) {
        self.phase = OperationPhase::Finished;
        self.continuation = None;
    }

    /// Take a parsed page into this state.
    pub(crate) fn absorb(&mut self, page: FeedPage) {
        self.entries.extend(page.entries);
        self.continuation = page.next_url;
        self.phase = if self.continuation.is_some() {
            OperationPhase::Continuing
        } else {
            OperationPhase::Finished
        };
    }

    pub(crate) fn take_entries(&mut self) -> Vec<CatalogEntry> {
        std::mem::take(&mut self.entries)
    }
}

/// Entries of one aggregated search, in backend registration order per round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookCollection {
    books: Vec<CatalogEntry>,
}

impl BookCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_book(&mut self, entry: CatalogEntry) {
        self.books.push(entry);
    }

    pub fn books(&self) -> &[CatalogEntry] {
        &self.books
    }

    pub fn into_books(self) -> Vec<CatalogEntry> {
        self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.books.iter()
    }
}

impl Extend<CatalogEntry> for BookCollection {
    fn extend<T: IntoIterator<Item = CatalogEntry>>(&mut self, iter: T) {
        self.books.extend(iter);
    }
}

/// Errors that stop an aggregated search.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("{site}: {source}")]
    Network {
        site: String,
        #[source]
        source: NetworkError,
    },

    #[error("{site}: {source}")]
    Feed {
        site: String,
        #[source]
        source: FeedError,
    },
}

impl SearchError {
    pub fn site(&self) -> &str {
        match self {
            SearchError::Network { site, .. } | SearchError::Feed { site, .. } => site,
        }
    }
}

/// Result of an aggregated search.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// `None` only if no backend ever produced an entry.
    pub books: Option<BookCollection>,
    /// First error of the search, if any. Partial results stay in `books`.
    pub error: Option<SearchError>,
    /// Network rounds executed.
    pub rounds: u32,
}

impl SearchOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Error text for display, empty on success.
    pub fn error_message(&self) -> String {
        self.error.as_ref().map(|e| e.to_string()).unwrap_or_default()
    }

    pub fn book_count(&self) -> usize {
        self.books.as_ref().map_or(0, BookCollection::len)
    }
}
