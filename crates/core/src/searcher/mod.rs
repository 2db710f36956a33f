//! Aggregated search across all enabled catalogs.
//!
//! One search is a sequence of network rounds. Every round submits one batch
//! holding at most one request per backend; backends with more to say (next
//! page, next protocol step) contribute a `resume` request to the following
//! round. The first failure in a round stops the whole search.

mod orchestrator;
mod types;

pub use orchestrator::SearchOrchestrator;
pub use types::*;
