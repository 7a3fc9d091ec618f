//! Semantic-retrieval port for embedding-based context lookup.
//!
//! Two logically distinct indices are exposed: one over the raw source
//! documents and one over previously persisted entity summaries. Callers
//! select the index per query; how text is embedded or vectors are stored
//! is the adapter's concern.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`Retriever::retrieve`].
pub type RetrievalFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, Box<dyn Error + Send + Sync>>> + Send + 'a>>;

/// Boxed future returned by [`Retriever::store_summary`].
pub type StoreFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(), Box<dyn Error + Send + Sync>>> + Send + 'a>>;

/// Which retrieval index a query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalIndex {
    /// The index built over the raw source documents.
    Documents,
    /// The index built over previously persisted entity summaries.
    Summaries,
}

/// Retrieves semantically relevant text for a query.
pub trait Retriever: Send + Sync {
    /// Returns the concatenated text of the `top_k` passages most relevant
    /// to `query` in the selected index.
    ///
    /// # Errors
    ///
    /// Returns an error if the retrieval service is unavailable. Callers in
    /// the scoring path treat this as a zero-strength signal, never as a
    /// fatal condition.
    fn retrieve(&self, query: &str, index: RetrievalIndex, top_k: usize) -> RetrievalFuture<'_>;

    /// Ingests a finalized entity summary into the summaries index so later
    /// entities can retrieve it as context.
    ///
    /// # Errors
    ///
    /// Returns an error if ingestion fails; the pipeline logs and continues.
    fn store_summary(&self, entity_name: &str, summary_json: &str) -> StoreFuture<'_>;
}
