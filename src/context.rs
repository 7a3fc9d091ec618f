//! Service context bundling all port trait objects.

use crate::adapters::live::{LiveFileSystem, LiveLlmClient, LiveRetriever};
use crate::ports::filesystem::FileSystem;
use crate::ports::llm::LlmClient;
use crate::ports::retrieval::Retriever;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Tests construct
/// this directly with fake implementations.
pub struct ServiceContext {
    /// LLM client for language-model completions.
    pub llm: Box<dyn LlmClient>,
    /// Semantic retriever over documents and persisted summaries.
    pub retriever: Box<dyn Retriever>,
    /// Filesystem for document reads and summary persistence.
    pub fs: Box<dyn FileSystem>,
}

impl ServiceContext {
    /// Creates a live context with real adapters for every port.
    #[must_use]
    pub fn live() -> Self {
        Self {
            llm: Box::new(LiveLlmClient::new()),
            retriever: Box::new(LiveRetriever::new()),
            fs: Box::new(LiveFileSystem),
        }
    }
}
