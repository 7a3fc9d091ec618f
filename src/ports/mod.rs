//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the application core and an
//! external system (language model, semantic retrieval, filesystem).
//! Implementations live in `src/adapters/`.

pub mod filesystem;
pub mod llm;
pub mod retrieval;

pub use filesystem::FileSystem;
pub use llm::{CompletionFuture, CompletionRequest, CompletionResponse, LlmClient};
pub use retrieval::{RetrievalFuture, RetrievalIndex, Retriever, StoreFuture};
