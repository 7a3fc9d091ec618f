//! Live adapters backed by real external services.

pub mod filesystem;
pub mod llm;
pub mod retrieval;

pub use filesystem::LiveFileSystem;
pub use llm::LiveLlmClient;
pub use retrieval::LiveRetriever;
