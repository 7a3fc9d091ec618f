//! Live adapter for the `Retriever` port.
//!
//! Talks to a retrieval sidecar service over HTTP. The sidecar owns the
//! embedding model and the vector store; this adapter only speaks its JSON
//! contract: `POST /retrieve` with `{query, index, top_k}` returning
//! `{context}`, and `POST /summaries` with `{entity_name, summary}`.

use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ports::retrieval::{RetrievalFuture, RetrievalIndex, Retriever, StoreFuture};

/// Environment variable holding the sidecar base URL.
const RETRIEVAL_URL_VAR: &str = "CLARIFY_RETRIEVAL_URL";

/// Live retriever that queries the retrieval sidecar service.
pub struct LiveRetriever {
    client: Client,
}

impl LiveRetriever {
    /// Creates a new live retriever.
    #[must_use]
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

impl Default for LiveRetriever {
    fn default() -> Self {
        Self::new()
    }
}

/// Request body for `POST /retrieve`.
#[derive(Serialize)]
struct RetrieveRequest<'a> {
    query: &'a str,
    index: &'a str,
    top_k: usize,
}

/// Response body from `POST /retrieve`.
#[derive(Deserialize)]
struct RetrieveResponse {
    context: String,
}

/// Request body for `POST /summaries`.
#[derive(Serialize)]
struct StoreSummaryRequest<'a> {
    entity_name: &'a str,
    summary: &'a str,
}

fn base_url() -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    env::var(RETRIEVAL_URL_VAR)
        .map_err(|_| format!("{RETRIEVAL_URL_VAR} environment variable not set").into())
}

fn index_name(index: RetrievalIndex) -> &'static str {
    match index {
        RetrievalIndex::Documents => "documents",
        RetrievalIndex::Summaries => "summaries",
    }
}

impl Retriever for LiveRetriever {
    fn retrieve(&self, query: &str, index: RetrievalIndex, top_k: usize) -> RetrievalFuture<'_> {
        let query = query.to_string();

        Box::pin(async move {
            let url = format!("{}/retrieve", base_url()?);
            let body = RetrieveRequest { query: &query, index: index_name(index), top_k };

            let response = self.client.post(&url).json(&body).send().await.map_err(
                |e| -> Box<dyn std::error::Error + Send + Sync> {
                    format!("retrieval request failed: {e}").into()
                },
            )?;

            let status = response.status();
            if !status.is_success() {
                return Err(format!("retrieval service error ({})", status.as_u16()).into());
            }

            let parsed: RetrieveResponse = response.json().await.map_err(
                |e| -> Box<dyn std::error::Error + Send + Sync> {
                    format!("failed to parse retrieval response: {e}").into()
                },
            )?;

            Ok(parsed.context)
        })
    }

    fn store_summary(&self, entity_name: &str, summary_json: &str) -> StoreFuture<'_> {
        let entity_name = entity_name.to_string();
        let summary_json = summary_json.to_string();

        Box::pin(async move {
            let url = format!("{}/summaries", base_url()?);
            let body = StoreSummaryRequest { entity_name: &entity_name, summary: &summary_json };

            let response = self.client.post(&url).json(&body).send().await.map_err(
                |e| -> Box<dyn std::error::Error + Send + Sync> {
                    format!("summary ingestion request failed: {e}").into()
                },
            )?;

            let status = response.status();
            if !status.is_success() {
                return Err(format!("summary ingestion error ({})", status.as_u16()).into());
            }

            Ok(())
        })
    }
}
