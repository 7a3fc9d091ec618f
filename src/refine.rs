//! Recursive decomposition of summaries into child entities.
//!
//! A summary's nested backend collections imply child entities; each child
//! is summarized, persisted, and refined in turn. Termination is guaranteed
//! by a depth cap and a visited set of composite keys that only grows.

use std::future::Future;
use std::pin::Pin;

use log::{info, warn};

use crate::context::ServiceContext;
use crate::ports::retrieval::RetrievalIndex;
use crate::schema::{Entity, EntitySummary, SummaryMap};
use crate::store::SummaryStore;
use crate::summarize::{log_parse_outcome, summarize_entity};

/// Maximum recursion depth; refinement past this stops without error.
pub const MAX_REFINE_DEPTH: usize = 3;

/// Passages retrieved as context for one child summary.
const REFINE_TOP_K: usize = 5;

/// Traversal state threaded through one refinement run.
///
/// The visited set holds composite entity keys and only ever grows, so an
/// entity is summarized at most once per run no matter how many parents
/// reference it.
#[derive(Debug, Default)]
pub struct RefineContext {
    visited: std::collections::BTreeSet<String>,
}

impl RefineContext {
    /// Creates an empty traversal context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a composite key as processed. Returns `false` when the key
    /// was already present.
    pub fn mark(&mut self, key: String) -> bool {
        self.visited.insert(key)
    }

    /// Returns `true` if the composite key has been processed.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.visited.contains(key)
    }

    /// Number of entities processed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.visited.len()
    }

    /// Returns `true` when nothing has been processed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

/// Child names implied by a summary's backend collections, each paired
/// with its singular entity type.
fn child_entities(parent: &Entity, summary: &EntitySummary) -> Vec<Entity> {
    let mut children = Vec::new();
    let mut push = |name: &str, kind: &str| {
        if name.is_empty() {
            return;
        }
        children.push(Entity {
            name: name.to_string(),
            kind: kind.to_string(),
            parent: Some(parent.name.clone()),
        });
    };

    for name in summary.backend.dtos.keys() {
        push(name, "Dto");
    }
    for name in summary.backend.services.names() {
        push(name, "Service");
    }
    for name in summary.backend.controllers.names() {
        push(name, "Controller");
    }
    for name in summary.backend.repositories.names() {
        push(name, "Repository");
    }
    children
}

/// Summarizes, persists, and recursively refines every child entity
/// implied by `summary`'s backend collections.
///
/// A child whose name equals the parent's is a self-reference: it is kept
/// in the summary but never recursed into. Already-visited children are
/// skipped. Past [`MAX_REFINE_DEPTH`] the call returns without effect.
///
/// # Errors
///
/// Only persistence failures propagate; summarization and retrieval
/// failures degrade per child and refinement continues.
pub fn refine_children<'a>(
    ctx: &'a ServiceContext,
    store: &'a SummaryStore<'a>,
    model: &'a str,
    parent: &'a Entity,
    summary: &'a EntitySummary,
    summaries: &'a mut SummaryMap,
    refine: &'a mut RefineContext,
    depth: usize,
) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>> {
    Box::pin(async move {
        if depth > MAX_REFINE_DEPTH {
            warn!("maximum refinement depth reached at {}, stopping", parent.name);
            return Ok(());
        }

        for child in child_entities(parent, summary) {
            if child.name == parent.name {
                info!("self-reference kept but not refined: {}", child.name);
                continue;
            }
            let key = child.composite_key();
            if !refine.mark(key) {
                continue;
            }

            info!(
                "refining child entity {} (type {}, parent {})",
                child.name, child.kind, parent.name
            );

            let context = match ctx
                .retriever
                .retrieve(&child.name, RetrievalIndex::Documents, REFINE_TOP_K)
                .await
            {
                Ok(context) => context,
                Err(e) => {
                    warn!("retrieval failed for {}: {e}", child.name);
                    String::new()
                }
            };

            let outcome = summarize_entity(ctx.llm.as_ref(), &child, &context, model).await;
            log_parse_outcome(&child.name, &outcome);
            let child_summary = outcome.into_value();

            store.save(&child.name, &child_summary)?;
            if let Ok(json) = serde_json::to_string(&child_summary) {
                if let Err(e) = ctx.retriever.store_summary(&child.name, &json).await {
                    warn!("failed to index summary for {}: {e}", child.name);
                }
            }

            refine_children(ctx, store, model, &child, &child_summary, summaries, refine, depth + 1)
                .await?;
            summaries.insert(child.name, child_summary);
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm::{CompletionFuture, CompletionRequest, CompletionResponse, LlmClient};
    use crate::ports::retrieval::{RetrievalFuture, Retriever, StoreFuture};
    use crate::store::tests::MemFs;

    /// Fake LLM answering every request from a name-keyed script.
    struct NestingLlm {
        /// Pairs of (prompt substring, response); first match wins.
        script: Vec<(String, String)>,
    }

    impl NestingLlm {
        fn new(script: Vec<(&str, &str)>) -> Self {
            Self {
                script: script
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    impl LlmClient for NestingLlm {
        fn complete(&self, request: &CompletionRequest) -> CompletionFuture<'_> {
            let text = self
                .script
                .iter()
                .find(|(needle, _)| request.prompt.contains(needle.as_str()))
                .map_or_else(|| "```json\n{}\n```".to_string(), |(_, resp)| resp.clone());
            Box::pin(async move {
                Ok(CompletionResponse { text, prompt_tokens: 0, completion_tokens: 0 })
            })
        }
    }

    struct NullRetriever;

    impl Retriever for NullRetriever {
        fn retrieve(&self, _q: &str, _i: RetrievalIndex, _k: usize) -> RetrievalFuture<'_> {
            Box::pin(async { Ok(String::new()) })
        }

        fn store_summary(&self, _n: &str, _s: &str) -> StoreFuture<'_> {
            Box::pin(async { Ok(()) })
        }
    }

    fn test_context(llm: NestingLlm) -> ServiceContext {
        ServiceContext {
            llm: Box::new(llm),
            retriever: Box::new(NullRetriever),
            fs: Box::new(MemFs::new()),
        }
    }

    fn entity(name: &str) -> Entity {
        Entity { name: name.into(), kind: "Service".into(), parent: None }
    }

    fn summary_with_service(child: &str) -> String {
        format!("```json\n{{\"backend\": {{\"services\": [\"{child}\"]}}}}\n```")
    }

    #[tokio::test]
    async fn children_are_summarized_and_persisted() {
        let llm = NestingLlm::new(vec![(
            "TokenService",
            "```json\n{\"module\": \"token\", \"description\": \"issues tokens\"}\n```",
        )]);
        let ctx = test_context(llm);
        let fs = MemFs::new();
        let store = SummaryStore::new(&fs, "/out");
        let parent = entity("AuthService");
        let parent_summary: EntitySummary =
            serde_json::from_str("{\"backend\": {\"services\": [\"TokenService\"]}}").unwrap();
        let mut summaries = SummaryMap::new();
        let mut refine = RefineContext::new();

        refine_children(
            &ctx, &store, "test-model", &parent, &parent_summary, &mut summaries, &mut refine, 0,
        )
        .await
        .unwrap();

        assert!(summaries.contains_key("TokenService"));
        assert_eq!(summaries["TokenService"].module, "token");
        assert!(refine.contains("TokenService|Service|AuthService"));
        assert_eq!(store.load("TokenService").unwrap().module, "token");
    }

    #[tokio::test]
    async fn self_reference_is_never_recursed_into() {
        let ctx = test_context(NestingLlm::new(vec![]));
        let fs = MemFs::new();
        let store = SummaryStore::new(&fs, "/out");
        let parent = entity("AuthService");
        let parent_summary: EntitySummary =
            serde_json::from_str("{\"backend\": {\"services\": [\"AuthService\"]}}").unwrap();
        let mut summaries = SummaryMap::new();
        let mut refine = RefineContext::new();

        refine_children(
            &ctx, &store, "test-model", &parent, &parent_summary, &mut summaries, &mut refine, 0,
        )
        .await
        .unwrap();

        assert!(summaries.is_empty());
        assert!(refine.is_empty());
    }

    #[tokio::test]
    async fn deep_chains_halt_at_the_depth_cap() {
        // Level0 -> Level1 -> ... -> Level10, each summary nesting the next.
        let script: Vec<(String, String)> = (1..=10)
            .map(|n| {
                (
                    format!("Entity name: Level{n}\n"),
                    summary_with_service(&format!("Level{}", n + 1)),
                )
            })
            .collect();
        let llm = NestingLlm::new(
            script.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect(),
        );
        let ctx = test_context(llm);
        let fs = MemFs::new();
        let store = SummaryStore::new(&fs, "/out");
        let parent = entity("Level0");
        let parent_summary: EntitySummary =
            serde_json::from_str("{\"backend\": {\"services\": [\"Level1\"]}}").unwrap();
        let mut summaries = SummaryMap::new();
        let mut refine = RefineContext::new();

        refine_children(
            &ctx, &store, "test-model", &parent, &parent_summary, &mut summaries, &mut refine, 0,
        )
        .await
        .unwrap();

        // Depths 0..=3 each process one child, then the cap stops descent.
        assert!(summaries.contains_key("Level1"));
        assert!(summaries.contains_key("Level4"));
        assert!(!summaries.contains_key("Level5"));
        assert_eq!(refine.len(), 4);
    }

    #[tokio::test]
    async fn visited_children_are_processed_once() {
        let llm = NestingLlm::new(vec![(
            "SharedDto",
            "```json\n{\"module\": \"shared\", \"description\": \"shared payload\"}\n```",
        )]);
        let ctx = test_context(llm);
        let fs = MemFs::new();
        let store = SummaryStore::new(&fs, "/out");
        let parent = entity("AuthService");
        let parent_summary: EntitySummary = serde_json::from_str(
            "{\"backend\": {\"dtos\": {\"SharedDto\": {}}, \"services\": []}}",
        )
        .unwrap();
        let mut summaries = SummaryMap::new();
        let mut refine = RefineContext::new();

        for _ in 0..2 {
            refine_children(
                &ctx, &store, "test-model", &parent, &parent_summary, &mut summaries, &mut refine,
                0,
            )
            .await
            .unwrap();
        }

        assert_eq!(refine.len(), 1);
        assert!(refine.contains("SharedDto|Dto|AuthService"));
    }
}
