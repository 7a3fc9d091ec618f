//! Entity discovery over the full document corpus.
//!
//! The corpus is processed chunk by chunk; each chunk is asked for a JSON
//! array of `{name, type, parent}` records. Chunk results are concatenated
//! and deduplicated globally by composite key, preserving first-seen order.

use std::collections::BTreeSet;

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::chunk::{run_chunked, ChunkOptions};
use crate::ports::llm::LlmClient;
use crate::schema::Entity;

/// Estimated-token budget per discovery chunk.
const DISCOVERY_CHUNK_TOKENS: usize = 4000;

/// Completion cap for one discovery chunk.
const DISCOVERY_MAX_OUTPUT_TOKENS: u32 = 4096;

const SYSTEM_PROMPT: &str = "You are a software architecture analysis tool that extracts \
entities from design documents. Identify every API endpoint, service, repository, utility, \
and data model. Output only a JSON array of entities, with no explanation or extra content.";

/// Matches, in priority order: a fenced json block, any fenced block, or a
/// bare bracket-delimited array.
static ENTITY_ARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```json\s*(.*?)\s*```|```\s*(.*?)\s*```|(\[.*\])")
        .expect("entity array pattern is valid")
});

fn build_user_prompt(chunk: &str, index: usize, total: usize) -> String {
    let chunk_info = if total > 1 {
        format!("This is chunk {index} of {total} of the full document set. Only analyze the \
                 content of this chunk.\n\n")
    } else {
        String::new()
    };

    format!(
        "{chunk_info}Analyze the following documents and identify every software entity \
         (API endpoints, services, repositories, utilities, data models).\n\n\
         Documents:\n{chunk}\n\n\
         Output requirements:\n\
         1. Use a JSON array.\n\
         2. Each entity has name, type, and parent (owning module) fields.\n\
         3. Wrap the JSON in a code block (```json).\n\
         4. No explanation or extra text.\n\n\
         Example:\n```json\n[{{\"name\": \"auth/login\", \"type\": \"Function\", \
         \"parent\": \"Auth\"}}]\n```"
    )
}

/// Parses one chunk's response into a list of entities.
///
/// Never fails: a response without a recognizable JSON array, or with a
/// JSON syntax error, contributes an empty list.
#[must_use]
pub fn parse_entity_list(text: &str) -> Vec<Entity> {
    let Some(captures) = ENTITY_ARRAY.captures(text) else {
        debug!("no JSON array found in discovery response");
        return Vec::new();
    };

    let raw = captures
        .get(1)
        .or_else(|| captures.get(2))
        .or_else(|| captures.get(3))
        .map_or("", |m| m.as_str())
        .trim();

    match serde_json::from_str::<Vec<Entity>>(raw) {
        Ok(entities) => entities,
        Err(e) => {
            debug!("discovery response did not parse as an entity array: {e}");
            Vec::new()
        }
    }
}

/// Discovers a deduplicated, ordered list of entities from the corpus.
///
/// Chunk results are concatenated without merge-time deduplication; the
/// final pass deduplicates by composite key, keeping first-seen order.
pub async fn discover_entities(llm: &dyn LlmClient, corpus: &str, model: &str) -> Vec<Entity> {
    info!("starting entity discovery");

    let options = ChunkOptions {
        model,
        max_input_tokens: DISCOVERY_CHUNK_TOKENS,
        max_output_tokens: DISCOVERY_MAX_OUTPUT_TOKENS,
    };

    let entities = run_chunked(
        llm,
        corpus,
        &options,
        |index, total| {
            Some(format!(
                "{SYSTEM_PROMPT}\n\nThis is chunk {index} of {total}. Only analyze the content \
                 of this chunk."
            ))
        },
        build_user_prompt,
        parse_entity_list,
        |acc: Option<Vec<Entity>>, mut item| {
            let mut merged = acc.unwrap_or_default();
            merged.append(&mut item);
            merged
        },
    )
    .await
    .unwrap_or_default();

    let mut seen = BTreeSet::new();
    let mut unique = Vec::new();
    for entity in entities {
        if seen.insert(entity.composite_key()) {
            unique.push(entity);
        }
    }

    info!("entity discovery finished: {} unique entities", unique.len());
    unique
}
