//! Structured summarization of a single entity.
//!
//! The summarizer is total: whatever the model returns, the caller gets a
//! schema-shaped [`EntitySummary`]. The parse result is an explicit
//! three-tier outcome so callers can tell a trustworthy summary from a
//! synthesized placeholder.

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ports::llm::{CompletionRequest, LlmClient};
use crate::schema::{Entity, EntitySummary, SCHEMA_HINT};

/// Completion cap for one summarization call.
const SUMMARY_MAX_OUTPUT_TOKENS: u32 = 4096;

const SYSTEM_PROMPT: &str = "You are a software architecture analysis tool. Extract detailed \
information about a software entity from the provided context and produce a structured JSON \
summary. Dig out as much relevant information as possible and avoid leaving fields empty; \
when the context does not mention a field, make a reasonable inference from common \
architecture patterns. Return only a valid JSON object wrapped in ```json and ```.";

/// First fenced code block, with or without a `json` tag.
static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("fence pattern is valid"));

/// `//` line comments that some models sprinkle into JSON output.
static LINE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*//.*$").expect("comment pattern is valid"));

/// A `description: ...` fragment in otherwise unparseable output.
static DESCRIPTION_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)description["\s:]+([^"]+)"#).expect("description pattern is valid"));

/// Result of parsing model output into a value of type `T`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    /// Parsed cleanly from a fenced JSON block.
    Parsed(T),
    /// Parsed after repair; the warnings say what had to be done.
    Recovered(T, Vec<String>),
    /// Deterministic default; the reason says why parsing failed.
    Fallback(T, String),
}

impl<T> ParseOutcome<T> {
    /// Returns the contained value regardless of tier.
    pub fn into_value(self) -> T {
        match self {
            Self::Parsed(value) | Self::Recovered(value, _) | Self::Fallback(value, _) => value,
        }
    }

    /// Returns a reference to the contained value.
    pub fn value(&self) -> &T {
        match self {
            Self::Parsed(value) | Self::Recovered(value, _) | Self::Fallback(value, _) => value,
        }
    }

    /// Returns `true` when the value is a synthesized fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(..))
    }
}

/// Logs how a summary was obtained, so repaired and synthesized summaries
/// are distinguishable in the run log.
pub fn log_parse_outcome<T>(name: &str, outcome: &ParseOutcome<T>) {
    match outcome {
        ParseOutcome::Parsed(_) => {}
        ParseOutcome::Recovered(_, warnings) => {
            for warning in warnings {
                debug!("summary for {name} needed repair: {warning}");
            }
        }
        ParseOutcome::Fallback(_, reason) => {
            warn!("summary for {name} degraded to the fallback skeleton: {reason}");
        }
    }
}

fn build_user_prompt(entity: &Entity, context: &str) -> String {
    let mut entity_info = format!("Entity name: {}\nEntity type: {}", entity.name, entity.kind);
    if let Some(parent) = &entity.parent {
        entity_info.push_str(&format!("\nOwning module: {parent}"));
    }

    format!(
        "Produce a rich JSON structure conforming to the schema for this entity:\n\
         {entity_info}\n\n\
         Schema:\n{SCHEMA_HINT}\n\n\
         Relevant context:\n{context}\n\n\
         Requirements:\n\
         1. Extract as much information from the context as possible.\n\
         2. For fields the context does not mention, infer from common architecture patterns.\n\
         3. Avoid returning empty arrays or objects when a plausible value exists.\n\
         4. Consider the entity name and type when inferring components, endpoints, services, \
         and relations.\n\
         5. Pay particular attention to frontend pages/components/routes, backend \
         controllers/services/repositories, data models and fields, API endpoints, and \
         dependencies.\n\n\
         Wrap your answer in ```json and ```. No explanation or extra content."
    )
}

/// Builds the deterministic fallback summary from the raw response text.
fn fallback_summary(entity: &Entity, raw: &str) -> EntitySummary {
    let mut skeleton = EntitySummary::skeleton(entity);
    if let Some(captures) = DESCRIPTION_FIELD.captures(raw) {
        if let Some(description) = captures.get(1) {
            skeleton.description = description.as_str().trim().to_string();
        }
    }
    skeleton
}

/// Parses model output into a summary via the three-tier fallback.
///
/// Tier 1: the first fenced JSON block, with best-effort `//` comment
/// stripping. Tier 2: the widest `{...}` span found by brace search.
/// Tier 3: the deterministic skeleton with a scraped or synthesized
/// description. This function never fails.
#[must_use]
pub fn parse_summary_response(text: &str, entity: &Entity) -> ParseOutcome<EntitySummary> {
    if let Some(captures) = FENCED_BLOCK.captures(text) {
        let block = captures.get(1).map_or("", |m| m.as_str());

        if let Ok(summary) = serde_json::from_str::<EntitySummary>(block) {
            return ParseOutcome::Parsed(summary);
        }

        let stripped = LINE_COMMENT.replace_all(block, "");
        if let Ok(summary) = serde_json::from_str::<EntitySummary>(&stripped) {
            return ParseOutcome::Recovered(
                summary,
                vec!["stripped line comments from fenced JSON block".to_string()],
            );
        }
        debug!("fenced block for {} did not parse as a summary", entity.name);
    }

    // Widest brace-delimited span: first '{' through last '}'.
    if let (Some(open), Some(close)) = (text.find('{'), text.rfind('}')) {
        if open < close {
            let span = &text[open..=close];
            if let Ok(summary) = serde_json::from_str::<EntitySummary>(span) {
                return ParseOutcome::Recovered(
                    summary,
                    vec!["extracted summary object by brace search".to_string()],
                );
            }
        }
    }

    ParseOutcome::Fallback(
        fallback_summary(entity, text),
        "no parseable JSON object in model output".to_string(),
    )
}

/// Summarizes one entity from its retrieved context.
///
/// A completion failure degrades to the fallback skeleton; this operation
/// never returns an error.
pub async fn summarize_entity(
    llm: &dyn LlmClient,
    entity: &Entity,
    context: &str,
    model: &str,
) -> ParseOutcome<EntitySummary> {
    let request = CompletionRequest {
        model: model.to_string(),
        system: Some(SYSTEM_PROMPT.to_string()),
        prompt: build_user_prompt(entity, context),
        max_tokens: SUMMARY_MAX_OUTPUT_TOKENS,
    };

    match llm.complete(&request).await {
        Ok(response) => parse_summary_response(&response.text, entity),
        Err(e) => ParseOutcome::Fallback(
            EntitySummary::skeleton(entity),
            format!("completion failed: {e}"),
        ),
    }
}
