//! Chunked prompt execution over a token budget.
//!
//! Long texts are split into overlapping chunks, each chunk is sent to the
//! LLM with a per-chunk prompt, and the parsed per-chunk results are folded
//! together with a caller-supplied merge function. A chunk whose completion
//! fails contributes nothing and never aborts the whole run.

use log::{debug, warn};

use crate::ports::llm::{CompletionRequest, LlmClient};

/// Fixed overlap between adjacent chunks, in estimated tokens. Keeps
/// context that straddles a chunk boundary visible to both chunks.
pub const CHUNK_OVERLAP_TOKENS: usize = 200;

/// Token count is estimated from character count; no tokenizer is involved.
const APPROX_CHARS_PER_TOKEN: usize = 4;

/// Tuning for one chunked run.
pub struct ChunkOptions<'a> {
    /// Model identifier passed through to the LLM port.
    pub model: &'a str,
    /// Estimated-token budget per chunk of input text.
    pub max_input_tokens: usize,
    /// Completion token cap per chunk.
    pub max_output_tokens: u32,
}

/// Splits `text` into chunks under an approximate token budget, with a
/// fixed overlap between adjacent chunks. Splits on char boundaries.
#[must_use]
pub fn split_by_token_budget(text: &str, max_tokens: usize) -> Vec<String> {
    let budget_chars = max_tokens.saturating_mul(APPROX_CHARS_PER_TOKEN).max(1);
    let overlap_chars = CHUNK_OVERLAP_TOKENS * APPROX_CHARS_PER_TOKEN;

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= budget_chars {
        return vec![text.to_string()];
    }

    let step = budget_chars.saturating_sub(overlap_chars).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + budget_chars).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Runs a prompt over `text` chunk by chunk and folds the parsed results.
///
/// `build_system` and `build_user` receive the 1-based chunk index and the
/// total chunk count so prompts can tell the model which slice it is
/// looking at. `merge` receives the accumulated result (`None` before the
/// first successful chunk) and the parsed result of the current chunk.
///
/// Returns `None` when every chunk fails.
pub async fn run_chunked<T, S, U, P, M>(
    llm: &dyn LlmClient,
    text: &str,
    options: &ChunkOptions<'_>,
    build_system: S,
    build_user: U,
    parse: P,
    merge: M,
) -> Option<T>
where
    S: Fn(usize, usize) -> Option<String>,
    U: Fn(&str, usize, usize) -> String,
    P: Fn(&str) -> T,
    M: Fn(Option<T>, T) -> T,
{
    let chunks = split_by_token_budget(text, options.max_input_tokens);
    let total = chunks.len();
    debug!("split input into {total} chunk(s)");

    let mut accumulated = None;
    for (i, chunk) in chunks.iter().enumerate() {
        let index = i + 1;
        let request = CompletionRequest {
            model: options.model.to_string(),
            system: build_system(index, total),
            prompt: build_user(chunk, index, total),
            max_tokens: options.max_output_tokens,
        };

        match llm.complete(&request).await {
            Ok(response) => {
                let parsed = parse(&response.text);
                accumulated = Some(merge(accumulated, parsed));
            }
            Err(e) => {
                warn!("chunk {index}/{total} failed, skipping: {e}");
            }
        }
    }
    accumulated
}
