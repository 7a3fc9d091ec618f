//! Confidence scoring and classification of discovered entities.
//!
//! Scoring is additive over independent signals and kept separate from
//! classification so each policy is testable on its own. Thresholds and
//! signal weights live here as named constants.

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::naming::suggest_corrections;
use crate::ports::retrieval::{RetrievalIndex, Retriever};
use crate::schema::{ConfidenceLevel, DependencyAssessment, EntitySummary, SummaryMap};

/// Score at or above which an entity is fully accepted.
pub const VERIFIED_THRESHOLD: f64 = 0.8;
/// Score at or above which an entity is inferred but plausible.
pub const INFERRED_THRESHOLD: f64 = 0.5;
/// Score at or above which an entity needs manual verification.
pub const NEEDS_VERIFICATION_THRESHOLD: f64 = 0.2;

/// Signal weight: name appears verbatim in the corpus.
const DIRECT_MATCH_WEIGHT: f64 = 0.5;
/// Signal weight: semantic retrieval returned substantial context.
const RETRIEVAL_WEIGHT: f64 = 0.3;
/// Per-reference weight for cross-references from other summaries.
const REFERENCE_WEIGHT: f64 = 0.2;
/// Cap on the total cross-reference contribution.
const REFERENCE_CAP: f64 = 0.4;
/// Signal weight: name follows a recognized naming convention.
const NAMING_BONUS: f64 = 0.1;
/// Signal weight for a dependency the summaries index already holds a
/// persisted summary for. Equal to the inferred threshold, so a summary
/// match alone validates the dependency.
const SUMMARY_MATCH_WEIGHT: f64 = 0.5;
/// Penalty applied at classification time for nonconforming names.
const NAMING_PENALTY: f64 = 0.1;

/// Retrieved context shorter than this is not considered meaningful.
const MIN_CONTEXT_LEN: usize = 100;

/// Passages retrieved per scoring query.
const SCORING_TOP_K: usize = 5;

/// Recognized naming patterns, each tagged with its convention family.
static NAMING_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    let mut patterns = Vec::new();
    let mut add = |family: &'static str, pattern: String| {
        patterns.push((family, Regex::new(&pattern).expect("naming pattern is valid")));
    };

    for suffix in ["Service", "Repository", "Controller", "Dto", "Entity", "Model"] {
        add("backend", format!("^[A-Z][a-zA-Z]*{suffix}$"));
    }
    for suffix in ["Component", "Page", "Provider", "Context", "View", "Dialog", "Modal", "Card"] {
        add("frontend", format!("^[A-Z][a-zA-Z]*{suffix}$"));
    }
    add("frontend", "^use[A-Z][a-zA-Z]*$".to_string());
    add("type", "^I[A-Z][a-zA-Z]*$".to_string());
    add("type", "^T[A-Z][a-zA-Z]*$".to_string());
    add("type", "^[A-Z][a-zA-Z]*Type$".to_string());
    add("type", "^[A-Z][a-zA-Z]*Interface$".to_string());
    for suffix in ["Store", "Action", "Reducer", "State", "Hook"] {
        add("state", format!("^[A-Z][a-zA-Z]*{suffix}$"));
    }
    patterns
});

/// Returns the convention family the name matches, if any.
#[must_use]
pub fn naming_convention_family(name: &str) -> Option<&'static str> {
    NAMING_PATTERNS.iter().find(|(_, pattern)| pattern.is_match(name)).map(|(family, _)| *family)
}

/// Counts how many other summaries reference `name` in their dependencies,
/// backend name collections, or DTO keys.
fn count_cross_references(name: &str, known: &SummaryMap) -> usize {
    let mut references = 0;
    for summary in known.values() {
        if summary.dependencies.iter().any(|dep| dep == name) {
            references += 1;
        }
        for collection in
            [&summary.backend.services, &summary.backend.controllers, &summary.backend.repositories]
        {
            if collection.contains(name) {
                references += 1;
            }
        }
        if summary.backend.dtos.contains_key(name) {
            references += 1;
        }
    }
    references
}

/// Scores an entity name's existence from independent signals.
///
/// Returns the additive score (clamped to `[0, 1]`) and the ordered list of
/// contributing-signal reasons. A retrieval failure is a zero-strength
/// signal: it lowers the score but never raises an error.
pub async fn validate_entity_existence(
    name: &str,
    corpus: &str,
    known: &SummaryMap,
    retriever: &dyn Retriever,
) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut reasons = Vec::new();

    if corpus.contains(name) {
        score += DIRECT_MATCH_WEIGHT;
        reasons.push("name appears verbatim in the source documents".to_string());
    }

    match retriever.retrieve(name, RetrievalIndex::Documents, SCORING_TOP_K).await {
        Ok(context) if context.len() > MIN_CONTEXT_LEN => {
            score += RETRIEVAL_WEIGHT;
            reasons.push("semantic retrieval returned substantial context".to_string());
        }
        Ok(_) => {}
        Err(e) => {
            debug!("retrieval unavailable while scoring {name}: {e}");
        }
    }

    let references = count_cross_references(name, known);
    if references > 0 {
        #[allow(clippy::cast_precision_loss)]
        let contribution = (REFERENCE_WEIGHT * references as f64).min(REFERENCE_CAP);
        score += contribution;
        reasons.push(format!("referenced by {references} other catalogued entities"));
    }

    if let Some(family) = naming_convention_family(name) {
        score += NAMING_BONUS;
        reasons.push(format!("name follows the {family} naming convention"));
    }

    (score.min(1.0), reasons)
}

/// Outcome of classifying a scored entity name.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Final score after any naming penalty, floored at 0.
    pub score: f64,
    /// Tier the final score falls into.
    pub level: ConfidenceLevel,
    /// Whether the name matched no recognized convention.
    pub naming_issue: bool,
    /// Replacement candidates when the name is nonconforming.
    pub naming_suggestions: Vec<String>,
}

/// Classifies a scored name into a confidence tier.
///
/// A name matching no naming convention takes a penalty of
/// [`NAMING_PENALTY`] (floored at 0) before the thresholds apply, and
/// carries naming suggestions.
#[must_use]
pub fn classify_entity(name: &str, score: f64) -> Classification {
    let naming_issue = naming_convention_family(name).is_none();
    let (score, naming_suggestions) = if naming_issue {
        ((score - NAMING_PENALTY).max(0.0), suggest_corrections(name))
    } else {
        (score, Vec::new())
    };

    let level = if score >= VERIFIED_THRESHOLD {
        ConfidenceLevel::Verified
    } else if score >= INFERRED_THRESHOLD {
        ConfidenceLevel::Inferred
    } else if score >= NEEDS_VERIFICATION_THRESHOLD {
        ConfidenceLevel::NeedsVerification
    } else {
        ConfidenceLevel::Hallucination
    };

    Classification { score, level, naming_issue, naming_suggestions }
}

/// Stamps a classification into a summary's validation block.
pub fn apply_classification(summary: &mut EntitySummary, classification: &Classification) {
    let validation = summary.validation_mut();
    validation.confidence_score = Some(classification.score);
    validation.confidence_level = Some(classification.level);
    validation.naming_issue = classification.naming_issue;
    validation.naming_suggestions = classification.naming_suggestions.clone();
}

/// Validates a summary's declared dependencies.
///
/// Each dependency is re-scored with the same signals, plus one more: a
/// substantial hit in the summaries index means the dependency was
/// summarized in this or an earlier run and counts as confirmed. Valid
/// dependencies (score at or above the inferred threshold) are kept;
/// uncertain ones (at or above needs-verification) are recorded but
/// dropped from the main list; the rest are recorded as invalid and
/// dropped.
pub async fn validate_dependencies(
    summary: &mut EntitySummary,
    corpus: &str,
    known: &SummaryMap,
    retriever: &dyn Retriever,
) {
    if summary.dependencies.is_empty() {
        return;
    }

    let declared = std::mem::take(&mut summary.dependencies);
    let mut valid = Vec::new();
    let mut uncertain = Vec::new();
    let mut invalid = Vec::new();

    for dep in declared {
        let (mut confidence, mut reasons) =
            validate_entity_existence(&dep, corpus, known, retriever).await;

        match retriever.retrieve(&dep, RetrievalIndex::Summaries, SCORING_TOP_K).await {
            Ok(context) if context.len() > MIN_CONTEXT_LEN => {
                confidence = (confidence + SUMMARY_MATCH_WEIGHT).min(1.0);
                reasons.push("a persisted summary matches this dependency".to_string());
            }
            Ok(_) => {}
            Err(e) => {
                debug!("summaries index unavailable while validating {dep}: {e}");
            }
        }
        if confidence >= INFERRED_THRESHOLD {
            valid.push(dep);
        } else if confidence >= NEEDS_VERIFICATION_THRESHOLD {
            warn!("dependency {dep} is uncertain (confidence {confidence:.2})");
            uncertain.push(DependencyAssessment { name: dep, confidence, reasons });
        } else {
            warn!("dropping untrusted dependency {dep} (confidence {confidence:.2})");
            invalid.push(DependencyAssessment { name: dep, confidence, reasons });
        }
    }

    summary.dependencies = valid;
    if !uncertain.is_empty() || !invalid.is_empty() {
        let validation = summary.validation_mut();
        validation.uncertain_dependencies = uncertain;
        validation.invalid_dependencies = invalid;
    }
}

/// Keywords that mark a paragraph as architecturally relevant.
const EVIDENCE_KEYWORDS: [&str; 6] =
    ["service", "controller", "repository", "function", "api", "endpoint"];

/// How many top-scoring paragraphs to keep as evidence.
const EVIDENCE_LIMIT: usize = 2;

/// Attaches the most relevant retrieved paragraphs as documentation
/// evidence on the summary.
///
/// Paragraphs are scored by exact name occurrence, path-segment matches,
/// and architecture keywords; the top two land in
/// `validation.documentation_evidence`. Retrieval failure leaves the
/// summary untouched.
pub async fn enhance_with_evidence(
    name: &str,
    retriever: &dyn Retriever,
    summary: &mut EntitySummary,
) {
    let context = match retriever.retrieve(name, RetrievalIndex::Documents, SCORING_TOP_K).await {
        Ok(context) => context,
        Err(e) => {
            debug!("retrieval unavailable while gathering evidence for {name}: {e}");
            return;
        }
    };

    let mut scored: Vec<(i32, &str)> = Vec::new();
    for paragraph in context.split("\n\n") {
        let trimmed = paragraph.trim();
        if trimmed.len() < 10 {
            continue;
        }

        let mut score = 0;
        if trimmed.contains(name) {
            score += 5;
        }
        for part in name.split('/') {
            if part.len() > 3 && trimmed.contains(part) {
                score += 2;
            }
        }
        let lower = trimmed.to_lowercase();
        for keyword in EVIDENCE_KEYWORDS {
            if lower.contains(keyword) {
                score += 1;
            }
        }

        if score > 0 {
            scored.push((score, trimmed));
        }
    }

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    let relevant: Vec<String> =
        scored.into_iter().take(EVIDENCE_LIMIT).map(|(_, p)| p.to_string()).collect();

    if !relevant.is_empty() {
        summary.validation_mut().documentation_evidence = relevant;
    }
}
