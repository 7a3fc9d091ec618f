//! Naming-convention corrections over the shared summary map.
//!
//! Rename and merge are pure map-in/map-out operations: they take ownership
//! of the summary map and return the corrected one, so a failure can never
//! leave the map half-updated. Applying the same correction twice is a
//! no-op the second time.

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::confidence::{apply_classification, classify_entity, validate_entity_existence};
use crate::ports::retrieval::Retriever;
use crate::schema::{ConfidenceLevel, SummaryMap};

/// Bare capitalized identifier without any recognized suffix.
static BARE_CAPITALIZED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z]*$").expect("bare identifier pattern is valid"));

const KNOWN_SUFFIXES: [&str; 7] =
    ["Service", "Repository", "Controller", "Component", "Page", "Model", "Entity"];

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Proposes replacement names for a convention-nonconforming name, best
/// guess first.
#[must_use]
pub fn suggest_corrections(name: &str) -> Vec<String> {
    let mut suggestions = Vec::new();

    // Capitalized identifier missing a recognized suffix: infer one from
    // substrings already present in the name.
    if BARE_CAPITALIZED.is_match(name)
        && !KNOWN_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
    {
        if name.contains("Service") || name.contains("Provider") {
            suggestions.push(format!("{name}Service"));
        } else if name.contains("Repo") || name.contains("Data") || name.contains("Store") {
            suggestions.push(format!("{name}Repository"));
        } else if name.contains("Control") || name.contains("Api") || name.contains("Endpoint") {
            suggestions.push(format!("{name}Controller"));
        } else if name.contains("UI") || name.contains("View") || name.contains("Element") {
            suggestions.push(format!("{name}Component"));
        } else {
            suggestions.push(format!("{name}Service"));
            suggestions.push(format!("{name}Component"));
            suggestions.push(format!("{name}Entity"));
        }
    }

    // Lowercase start that is not a hook: propose a capitalized variant,
    // plus a normalized hook name when "use" appears mid-name.
    if !name.starts_with(char::is_uppercase) && !name.starts_with("use") {
        let corrected = capitalize(name);
        suggestions.push(corrected.clone());
        if name.to_lowercase().contains("use") {
            suggestions.push(format!("use{}", corrected.replace("Use", "")));
        }
    }

    // Snake case: propose the camel-cased conversion and suffixed variants.
    if name.contains('_') {
        let camel: String = name.split('_').map(capitalize).collect();
        suggestions.push(camel.clone());
        suggestions.push(format!("{camel}Service"));
        suggestions.push(format!("{camel}Component"));
    }

    suggestions.dedup();
    suggestions
}

/// Rewrites one dependency list, redirecting `old` to `new`.
///
/// A redirected entry that would duplicate an existing one, or that would
/// make `owner` depend on itself, is dropped instead.
fn redirect_dependencies(owner: &str, deps: Vec<String>, old: &str, new: &str) -> Vec<String> {
    let mut rewritten: Vec<String> = Vec::with_capacity(deps.len());
    for dep in deps {
        let target = if dep == old { new.to_string() } else { dep };
        if target == owner || rewritten.contains(&target) {
            continue;
        }
        rewritten.push(target);
    }
    rewritten
}

/// Renames `old` to `new` in the summary map, merging when `new` already
/// exists, and redirects every cross-reference from `old` to `new`.
///
/// When `old` is absent the map is returned unchanged with a diagnostic.
/// Repeated application with the same arguments is a no-op.
#[must_use]
pub fn apply_naming_correction(old: &str, new: &str, mut map: SummaryMap) -> SummaryMap {
    if old == new {
        return map;
    }
    let Some(mut summary) = map.remove(old) else {
        debug!("naming correction {old} -> {new} skipped: {old} is not in the map");
        return map;
    };

    if let Some(existing) = map.get_mut(new) {
        // Merge into the already-present summary.
        info!("entity {new} already exists, merging {old} into it");
        if !existing.merged_from.iter().any(|n| n == old) {
            existing.merged_from.push(old.to_string());
        }
        for dep in summary.dependencies {
            if dep != old && dep != new && !existing.dependencies.contains(&dep) {
                existing.dependencies.push(dep);
            }
        }
        if let Some(validation) = summary.validation {
            let merged = existing.validation_mut();
            for evidence in validation.documentation_evidence {
                if !merged.documentation_evidence.contains(&evidence) {
                    merged.documentation_evidence.push(evidence);
                }
            }
        }
    } else {
        summary.renamed_from = Some(old.to_string());
        if let Some(validation) = summary.validation.as_mut() {
            validation.naming_issue = false;
            validation.naming_suggestions.clear();
        }
        info!("entity renamed from {old} to {new}");
        map.insert(new.to_string(), summary);
    }

    let names: Vec<String> = map.keys().cloned().collect();
    for name in names {
        if let Some(entry) = map.get_mut(&name) {
            let deps = std::mem::take(&mut entry.dependencies);
            entry.dependencies = redirect_dependencies(&name, deps, old, new);
        }
    }
    map
}

/// What the auto-correction pass did to the map.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CorrectionReport {
    /// `(old, new)` pairs applied as renames or merges.
    pub renamed: Vec<(String, String)>,
    /// Names removed as hallucinations.
    pub removed: Vec<String>,
}

/// Scores, classifies, and corrects every entity in the map.
///
/// Runs three passes: classify everything and collect the plans, apply
/// renames, then apply removals. Renames always precede deletions so a
/// reference to an about-to-be-renamed entity is redirected before any
/// deletion can strip it.
pub async fn auto_correct_entities(
    mut map: SummaryMap,
    corpus: &str,
    remove_hallucinations: bool,
    retriever: &dyn Retriever,
) -> (SummaryMap, CorrectionReport) {
    let mut report = CorrectionReport::default();
    let mut rename_plan: Vec<(String, String)> = Vec::new();
    let mut removal_plan: Vec<String> = Vec::new();

    let names: Vec<String> = map.keys().cloned().collect();
    for name in &names {
        let (score, _reasons) =
            validate_entity_existence(name, corpus, &map, retriever).await;
        let classification = classify_entity(name, score);

        if classification.level == ConfidenceLevel::Hallucination && remove_hallucinations {
            warn!("marking hallucinated entity {name} for removal");
            removal_plan.push(name.clone());
        } else if classification.naming_issue {
            if let Some(suggestion) = classification.naming_suggestions.first() {
                info!("marking {name} for rename to {suggestion}");
                rename_plan.push((name.clone(), suggestion.clone()));
            }
        }

        if let Some(summary) = map.get_mut(name) {
            apply_classification(summary, &classification);
        }
    }

    for (old, new) in rename_plan {
        if map.contains_key(&old) {
            map = apply_naming_correction(&old, &new, map);
            report.renamed.push((old, new));
        }
    }

    for name in removal_plan {
        if map.remove(&name).is_none() {
            // Already gone, e.g. merged away by a rename.
            continue;
        }
        for summary in map.values_mut() {
            if summary.dependencies.iter().any(|dep| dep == &name) {
                summary.dependencies.retain(|dep| dep != &name);
                summary.validation_mut().removed_dependencies.push(name.clone());
            }
        }
        report.removed.push(name);
    }

    info!(
        "entity correction finished: {} renamed, {} removed",
        report.renamed.len(),
        report.removed.len()
    );
    (map, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::retrieval::{RetrievalFuture, RetrievalIndex, StoreFuture};
    use crate::schema::EntitySummary;

    /// Fake retriever that never finds anything.
    struct NullRetriever;

    impl Retriever for NullRetriever {
        fn retrieve(&self, _query: &str, _index: RetrievalIndex, _top_k: usize) -> RetrievalFuture<'_> {
            Box::pin(async { Ok(String::new()) })
        }

        fn store_summary(&self, _entity_name: &str, _summary_json: &str) -> StoreFuture<'_> {
            Box::pin(async { Ok(()) })
        }
    }

    fn summary_with_deps(deps: &[&str]) -> EntitySummary {
        EntitySummary {
            dependencies: deps.iter().map(|d| (*d).to_string()).collect(),
            ..EntitySummary::default()
        }
    }

    #[test]
    fn bare_name_gets_suffix_inferred_from_substrings() {
        assert_eq!(suggest_corrections("AuthProvider"), vec!["AuthProviderService"]);
        assert_eq!(suggest_corrections("UserData"), vec!["UserDataRepository"]);
        assert_eq!(suggest_corrections("PaymentApi"), vec!["PaymentApiController"]);
        assert_eq!(suggest_corrections("CartView"), vec!["CartViewComponent"]);
    }

    #[test]
    fn bare_name_without_hints_gets_generic_suffixes() {
        assert_eq!(suggest_corrections("Auth"), vec!["AuthService", "AuthComponent", "AuthEntity"]);
    }

    #[test]
    fn lowercase_name_gets_capitalized() {
        assert_eq!(suggest_corrections("userAuth"), vec!["UserAuth"]);
    }

    #[test]
    fn misplaced_use_gets_hook_variant() {
        let suggestions = suggest_corrections("authUseToken");
        assert_eq!(suggestions[0], "AuthUseToken");
        assert!(suggestions.contains(&"useAuthToken".to_string()));
    }

    #[test]
    fn snake_case_gets_camel_and_suffixed_variants() {
        let suggestions = suggest_corrections("user_profile");
        assert!(suggestions.contains(&"UserProfile".to_string()));
        assert!(suggestions.contains(&"UserProfileService".to_string()));
        assert!(suggestions.contains(&"UserProfileComponent".to_string()));
    }

    #[test]
    fn conforming_names_get_no_suggestions() {
        assert!(suggest_corrections("AuthService").is_empty());
        assert!(suggest_corrections("useAuth").is_empty());
    }

    #[test]
    fn rename_moves_summary_and_redirects_references() {
        let mut map = SummaryMap::new();
        map.insert("userAuth".into(), summary_with_deps(&["TokenService"]));
        map.insert("LoginController".into(), summary_with_deps(&["userAuth"]));

        let map = apply_naming_correction("userAuth", "UserAuth", map);

        assert!(!map.contains_key("userAuth"));
        let renamed = &map["UserAuth"];
        assert_eq!(renamed.renamed_from.as_deref(), Some("userAuth"));
        assert_eq!(map["LoginController"].dependencies, vec!["UserAuth"]);
    }

    #[test]
    fn rename_is_idempotent() {
        let mut map = SummaryMap::new();
        map.insert("userAuth".into(), summary_with_deps(&[]));
        map.insert("LoginController".into(), summary_with_deps(&["userAuth"]));

        let once = apply_naming_correction("userAuth", "UserAuth", map);
        let twice = apply_naming_correction("userAuth", "UserAuth", once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_unions_dependencies_without_duplicates() {
        let mut map = SummaryMap::new();
        map.insert("userAuth".into(), summary_with_deps(&["X"]));
        map.insert("UserAuth".into(), summary_with_deps(&["X", "Y"]));

        let map = apply_naming_correction("userAuth", "UserAuth", map);

        let merged = &map["UserAuth"];
        assert_eq!(merged.dependencies, vec!["X", "Y"]);
        assert_eq!(merged.merged_from, vec!["userAuth"]);
    }

    #[test]
    fn merge_never_introduces_a_self_reference() {
        let mut map = SummaryMap::new();
        map.insert("userAuth".into(), summary_with_deps(&["UserAuth", "userAuth", "Z"]));
        map.insert("UserAuth".into(), summary_with_deps(&[]));
        map.insert("Other".into(), summary_with_deps(&["userAuth"]));

        let map = apply_naming_correction("userAuth", "UserAuth", map);

        assert_eq!(map["UserAuth"].dependencies, vec!["Z"]);
        assert_eq!(map["Other"].dependencies, vec!["UserAuth"]);
    }

    #[test]
    fn correction_on_missing_name_is_a_noop() {
        let mut map = SummaryMap::new();
        map.insert("AuthService".into(), summary_with_deps(&[]));
        let after = apply_naming_correction("Ghost", "GhostService", map.clone());
        assert_eq!(map, after);
    }

    #[tokio::test]
    async fn hallucinations_are_removed_and_stripped_from_dependents() {
        // "zz" gets one cross-reference (0.2) and the naming penalty,
        // landing at 0.1: hallucination.
        let corpus = "AuthService handles login. LoginController calls it.";
        let mut map = SummaryMap::new();
        map.insert("AuthService".into(), summary_with_deps(&["zz"]));
        map.insert("LoginController".into(), summary_with_deps(&["AuthService"]));
        map.insert("zz".into(), summary_with_deps(&[]));

        let (map, report) = auto_correct_entities(map, corpus, true, &NullRetriever).await;

        assert!(!map.contains_key("zz"));
        assert_eq!(report.removed, vec!["zz"]);
        assert!(map["AuthService"].dependencies.is_empty());
        assert_eq!(map["LoginController"].dependencies, vec!["AuthService"]);
        let validation = map["AuthService"].validation.as_ref().expect("validation block");
        assert_eq!(validation.removed_dependencies, vec!["zz"]);
    }

    #[tokio::test]
    async fn hallucination_removal_can_be_disabled() {
        // Conforming name nowhere in the corpus: 0.1, hallucination, but
        // with no naming issue there is nothing to rename either.
        let mut map = SummaryMap::new();
        map.insert("GhostService".into(), summary_with_deps(&[]));

        let (map, report) = auto_correct_entities(map, "", false, &NullRetriever).await;

        assert!(map.contains_key("GhostService"));
        assert!(report.removed.is_empty());
        let validation = map["GhostService"].validation.as_ref().expect("validation block");
        assert_eq!(validation.confidence_level, Some(ConfidenceLevel::Hallucination));
    }

    #[tokio::test]
    async fn nonconforming_inferred_entity_is_renamed() {
        // "userService" scores verbatim (0.5) plus one cross-reference
        // (0.2), minus the naming penalty: inferred, with a
        // capitalization suggestion.
        let corpus = "The userService module owns login, called by LoginController.";
        let mut map = SummaryMap::new();
        map.insert("userService".into(), summary_with_deps(&[]));
        map.insert("LoginController".into(), summary_with_deps(&["userService"]));

        let (map, report) = auto_correct_entities(map, corpus, true, &NullRetriever).await;

        assert_eq!(report.renamed, vec![("userService".to_string(), "UserService".to_string())]);
        assert!(map.contains_key("UserService"));
        assert_eq!(map["LoginController"].dependencies, vec!["UserService"]);
    }
}
