//! End-to-end analysis pipeline.
//!
//! Reads the document corpus, discovers entities, summarizes and validates
//! each one, refines nested children, runs the auto-correction pass, and
//! finishes with a dependency-graph consistency report. Processing is
//! sequential; one entity's failure never aborts its siblings.

use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::confidence::{
    apply_classification, classify_entity, enhance_with_evidence, validate_dependencies,
    validate_entity_existence,
};
use crate::context::ServiceContext;
use crate::discovery::discover_entities;
use crate::graph::{analyze_dependency_graph, GraphAnalysis};
use crate::naming::auto_correct_entities;
use crate::ports::filesystem::FileSystem;
use crate::ports::retrieval::RetrievalIndex;
use crate::refine::{refine_children, RefineContext};
use crate::schema::{Entity, SummaryMap};
use crate::store::SummaryStore;
use crate::summarize::{log_parse_outcome, summarize_entity};

/// Passages retrieved as context for one top-level entity summary.
const PIPELINE_TOP_K: usize = 5;

/// File name of the run report written into the output directory.
pub const REPORT_FILE: &str = "analysis_report.yaml";

/// Inputs for one pipeline run.
pub struct PipelineConfig {
    /// Directory holding the `.md` source documents.
    pub input_dir: PathBuf,
    /// Directory summaries and the run report are written to.
    pub output_dir: PathBuf,
    /// Model identifier passed to the LLM port.
    pub model: String,
    /// When set, only entities with these names are processed.
    pub only: Option<Vec<String>>,
}

/// Summary of what one pipeline run did, persisted as YAML.
#[derive(Debug, Serialize)]
pub struct PipelineReport {
    /// Unique identifier of this run.
    pub run_id: String,
    /// Completion timestamp, RFC 3339.
    pub finished_at: String,
    /// Entities discovery reported after deduplication.
    pub entities_discovered: usize,
    /// Entities summarized, including refined children.
    pub entities_processed: usize,
    /// `(old, new)` renames applied by the correction pass.
    pub renamed: Vec<(String, String)>,
    /// Names removed as hallucinations.
    pub removed: Vec<String>,
    /// Entities with no dependencies and no referencing entities.
    pub isolated: Vec<String>,
    /// Declared dependencies whose target does not exist.
    pub dangling: Vec<(String, String)>,
    /// Closed, normalized dependency cycles.
    pub cycles: Vec<Vec<String>>,
}

/// Concatenates the sorted `.md` files of a directory, each prefixed with
/// a file header so entity evidence can be traced back to its source.
///
/// # Errors
///
/// Returns an error when the directory or one of its files is unreadable.
pub fn read_corpus(fs: &dyn FileSystem, dir: &Path) -> Result<String, String> {
    let mut entries = fs
        .list_dir(dir)
        .map_err(|e| format!("failed to list {}: {e}", dir.display()))?;
    entries.sort();

    let mut corpus = String::new();
    for name in entries.iter().filter(|n| n.ends_with(".md")) {
        let path = dir.join(name);
        let contents = fs
            .read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        corpus.push_str(&format!("\n\n### FILE: {name} ###\n\n"));
        corpus.push_str(&contents);
    }
    Ok(corpus)
}

/// Orders entities so base entities come before dependent ones.
///
/// Names without a path separator go first, sorted by length; path-like
/// names follow, sorted by segment count. Base entities are thus scored
/// and persisted before the entities likely to reference them.
#[must_use]
pub fn order_entities(entities: Vec<Entity>) -> Vec<Entity> {
    let (mut simple, mut complex): (Vec<Entity>, Vec<Entity>) =
        entities.into_iter().partition(|e| !e.name.contains('/'));
    simple.sort_by_key(|e| e.name.len());
    complex.sort_by_key(|e| e.name.split('/').count());
    simple.extend(complex);
    simple
}

/// Runs the full analysis pipeline.
///
/// # Errors
///
/// Returns an error when the input directory is unreadable or a summary
/// cannot be persisted. Model and retrieval failures degrade per entity
/// and the run continues.
pub async fn run_pipeline(
    ctx: &ServiceContext,
    config: &PipelineConfig,
) -> Result<PipelineReport, String> {
    info!("reading documents from {}", config.input_dir.display());
    let corpus = read_corpus(ctx.fs.as_ref(), &config.input_dir)?;

    let entities = discover_entities(ctx.llm.as_ref(), &corpus, &config.model).await;
    let entities_discovered = entities.len();
    let mut entities = order_entities(entities);
    if let Some(only) = &config.only {
        entities.retain(|e| only.iter().any(|n| n == &e.name));
        info!("restricted to {} requested entities", entities.len());
    }

    let store = SummaryStore::new(ctx.fs.as_ref(), &config.output_dir);
    let mut summaries = SummaryMap::new();
    let mut refine = RefineContext::new();

    for entity in &entities {
        if !refine.mark(entity.composite_key()) {
            info!("entity already processed, skipping: {}", entity.name);
            continue;
        }
        info!("processing entity {}", entity.name);

        let context = match ctx
            .retriever
            .retrieve(&entity.name, RetrievalIndex::Documents, PIPELINE_TOP_K)
            .await
        {
            Ok(context) => context,
            Err(e) => {
                warn!("retrieval failed for {}: {e}", entity.name);
                String::new()
            }
        };

        let outcome = summarize_entity(ctx.llm.as_ref(), entity, &context, &config.model).await;
        log_parse_outcome(&entity.name, &outcome);
        let mut summary = outcome.into_value();

        validate_dependencies(&mut summary, &corpus, &summaries, ctx.retriever.as_ref()).await;
        enhance_with_evidence(&entity.name, ctx.retriever.as_ref(), &mut summary).await;

        let (score, _reasons) =
            validate_entity_existence(&entity.name, &corpus, &summaries, ctx.retriever.as_ref())
                .await;
        let classification = classify_entity(&entity.name, score);
        apply_classification(&mut summary, &classification);

        store.save(&entity.name, &summary)?;
        if let Ok(json) = serde_json::to_string(&summary) {
            if let Err(e) = ctx.retriever.store_summary(&entity.name, &json).await {
                warn!("failed to index summary for {}: {e}", entity.name);
            }
        }

        summaries.insert(entity.name.clone(), summary.clone());
        refine_children(
            ctx,
            &store,
            &config.model,
            entity,
            &summary,
            &mut summaries,
            &mut refine,
            0,
        )
        .await?;
    }

    let entities_processed = refine.len();
    let (summaries, corrections) =
        auto_correct_entities(summaries, &corpus, true, ctx.retriever.as_ref()).await;
    for (name, summary) in &summaries {
        store.save(name, summary)?;
    }

    let analysis: GraphAnalysis = analyze_dependency_graph(&summaries);

    let report = PipelineReport {
        run_id: Uuid::new_v4().to_string(),
        finished_at: Utc::now().to_rfc3339(),
        entities_discovered,
        entities_processed,
        renamed: corrections.renamed,
        removed: corrections.removed,
        isolated: analysis.isolated,
        dangling: analysis.dangling,
        cycles: analysis.cycles,
    };

    let yaml = serde_yaml::to_string(&report)
        .map_err(|e| format!("failed to serialize the run report: {e}"))?;
    let report_path = config.output_dir.join(REPORT_FILE);
    ctx.fs
        .write(&report_path, &yaml)
        .map_err(|e| format!("failed to write {}: {e}", report_path.display()))?;

    info!(
        "pipeline finished: {} discovered, {} processed, report at {}",
        report.entities_discovered,
        report.entities_processed,
        report_path.display()
    );
    Ok(report)
}
