//! Handler for the `run` command.

use std::path::Path;

use crate::context::ServiceContext;
use crate::pipeline::{run_pipeline, PipelineConfig};

/// Runs the full analysis pipeline and prints a short outcome summary.
///
/// # Errors
///
/// Returns an error string when the runtime cannot be built, the input
/// directory is unreadable, or a summary cannot be persisted.
pub fn run(
    ctx: &ServiceContext,
    input: &Path,
    output: &Path,
    model: &str,
    entities: &[String],
) -> Result<(), String> {
    let config = PipelineConfig {
        input_dir: input.to_path_buf(),
        output_dir: output.to_path_buf(),
        model: model.to_string(),
        only: if entities.is_empty() { None } else { Some(entities.to_vec()) },
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build async runtime: {e}"))?;
    let report = runtime.block_on(run_pipeline(ctx, &config))?;

    println!(
        "Processed {} of {} discovered entities.",
        report.entities_processed, report.entities_discovered
    );
    if !report.renamed.is_empty() {
        println!("Renamed {} entities:", report.renamed.len());
        for (old, new) in &report.renamed {
            println!("  {old} -> {new}");
        }
    }
    if !report.removed.is_empty() {
        println!("Removed {} hallucinated entities:", report.removed.len());
        for name in &report.removed {
            println!("  {name}");
        }
    }
    if !report.dangling.is_empty() {
        println!("Dangling references: {}", report.dangling.len());
    }
    if !report.cycles.is_empty() {
        println!("Dependency cycles: {}", report.cycles.len());
    }
    println!("Report written to {}", output.join(crate::pipeline::REPORT_FILE).display());
    Ok(())
}
