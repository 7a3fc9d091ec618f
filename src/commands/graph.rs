//! Handler for the `graph` command.

use std::path::Path;

use crate::context::ServiceContext;
use crate::graph::{analyze_dependency_graph, format_report};
use crate::schema::SummaryMap;
use crate::store::SummaryStore;

/// Analyzes the dependency graph of previously persisted summaries.
///
/// # Errors
///
/// Returns an error string when a persisted summary cannot be read.
pub fn run(ctx: &ServiceContext, output: &Path) -> Result<(), String> {
    let store = SummaryStore::new(ctx.fs.as_ref(), output);
    let names = store.list();
    if names.is_empty() {
        println!("No summaries found under {}", output.display());
        return Ok(());
    }

    let mut summaries = SummaryMap::new();
    for name in names {
        let summary = store.load(&name)?;
        summaries.insert(name, summary);
    }

    let analysis = analyze_dependency_graph(&summaries);
    print!("{}", format_report(&analysis));
    Ok(())
}
