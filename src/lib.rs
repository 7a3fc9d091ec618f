//! Core library entry for the `clarify` CLI.
//!
//! `clarify` turns a directory of free-form architecture documents into a
//! validated catalogue of software entities: it discovers entities with an
//! LLM, summarizes each one against retrieved context, scores how
//! trustworthy the extraction is, corrects nonconforming names, decomposes
//! nested structures, and checks the resulting dependency graph for
//! consistency.

pub mod adapters;
pub mod chunk;
pub mod cli;
pub mod commands;
pub mod confidence;
pub mod context;
pub mod discovery;
pub mod graph;
pub mod naming;
pub mod pipeline;
pub mod ports;
pub mod refine;
pub mod schema;
pub mod store;
pub mod summarize;

use clap::Parser;

/// Runs the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command
/// execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli.command)
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn run_errors_on_unknown_subcommand() {
        assert!(run(["clarify", "unknown"]).is_err());
    }

    #[test]
    fn run_errors_without_required_args() {
        assert!(run(["clarify", "run"]).is_err());
    }

    #[test]
    fn graph_on_an_empty_directory_succeeds() {
        let dir = std::env::temp_dir().join("clarify-lib-test-empty");
        let result = run(["clarify", "graph", "--output", dir.to_str().unwrap()]);
        assert!(result.is_ok());
    }
}
