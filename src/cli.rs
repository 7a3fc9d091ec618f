//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default model used for completion calls.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Top-level CLI parser for `clarify`.
#[derive(Debug, Parser)]
#[command(
    name = "clarify",
    version,
    about = "Turn architecture documents into a validated entity catalogue"
)]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full analysis pipeline over a document directory.
    Run {
        /// Directory holding the markdown source documents.
        #[arg(long)]
        input: PathBuf,
        /// Directory summaries and the run report are written to.
        #[arg(long)]
        output: PathBuf,
        /// Model identifier for completion calls.
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
        /// Restrict processing to the named entities (repeatable).
        #[arg(long = "entity")]
        entities: Vec<String>,
    },
    /// Check dependency-graph consistency of persisted summaries.
    Graph {
        /// Directory holding persisted summaries.
        #[arg(long)]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_run_subcommand() {
        let cli = Cli::parse_from(["clarify", "run", "--input", "docs", "--output", "out"]);
        match cli.command {
            Command::Run { input, output, model, entities } => {
                assert_eq!(input.to_str(), Some("docs"));
                assert_eq!(output.to_str(), Some("out"));
                assert_eq!(model, super::DEFAULT_MODEL);
                assert!(entities.is_empty());
            }
            Command::Graph { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn entity_flag_is_repeatable() {
        let cli = Cli::parse_from([
            "clarify", "run", "--input", "docs", "--output", "out", "--entity", "AuthService",
            "--entity", "CartService",
        ]);
        match cli.command {
            Command::Run { entities, .. } => {
                assert_eq!(entities, vec!["AuthService", "CartService"]);
            }
            Command::Graph { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn parses_graph_subcommand() {
        let cli = Cli::parse_from(["clarify", "graph", "--output", "out"]);
        assert!(matches!(cli.command, Command::Graph { .. }));
    }

    #[test]
    fn run_requires_input_and_output() {
        assert!(Cli::try_parse_from(["clarify", "run"]).is_err());
        assert!(Cli::try_parse_from(["clarify", "run", "--input", "docs"]).is_err());
    }
}
