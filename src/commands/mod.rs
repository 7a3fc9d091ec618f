//! Command dispatch and handlers.

pub mod graph;
pub mod run;

use crate::cli::Command;
use crate::context::ServiceContext;

/// Dispatches a parsed command to its handler with live services.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    let ctx = ServiceContext::live();
    dispatch_with_context(command, &ctx)
}

/// Dispatches a command with the given service context.
pub fn dispatch_with_context(command: &Command, ctx: &ServiceContext) -> Result<(), String> {
    match command {
        Command::Run { input, output, model, entities } => {
            run::run(ctx, input, output, model, entities)
        }
        Command::Graph { output } => graph::run(ctx, output),
    }
}
