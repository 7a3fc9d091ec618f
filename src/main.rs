//! Binary entrypoint for the `clarify` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::init();

    match clarify::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
