//! Binary entrypoint for the `outer` CLI.

use std::process::ExitCode;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    // A missing .env is fine; it only supplies credentials.
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_env("OUTER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Recording and replay are handled in commands::dispatch via
    // OUTER_RECORD=<file> and OUTER_REPLAY=<file>.
    match outer::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
