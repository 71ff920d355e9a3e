use std::process::ExitCode;

use simt_atomics_gen::{GeneratorConfig, logging, run};
use tracing::error;

fn main() -> ExitCode {
    let config = GeneratorConfig::from_env();
    logging::init(&config.log);
    match run(&config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "generation failed");
            ExitCode::FAILURE
        }
    }
}
