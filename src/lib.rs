use std::fs;
use std::path::PathBuf;

use simt_atomics::Emitter;
use tracing::info;

/// Output path, catalog and logging settings.
pub mod config;
pub mod error;
/// `tracing` subscriber setup for the binary.
pub mod logging;

pub use config::{GeneratorConfig, LogConfig};
pub use error::GenerateError;

/// What one run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    pub output: PathBuf,
    pub entries: usize,
    pub leaves: usize,
    pub bytes: usize,
}

/// Generates the unit for `config.catalog` and writes it to `config.output`.
pub fn run(config: &GeneratorConfig) -> Result<Summary, GenerateError> {
    let unit = Emitter::new(&config.catalog).emit()?;
    let text = unit.render()?;
    fs::write(&config.output, &text).map_err(|source| GenerateError::Io {
        path: config.output.clone(),
        source,
    })?;

    let summary = Summary {
        output: config.output.clone(),
        entries: unit.table().len(),
        leaves: unit.leaf_count(),
        bytes: text.len(),
    };
    info!(
        path = %summary.output.display(),
        entries = summary.entries,
        leaves = summary.leaves,
        bytes = summary.bytes,
        "wrote generated unit"
    );
    Ok(summary)
}
