use std::env;
use std::path::PathBuf;

use simt_atomics::AxisCatalog;

pub const DEFAULT_OUTPUT: &str = "atomic_generated.rs";

#[derive(Clone, Debug)]
pub struct LogConfig {
    /// Used when `RUST_LOG` is unset or does not parse.
    pub default_directive: String,
    pub ansi: bool,
    pub include_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_directive: "info".to_string(),
            ansi: true,
            include_targets: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub output: PathBuf,
    pub catalog: AxisCatalog,
    pub log: LogConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            catalog: AxisCatalog::standard(),
            log: LogConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// The default configuration with log formatting adjusted for the
    /// terminal: `NO_COLOR` (any value) disables ANSI output. Nothing in the
    /// environment changes what is generated or where it is written.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if env::var_os("NO_COLOR").is_some() {
            config.log.ansi = false;
        }
        config
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }
}
