use miette::{miette, Result};
use tracing_subscriber::EnvFilter;

use crate::config::{Cfg, LogFormat};

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. Logs go to stderr so command output stays clean.
pub fn init(cfg: &Cfg) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cfg.log_level()))
        .map_err(|e| miette!("invalid log level '{}': {}", cfg.log_level(), e))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match cfg.log_format() {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    result.map_err(|e| miette!("failed to initialise logging: {}", e))
}
