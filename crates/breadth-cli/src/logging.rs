use tracing_subscriber::EnvFilter;

use crate::error::CliError;

/// Installs the global subscriber; `RUST_LOG` wins over `level`.
///
/// Log lines go to stderr so stdout carries only the response envelope.
pub fn init(level: &str, json: bool) -> Result<(), CliError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|error| CliError::Logging(format!("invalid --log-level '{level}': {error}")))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_env_filter(filter);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|error| CliError::Logging(error.to_string()))
}
