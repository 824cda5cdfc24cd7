use std::process::ExitCode;

use clap::error::ErrorKind;
use tracing::{error, info};
use xero_map_gen::{ConfigError, ConfigLoader, LogLevel, SchemaError, logging};

/// Exit status for rejected arguments or configuration.
const USAGE_EXIT: u8 = 2;

fn main() -> Result<ExitCode, SchemaError> {
    let logging = logging::init(LogLevel::Warning);
    // A schema error is a bug in the tool: let it end the process with its
    // full debug output.
    let loader = ConfigLoader::builder().build()?;

    let settings = match loader
        .load(std::env::args_os().skip(1), &logging)
        .and_then(|config| config.settings())
    {
        Ok(settings) => settings,
        Err(ConfigError::Argument(err))
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
        {
            err.exit()
        }
        Err(err) => {
            error!("{}", summary(&err));
            if err.is_usage_error() {
                eprintln!("{}", loader.usage());
            }
            return Ok(ExitCode::from(USAGE_EXIT));
        }
    };

    logging.set_level(settings.log.stream_level());
    info!(
        dump = %settings.base.dump_file().display(),
        log = %settings.log.log_file().display(),
        limit = ?settings.base.contact_limit,
        "configuration resolved"
    );
    Ok(ExitCode::SUCCESS)
}

/// clap renders its own usage and hints; only its first line is the message.
fn summary(err: &ConfigError) -> String {
    match err {
        ConfigError::Argument(clap_err) => {
            let rendered = clap_err.to_string();
            let first = rendered.lines().next().unwrap_or_default();
            first.trim_start_matches("error: ").to_string()
        }
        other => other.to_string(),
    }
}
