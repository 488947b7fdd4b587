//! Config subcommand handlers.

use onboard_config::{Config, config_path};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::commands::load;
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

/// Copy of `cfg` safe to print.
fn redacted(cfg: &Config) -> Config {
    let mut shown = cfg.clone();
    if shown.device.password.is_some() {
        shown.device.password = Some(REDACTED.into());
    }
    shown
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let path = global.config.clone().unwrap_or_else(config_path);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }
        ConfigCommand::Show => {
            let shown = redacted(&load(global)?);
            let out = match global.output {
                OutputFormat::Plain => {
                    toml::to_string_pretty(&shown).map_err(|e| CliError::Render(e.to_string()))?
                }
                OutputFormat::Json => output::render_json(&shown, false)?,
                OutputFormat::JsonCompact => output::render_json(&shown, true)?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
