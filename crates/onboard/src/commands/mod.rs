//! Command dispatch: bridges CLI args -> core pipeline -> output formatting.

pub mod config_cmd;
pub mod reconcile;

use onboard_config::{Config, load_config, load_config_from, to_engine_config};
use onboard_core::EngineConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Normalize(args) => reconcile::normalize(&args, global),
        Command::Diff(args) => reconcile::diff_cmd(&args, global),
        Command::Plan(args) => reconcile::plan(&args, global),
        Command::Config(args) => config_cmd::handle(&args, global),
    }
}

/// The config file named by `--config`, or the platform default.
pub(crate) fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let cfg = match &global.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(cfg)
}

pub(crate) fn engine_config(global: &GlobalOpts) -> Result<EngineConfig, CliError> {
    Ok(to_engine_config(&load(global)?)?)
}
