// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use anyhow::Result;
use clap::ArgMatches;

pub mod cli_parser;
pub mod config;
pub mod console;
pub mod logging;
pub mod modules;
pub mod output;

pub use config::AppConfig;

/// `ExitStatus` represents the exit states that will be return to the OS after termination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// All fine.
    Ok = 0,
    /// CLI argument parsing failed.
    CliParsingFailed = 1,
    /// Configuration could not be built from the CLI arguments.
    ConfigParsingFailed = 2,
    /// An unrecoverable error occurred. This is worst case and should not happen.
    UnrecoverableError = 3,
    /// A module failed to properly execute.
    Failed = 10,
    /// A record has errors.
    CheckFailed = 11,
}

/// Dispatches to the module of the selected subcommand.
pub async fn run(args: &ArgMatches, app_config: &AppConfig) -> Result<ExitStatus> {
    match args.subcommand_name() {
        Some("parse") => modules::parse::run(args, app_config),
        Some("check") => modules::check::run(args, app_config).await,
        Some("recommend") => modules::recommend::run(args, app_config),
        _ => {
            cli_parser::create_parser().print_help()?;
            Ok(ExitStatus::CliParsingFailed)
        }
    }
}
