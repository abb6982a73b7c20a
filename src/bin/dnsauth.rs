// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::convert::TryFrom;
use std::env;

use clap::error::ErrorKind;
use clap::ArgMatches;
use tracing::{debug, error, info};

use dnsauth::app::console::{Console, ConsoleOpts};
use dnsauth::app::logging::Logging;
use dnsauth::app::output::styles;
use dnsauth::app::{self, cli_parser, AppConfig, ExitStatus};

#[tokio::main]
async fn main() {
    let args = match cli_parser::create_parser().try_get_matches() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            std::process::exit(ExitStatus::Ok as i32);
        }
        Err(err) => {
            let _ = err.print();
            std::process::exit(ExitStatus::CliParsingFailed as i32);
        }
    };

    setup_terminal(&args);

    if let Err(err) = start_logging(&args) {
        eprintln!("Failed to start logging: {:#}", err);
        std::process::exit(ExitStatus::UnrecoverableError as i32);
    }
    info!("Starting dnsauth {}.", env!("CARGO_PKG_VERSION"));

    let exit_status = match AppConfig::try_from(&args) {
        Ok(app_config) => run(&args, &app_config).await,
        Err(err) => {
            Console::new(ConsoleOpts::default()).error(format!("Failed to parse configuration: {:#}", err));
            ExitStatus::ConfigParsingFailed
        }
    };

    debug!("Exiting with exit status {:?}.", exit_status);
    std::process::exit(exit_status as i32);
}

fn setup_terminal(args: &ArgMatches) {
    if args.get_flag("no-color") {
        styles::no_color_mode();
    }
    if args.get_flag("ascii") {
        styles::ascii_mode();
    }
}

fn start_logging(args: &ArgMatches) -> anyhow::Result<()> {
    let color = !args.get_flag("no-color");
    Logging::new(
        args.get_count("v"),
        env::var_os("RUST_LOG"),
        color,
        args.get_flag("debug"),
    )
    .start()
}

async fn run(args: &ArgMatches, app_config: &AppConfig) -> ExitStatus {
    match app::run(args, app_config).await {
        Ok(exit_status) => exit_status,
        Err(err) => {
            error!("Module failed: {:#}", err);
            Console::new(app_config.into()).error(format!("Error: {:#}", err));
            ExitStatus::Failed
        }
    }
}
