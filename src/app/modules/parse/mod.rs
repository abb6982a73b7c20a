// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::convert::TryInto;

use anyhow::{Context, Result};
use clap::ArgMatches;
use tracing::info;

use crate::app::modules::Environment;
use crate::app::{output, AppConfig, ExitStatus};
use crate::check::RecordCheck;
use crate::lints::Issues;

pub mod config;

use config::ParseConfig;

pub fn run(args: &ArgMatches, app_config: &AppConfig) -> Result<ExitStatus> {
    info!("parse module selected.");
    let args = args.subcommand_matches("parse").context("missing parse arguments")?;
    let config: ParseConfig = args.try_into()?;
    parse(&Environment::new(app_config, &config))
}

fn parse(env: &Environment<ParseConfig>) -> Result<ExitStatus> {
    let config = env.mod_config;
    let mut check = RecordCheck::new(config.kind, None, &config.record);
    if !config.lints {
        check = check.without_issues();
    }
    if !config.recommendations {
        check = check.without_recommendations();
    }

    output::output(&env.app_config.output_config, &check)?;

    if check.issues().has_errors() {
        env.console.print_failed(format!("{} record has errors.", config.kind));
        return Ok(ExitStatus::CheckFailed);
    }
    env.console.print_finished();

    Ok(ExitStatus::Ok)
}
