// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::convert::TryInto;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::ArgMatches;
use tracing::info;

use crate::app::modules::Environment;
use crate::app::{output, AppConfig, ExitStatus};
use crate::check::check_domain;
use crate::lookup::TxtLookup;

pub mod config;

use config::CheckConfig;

pub async fn run(args: &ArgMatches, app_config: &AppConfig) -> Result<ExitStatus> {
    info!("check module selected.");
    let args = args.subcommand_matches("check").context("missing check arguments")?;
    let config: CheckConfig = args.try_into()?;
    check(&Environment::new(app_config, &config)).await
}

async fn check(env: &Environment<'_, CheckConfig>) -> Result<ExitStatus> {
    let config = env.mod_config;
    let lookup = TxtLookup::new(env.app_config.lookup_opts()).context("failed to create resolver")?;

    env.console.print_lookup_options(env.app_config);
    env.console.print_caption(format!(
        "Checking DMARC, SPF, and {} DKIM records of {}.",
        config.dkim_selectors.len(),
        config.domain_name
    ));

    info!("Running lookups for domain.");
    let start_time = Instant::now();
    let mut domain_check = check_domain(&lookup, &config.domain_name, &config.dkim_selectors).await;
    let total_run_time = Instant::now() - start_time;
    info!("Finished lookups.");
    env.console.print_run_time(total_run_time);

    if !config.recommendations {
        domain_check = domain_check.without_recommendations();
    }
    output::output(&env.app_config.output_config, &domain_check)?;

    if domain_check.has_errors() {
        env.console.print_failed("Found errors.");
        return Ok(ExitStatus::CheckFailed);
    }
    env.console.print_finished();

    Ok(ExitStatus::Ok)
}
