// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::convert::TryInto;

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::Serialize;
use tracing::info;

use crate::app::modules::Environment;
use crate::app::{output, AppConfig, ExitStatus};
use crate::recommendations::get_recommendations;
use crate::records::RecordKind;

pub mod config;

use config::RecommendConfig;

#[derive(Debug, Serialize)]
pub struct Advice {
    kind: RecordKind,
    record: Option<String>,
    recommendations: Vec<String>,
}

impl Advice {
    pub fn new(kind: RecordKind, record: Option<String>) -> Advice {
        let recommendations = get_recommendations(kind, record.as_deref());
        Advice {
            kind,
            record,
            recommendations,
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn record(&self) -> Option<&str> {
        self.record.as_deref()
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }
}

pub fn run(args: &ArgMatches, app_config: &AppConfig) -> Result<ExitStatus> {
    info!("recommend module selected.");
    let args = args
        .subcommand_matches("recommend")
        .context("missing recommend arguments")?;
    let config: RecommendConfig = args.try_into()?;
    recommend(&Environment::new(app_config, &config))
}

fn recommend(env: &Environment<RecommendConfig>) -> Result<ExitStatus> {
    let config = env.mod_config;
    let advice = Advice::new(config.kind, config.record.clone());

    output::output(&env.app_config.output_config, &advice)?;
    env.console.print_finished();

    Ok(ExitStatus::Ok)
}
