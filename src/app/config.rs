// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::convert::TryFrom;
use std::net::IpAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ArgMatches;

use crate::app::output::json::JsonOptions;
use crate::app::output::summary::SummaryOptions;
use crate::app::output::{OutputConfig, OutputType};
use crate::lookup::TxtLookupOpts;

#[derive(Debug)]
pub struct AppConfig {
    pub quiet: bool,
    pub nameservers: Vec<IpAddr>,
    pub timeout: Duration,
    pub output: OutputType,
    pub output_config: OutputConfig,
}

impl AppConfig {
    pub fn lookup_opts(&self) -> TxtLookupOpts {
        TxtLookupOpts {
            nameservers: self.nameservers.clone(),
            timeout: self.timeout,
        }
    }
}

impl TryFrom<&ArgMatches> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(args: &ArgMatches) -> std::result::Result<Self, Self::Error> {
        let output = args
            .get_one::<String>("output")
            .context("no output format specified")
            .and_then(|x| OutputType::try_from(x.as_str()).context("failed to parse output type"))?;
        let config = AppConfig {
            quiet: args.get_flag("quiet"),
            nameservers: args
                .get_many::<IpAddr>("nameservers")
                .map(|xs| xs.copied().collect())
                .unwrap_or_default(),
            timeout: args
                .get_one::<u64>("timeout")
                .map(|x| Duration::from_secs(*x))
                .context("no timeout specified")?,
            output_config: output_config(output, args)?,
            output,
        };

        Ok(config)
    }
}

fn output_config(output_type: OutputType, args: &ArgMatches) -> Result<OutputConfig> {
    let options: Vec<&str> = args
        .get_many::<String>("output-options")
        .map(|xs| xs.map(String::as_str).collect())
        .unwrap_or_default();
    parse_output_options(output_type, options)
}

fn parse_output_options(output_type: OutputType, options: Vec<&str>) -> Result<OutputConfig> {
    match output_type {
        OutputType::Json => {
            let options = JsonOptions::try_from(options).context("failed to parse json options")?;
            Ok(OutputConfig::json(options))
        }
        OutputType::Summary => {
            let options = SummaryOptions::try_from(options).context("failed to parse summary options")?;
            Ok(OutputConfig::summary(options))
        }
    }
}
