// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::convert::TryFrom;

use anyhow::Context;
use clap::ArgMatches;

pub struct CheckConfig {
    pub domain_name: String,
    pub dkim_selectors: Vec<String>,
    pub recommendations: bool,
}

impl TryFrom<&ArgMatches> for CheckConfig {
    type Error = anyhow::Error;

    fn try_from(args: &ArgMatches) -> std::result::Result<Self, Self::Error> {
        let config = CheckConfig {
            domain_name: args
                .get_one::<String>("domain name")
                .context("no domain name to check specified")?
                .to_string(),
            dkim_selectors: args
                .get_many::<String>("dkim-selectors")
                .map(|xs| xs.map(ToString::to_string).collect())
                .unwrap_or_default(),
            recommendations: !args.get_flag("no-recommendations"),
        };

        Ok(config)
    }
}
