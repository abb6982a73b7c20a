// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::convert::TryFrom;
use std::str::FromStr;

use anyhow::Context;
use clap::ArgMatches;

use crate::records::RecordKind;

pub struct ParseConfig {
    pub kind: RecordKind,
    pub record: String,
    pub lints: bool,
    pub recommendations: bool,
}

impl TryFrom<&ArgMatches> for ParseConfig {
    type Error = anyhow::Error;

    fn try_from(args: &ArgMatches) -> std::result::Result<Self, Self::Error> {
        let kind = args.get_one::<String>("kind").context("no record kind specified")?;
        let config = ParseConfig {
            kind: RecordKind::from_str(kind).context("failed to parse record kind")?,
            record: args
                .get_one::<String>("record")
                .context("no record to parse specified")?
                .to_string(),
            lints: !args.get_flag("no-lints"),
            recommendations: !args.get_flag("no-recommendations"),
        };

        Ok(config)
    }
}
