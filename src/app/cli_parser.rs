// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! This file is used by the build script. Therefore all functions generating the app command line parser must be
//! included here and may only depend on clap.

use std::net::IpAddr;

use clap::builder::PossibleValuesParser;
use clap::{value_parser, Arg, ArgAction, Command};

pub static SUPPORTED_RECORD_KINDS: &[&str] = &["dmarc", "spf", "dkim"];

pub static SUPPORTED_OUTPUT_FORMATS: &[&str] = &["json", "summary"];

pub fn create_parser() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .disable_help_subcommand(true)
        .infer_subcommands(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("nameservers")
                .short('s')
                .long("nameserver")
                .value_name("IP ADDR")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .value_parser(value_parser!(IpAddr))
                .global(true)
                .help("Uses nameservers for lookups instead of the system's nameservers"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("TIMEOUT")
                .default_value("5")
                .value_parser(value_parser!(u64))
                .global(true)
                .help("Sets timeout in seconds for responses"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FORMAT")
                .default_value("summary")
                .value_parser(PossibleValuesParser::new(SUPPORTED_OUTPUT_FORMATS.iter().copied()))
                .global(true)
                .help("Sets the output format for result presentation"),
        )
        .arg(
            Arg::new("output-options")
                .long("output-options")
                .value_name("OPTIONS")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .global(true)
                .help("Sets output options; json: pretty, summary: condensed"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Does not print anything but results"),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Disables colorful output"),
        )
        .arg(
            Arg::new("ascii")
                .long("ascii")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Uses only ASCII compatible characters for output"),
        )
        .arg(
            Arg::new("v")
                .short('v')
                .action(ArgAction::Count)
                .global(true)
                .help("Sets the level of verbosity"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Uses debug formatting for logging -- much more verbose"),
        )
        .subcommands(subcommands())
}

fn subcommands() -> Vec<Command> {
    vec![parse_subcommand(), check_subcommand(), recommend_subcommand()]
}

fn record_kind_arg() -> Arg {
    Arg::new("kind")
        .index(1)
        .required(true)
        .value_name("KIND")
        .value_parser(PossibleValuesParser::new(SUPPORTED_RECORD_KINDS.iter().copied()))
        .help("Kind of record")
}

fn parse_subcommand() -> Command {
    Command::new("parse")
        .about("Parses a DMARC, SPF, or DKIM record and explains its tags")
        .arg(record_kind_arg())
        .arg(
            Arg::new("record")
                .index(2)
                .required(true)
                .value_name("RECORD")
                .help("Record as published in DNS, e.g. 'v=DMARC1; p=reject'"),
        )
        .arg(
            Arg::new("no-lints")
                .long("no-lints")
                .action(ArgAction::SetTrue)
                .help("Does not lint the record"),
        )
        .arg(
            Arg::new("no-recommendations")
                .long("no-recommendations")
                .action(ArgAction::SetTrue)
                .help("Does not recommend next steps"),
        )
}

fn check_subcommand() -> Command {
    Command::new("check")
        .about("Looks up and checks the DMARC, SPF, and DKIM records of a domain")
        .arg(
            Arg::new("domain name")
                .index(1)
                .required(true)
                .value_name("DOMAIN")
                .help("Domain name to check"),
        )
        .arg(
            Arg::new("dkim-selectors")
                .short('d')
                .long("dkim-selector")
                .value_name("SELECTOR")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .help("Checks DKIM keys published for selectors"),
        )
        .arg(
            Arg::new("no-recommendations")
                .long("no-recommendations")
                .action(ArgAction::SetTrue)
                .help("Does not recommend next steps"),
        )
}

fn recommend_subcommand() -> Command {
    Command::new("recommend")
        .about("Recommends how to set up or harden a DMARC, SPF, or DKIM record")
        .arg(record_kind_arg())
        .arg(
            Arg::new("record")
                .index(2)
                .value_name("RECORD")
                .help("Current record; if omitted, setup guidance is given"),
        )
}

#[cfg(test)]
mod tests {
    use spectral::prelude::*;

    use super::*;

    #[test]
    fn parser_is_consistent() {
        create_parser().debug_assert();
    }

    #[test]
    fn global_args_after_subcommand() {
        let args = create_parser()
            .try_get_matches_from(vec!["dnsauth", "check", "example.com", "-d", "s1,s2", "-o", "json", "-vv"])
            .unwrap();

        assert_that(&args.get_one::<String>("output").map(String::as_str)).is_equal_to(Some("json"));
        assert_that(&args.get_count("v")).is_equal_to(2);
        let (name, sub_args) = args.subcommand().unwrap();
        assert_that(&name).is_equal_to("check");
        let selectors: Vec<&String> = sub_args.get_many::<String>("dkim-selectors").unwrap().collect();
        assert_that(&selectors).has_length(2);
    }

    #[test]
    fn invalid_record_kind() {
        let res = create_parser().try_get_matches_from(vec!["dnsauth", "parse", "mx", "v=spf1 -all"]);

        assert_that(&res.is_err()).is_true();
    }
}
