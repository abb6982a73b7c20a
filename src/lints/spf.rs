// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::str::FromStr;

use ipnetwork::{Ipv4Network, Ipv6Network};
use tracing::debug;

use crate::lints::ValidationIssue;
use crate::records::spf::{Mechanism, Modifier, Qualifier, SpfTerm};
use crate::records::tokenizer::{tokenize, Grammar};

/// Max. number of terms causing DNS lookups; cf. RFC 7208, section 4.6.4
pub const MAX_DNS_LOOKUPS: usize = 10;

/// Lints an SPF record. Nested includes are not resolved; only the terms of this record are counted.
pub fn validate_spf_record(raw: &str) -> Vec<ValidationIssue> {
    let mut results = Vec::new();
    let tokens = tokenize(raw, Grammar::Whitespace);

    if tokens.is_empty() {
        results.push(ValidationIssue::error("SPF record is empty"));
        return results;
    }

    let mut terms = Vec::new();
    for (pos, token) in tokens.iter().enumerate() {
        match SpfTerm::from_str(token.key()) {
            Ok(term) => terms.push((pos, term)),
            Err(_) => results.push(
                ValidationIssue::warning(format!(
                    "Unknown term '{}'; receivers may fail to evaluate the record",
                    token.key()
                ))
                .with_field(token.key()),
            ),
        }
    }

    check_version(&terms, &mut results);
    check_num_of_dns_lookups(&terms, &mut results);
    check_all(&terms, &mut results);
    check_redirects(&terms, &mut results);
    check_mechanisms(&terms, &mut results);
    debug!("Found {} issues in SPF record.", results.len());

    results
}

type Terms<'a> = [(usize, SpfTerm<'a>)];

fn check_version(terms: &Terms, results: &mut Vec<ValidationIssue>) {
    match terms.first() {
        Some((0, SpfTerm::Version(version))) if version.eq_ignore_ascii_case("spf1") => {}
        Some((0, SpfTerm::Version(version))) => results.push(
            ValidationIssue::error(format!("Unsupported version '{}'; must be spf1", version)).with_field("v"),
        ),
        _ => results.push(ValidationIssue::error("Record must start with v=spf1").with_field("v")),
    }
    for (pos, term) in terms {
        if *pos > 0 && matches!(term, SpfTerm::Version(_)) {
            results.push(ValidationIssue::warning("Version term in the middle of the record").with_field("v"));
        }
    }
}

fn check_num_of_dns_lookups(terms: &Terms, results: &mut Vec<ValidationIssue>) {
    let lookups = terms.iter().filter(|(_, x)| x.is_dns_lookup()).count();
    if lookups > MAX_DNS_LOOKUPS {
        results.push(ValidationIssue::error(format!(
            "Record requires {} DNS lookups, but at most {} are allowed; cf. RFC 7208, section 4.6.4",
            lookups, MAX_DNS_LOOKUPS
        )));
    }
}

fn check_all(terms: &Terms, results: &mut Vec<ValidationIssue>) {
    let alls: Vec<(usize, Qualifier)> = terms
        .iter()
        .filter_map(|(pos, x)| match x {
            SpfTerm::Mechanism(qualifier, Mechanism::All) => Some((*pos, *qualifier)),
            _ => None,
        })
        .collect();
    let has_redirect = terms
        .iter()
        .any(|(_, x)| matches!(x, SpfTerm::Modifier(Modifier::Redirect(_))));

    let (first_all, last_qualifier) = match (alls.first(), alls.last()) {
        (Some((first, _)), Some((_, last))) => (*first, *last),
        _ => {
            if !has_redirect {
                results.push(
                    ValidationIssue::warning("Neither all nor redirect; unmatched senders get a neutral result")
                        .with_field("all"),
                );
            }
            return;
        }
    };

    match last_qualifier {
        Qualifier::Pass => results.push(
            ValidationIssue::error("+all authorizes every server on the internet to send mail for this domain")
                .with_field("all"),
        ),
        Qualifier::Neutral => results.push(
            ValidationIssue::warning("?all does not enforce anything; unauthorized mail passes as neutral")
                .with_field("all"),
        ),
        Qualifier::Softfail => results.push(
            ValidationIssue::info("~all only marks unauthorized mail as suspicious; -all rejects it")
                .with_field("all"),
        ),
        Qualifier::Fail => {}
    }

    if alls.len() > 1 {
        results.push(
            ValidationIssue::warning(format!("Found {} all mechanisms; a record should have one", alls.len()))
                .with_field("all"),
        );
    }
    let ignored = terms
        .iter()
        .filter(|(pos, x)| *pos > first_all && matches!(x, SpfTerm::Mechanism(_, m) if *m != Mechanism::All))
        .count();
    if ignored > 0 {
        results.push(
            ValidationIssue::warning(format!("{} mechanisms after all are never evaluated", ignored))
                .with_field("all"),
        );
    }
    if has_redirect {
        results.push(
            ValidationIssue::info("The redirect modifier is ignored because the record contains all")
                .with_field("redirect"),
        );
    }
}

fn check_redirects(terms: &Terms, results: &mut Vec<ValidationIssue>) {
    let redirects = terms
        .iter()
        .filter(|(_, x)| matches!(x, SpfTerm::Modifier(Modifier::Redirect(_))))
        .count();
    if redirects > 1 {
        results.push(
            ValidationIssue::error("The redirect modifier must not appear more than once; cf. RFC 7208, section 6")
                .with_field("redirect"),
        );
    }
}

fn check_mechanisms(terms: &Terms, results: &mut Vec<ValidationIssue>) {
    for (_, term) in terms {
        match term {
            SpfTerm::Mechanism(_, Mechanism::PTR(_)) => results.push(
                ValidationIssue::warning("The ptr mechanism is deprecated; cf. RFC 7208, section 5.5")
                    .with_field("ptr"),
            ),
            SpfTerm::Mechanism(_, Mechanism::IPv4(network)) if Ipv4Network::from_str(network).is_err() => results.push(
                ValidationIssue::error(format!("Invalid IPv4 network '{}'", network)).with_field("ip4"),
            ),
            SpfTerm::Mechanism(_, Mechanism::IPv6(network)) if Ipv6Network::from_str(network).is_err() => results.push(
                ValidationIssue::error(format!("Invalid IPv6 network '{}'", network)).with_field("ip6"),
            ),
            _ => {}
        }
    }
}
