// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use tracing::debug;

use crate::lints::ValidationIssue;
use crate::records::dmarc::{report_addresses, Alignment, DmarcPolicy, DEFAULT_PERCENTAGE};
use crate::records::tokenizer::{tokenize, Grammar, Token};

static KNOWN_TAGS: &[&str] = &["v", "p", "sp", "rua", "ruf", "pct", "adkim", "aspf", "fo", "ri"];

/// Lints a DMARC record; cf. RFC 7489, section 6.3.
pub fn validate_dmarc_record(raw: &str) -> Vec<ValidationIssue> {
    let mut results = Vec::new();
    let tokens = tokenize(raw, Grammar::Semicolon);

    if tokens.is_empty() {
        results.push(ValidationIssue::error("DMARC record is empty"));
        return results;
    }

    check_version(&tokens, &mut results);
    check_policies(&tokens, &mut results);
    check_percentage(&tokens, &mut results);
    check_report_uris(&tokens, &mut results);
    check_enforcement(&tokens, &mut results);
    check_alignments(&tokens, &mut results);
    check_report_interval(&tokens, &mut results);
    check_failure_options(&tokens, &mut results);
    check_duplicate_and_unknown_tags(&tokens, &mut results);
    debug!("Found {} issues in DMARC record.", results.len());

    results
}

fn first<'a>(tokens: &'a [Token], key: &str) -> Option<&'a str> {
    tokens
        .iter()
        .find(|x| x.key().eq_ignore_ascii_case(key))
        .map(Token::value)
}

fn check_version(tokens: &[Token], results: &mut Vec<ValidationIssue>) {
    match first(tokens, "v") {
        None => results.push(ValidationIssue::error("Missing required tag v=DMARC1").with_field("v")),
        Some("DMARC1") => {}
        Some(version) => results.push(
            ValidationIssue::error(format!("Invalid version '{}'; must be DMARC1", version)).with_field("v"),
        ),
    }
    if tokens.first().map(|x| !x.key().eq_ignore_ascii_case("v")).unwrap_or(false) && first(tokens, "v").is_some() {
        results.push(
            ValidationIssue::warning("The v tag must come first or the record is ignored; cf. RFC 7489, section 6.4")
                .with_field("v"),
        );
    }
}

fn check_policies(tokens: &[Token], results: &mut Vec<ValidationIssue>) {
    match first(tokens, "p") {
        None => results.push(ValidationIssue::error("Missing required tag p").with_field("p")),
        Some(p) if DmarcPolicy::from_value(p).is_none() => results.push(
            ValidationIssue::error(format!("Invalid policy '{}'; must be none, quarantine, or reject", p))
                .with_field("p"),
        ),
        Some(_) => {}
    }
    if let Some(sp) = first(tokens, "sp").filter(|x| DmarcPolicy::from_value(x).is_none()) {
        results.push(
            ValidationIssue::warning(format!(
                "Invalid subdomain policy '{}'; receivers fall back to the domain policy",
                sp
            ))
            .with_field("sp"),
        );
    }
}

fn check_percentage(tokens: &[Token], results: &mut Vec<ValidationIssue>) {
    if let Some(pct) = first(tokens, "pct") {
        match pct.parse::<u8>() {
            Ok(pct) if pct <= 100 => {
                if pct < 100 {
                    results.push(
                        ValidationIssue::info(format!("Policy is applied to only {}% of failing mail", pct))
                            .with_field("pct"),
                    )
                }
            }
            _ => results.push(
                ValidationIssue::error(format!("Invalid percentage '{}'; must be an integer from 0 to 100", pct))
                    .with_field("pct"),
            ),
        }
    }
}

fn check_report_uris(tokens: &[Token], results: &mut Vec<ValidationIssue>) {
    match first(tokens, "rua") {
        None => results.push(
            ValidationIssue::info("No rua tag; no aggregate reports will be received").with_field("rua"),
        ),
        Some(rua) if report_addresses(rua).is_empty() => results.push(
            ValidationIssue::warning("The rua tag does not contain any report address").with_field("rua"),
        ),
        Some(_) => {}
    }

    for key in &["rua", "ruf"] {
        let uris = first(tokens, key).unwrap_or_default();
        for uri in uris.split(',').map(str::trim).filter(|x| !x.is_empty()) {
            let is_mailto = uri.get(..7).map(|x| x.eq_ignore_ascii_case("mailto:")).unwrap_or(false);
            if !is_mailto {
                results.push(
                    ValidationIssue::warning(format!("Report URI '{}' does not use the mailto: scheme", uri))
                        .with_field(*key),
                );
            } else if !uri[7..].contains('@') {
                results.push(
                    ValidationIssue::warning(format!("Report URI '{}' is not a valid email address", uri))
                        .with_field(*key),
                );
            }
        }
    }
}

fn check_enforcement(tokens: &[Token], results: &mut Vec<ValidationIssue>) {
    let policy = match first(tokens, "p").and_then(DmarcPolicy::from_value) {
        Some(policy) => policy,
        None => return,
    };
    let has_rua = first(tokens, "rua").map(|x| !report_addresses(x).is_empty()).unwrap_or(false);
    let pct = first(tokens, "pct")
        .and_then(|x| x.parse::<u8>().ok())
        .filter(|x| *x <= 100)
        .unwrap_or(DEFAULT_PERCENTAGE);

    match policy {
        DmarcPolicy::None if !has_rua => results.push(
            ValidationIssue::warning(
                "Policy none without rua offers minimal protection: nothing is enforced and nothing is reported",
            )
            .with_field("p"),
        ),
        DmarcPolicy::None => results.push(
            ValidationIssue::info("Monitoring mode only; failing mail is still delivered").with_field("p"),
        ),
        _ if pct == 100 && !has_rua => results.push(
            ValidationIssue::warning(format!(
                "Policy {} is enforced on all mail without aggregate reports; broken senders go unnoticed",
                policy
            ))
            .with_field("p"),
        ),
        _ => {}
    }
}

fn check_alignments(tokens: &[Token], results: &mut Vec<ValidationIssue>) {
    for key in &["adkim", "aspf"] {
        if let Some(value) = first(tokens, key).filter(|x| Alignment::from_value(x).is_none()) {
            results.push(
                ValidationIssue::warning(format!("Invalid alignment mode '{}'; must be r or s", value))
                    .with_field(*key),
            );
        }
    }
}

fn check_report_interval(tokens: &[Token], results: &mut Vec<ValidationIssue>) {
    if let Some(ri) = first(tokens, "ri").filter(|x| x.parse::<u32>().is_err()) {
        results.push(
            ValidationIssue::warning(format!("Invalid report interval '{}'; must be a number of seconds", ri))
                .with_field("ri"),
        );
    }
}

fn check_failure_options(tokens: &[Token], results: &mut Vec<ValidationIssue>) {
    let fo = match first(tokens, "fo") {
        Some(fo) => fo,
        None => return,
    };
    for option in fo.split(':').map(str::trim) {
        if !matches!(option, "0" | "1" | "d" | "s") {
            results.push(
                ValidationIssue::warning(format!(
                    "Invalid failure reporting option '{}'; must be 0, 1, d, or s",
                    option
                ))
                .with_field("fo"),
            );
        }
    }
    if first(tokens, "ruf").is_none() {
        results.push(ValidationIssue::info("The fo tag has no effect without a ruf tag").with_field("fo"));
    }
}

fn check_duplicate_and_unknown_tags(tokens: &[Token], results: &mut Vec<ValidationIssue>) {
    let mut seen: Vec<String> = Vec::new();
    for token in tokens {
        let key = token.key().to_lowercase();
        if seen.contains(&key) {
            if seen.iter().filter(|x| **x == key).count() == 1 {
                results.push(
                    ValidationIssue::warning(format!("Tag {} is set more than once; only the first one is used", key))
                        .with_field(key.clone()),
                );
            }
        } else if !KNOWN_TAGS.contains(&key.as_str()) {
            results.push(
                ValidationIssue::info(format!("Unknown tag '{}' is ignored", token.key())).with_field(token.key()),
            );
        }
        seen.push(key);
    }
}
