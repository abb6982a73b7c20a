// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! DMARC policy records, cf. RFC 7489, section 6.3.

use std::fmt;

use serde::Serialize;
use tracing::{debug, trace};

use crate::records::tokenizer::{tokenize, Grammar, Token};
use crate::records::{describe, ParsedTag, TagStatus};

pub const DEFAULT_PERCENTAGE: u8 = 100;
pub const DEFAULT_REPORT_INTERVAL: u32 = 86400;
pub const DEFAULT_FAILURE_OPTIONS: &str = "0";

static POLICIES: &[(&str, &str)] = &[
    ("none", "No action; failing mail is only reported (monitoring mode)"),
    ("quarantine", "Failing mail is treated as suspicious, e.g., delivered to spam"),
    ("reject", "Failing mail is rejected"),
];

static DKIM_ALIGNMENTS: &[(&str, &str)] = &[
    ("r", "Relaxed DKIM alignment; the signing domain may be a subdomain of the From domain"),
    ("s", "Strict DKIM alignment; the signing domain must match the From domain exactly"),
];

static SPF_ALIGNMENTS: &[(&str, &str)] = &[
    ("r", "Relaxed SPF alignment; the envelope domain may be a subdomain of the From domain"),
    ("s", "Strict SPF alignment; the envelope domain must match the From domain exactly"),
];

static FAILURE_OPTIONS: &[(&str, &str)] = &[
    ("0", "Failure report if all authentication mechanisms fail"),
    ("1", "Failure report if any authentication mechanism fails"),
    ("d", "Failure report if DKIM signature verification fails"),
    ("s", "Failure report if SPF evaluation fails"),
];

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DmarcPolicy {
    None,
    Quarantine,
    Reject,
}

impl DmarcPolicy {
    pub fn from_value(value: &str) -> Option<DmarcPolicy> {
        match value.to_lowercase().as_str() {
            "none" => Some(DmarcPolicy::None),
            "quarantine" => Some(DmarcPolicy::Quarantine),
            "reject" => Some(DmarcPolicy::Reject),
            _ => None,
        }
    }

    pub fn is_enforcing(&self) -> bool {
        !matches!(self, DmarcPolicy::None)
    }
}

impl fmt::Display for DmarcPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let str = match self {
            DmarcPolicy::None => "none",
            DmarcPolicy::Quarantine => "quarantine",
            DmarcPolicy::Reject => "reject",
        };
        f.write_str(str)
    }
}

#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy, Serialize)]
pub enum Alignment {
    #[default]
    #[serde(rename = "r")]
    Relaxed,
    #[serde(rename = "s")]
    Strict,
}

impl Alignment {
    pub fn from_value(value: &str) -> Option<Alignment> {
        match value {
            "r" | "R" => Some(Alignment::Relaxed),
            "s" | "S" => Some(Alignment::Strict),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct DmarcRecord {
    version: Option<String>,
    policy: Option<DmarcPolicy>,
    subdomain_policy: Option<DmarcPolicy>,
    percentage: u8,
    rua_emails: Vec<String>,
    ruf_emails: Vec<String>,
    dkim_alignment: Alignment,
    spf_alignment: Alignment,
    report_interval: u32,
    failure_options: String,
    tags: Vec<ParsedTag>,
}

impl Default for DmarcRecord {
    fn default() -> Self {
        DmarcRecord {
            version: None,
            policy: None,
            subdomain_policy: None,
            percentage: DEFAULT_PERCENTAGE,
            rua_emails: Vec::new(),
            ruf_emails: Vec::new(),
            dkim_alignment: Alignment::default(),
            spf_alignment: Alignment::default(),
            report_interval: DEFAULT_REPORT_INTERVAL,
            failure_options: DEFAULT_FAILURE_OPTIONS.to_string(),
            tags: Vec::new(),
        }
    }
}

impl DmarcRecord {
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn policy(&self) -> Option<DmarcPolicy> {
        self.policy
    }

    /// Falls back to the domain policy if not set explicitly
    pub fn subdomain_policy(&self) -> Option<DmarcPolicy> {
        self.subdomain_policy.or(self.policy)
    }

    pub fn has_subdomain_policy(&self) -> bool {
        self.subdomain_policy.is_some()
    }

    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    pub fn rua_emails(&self) -> &[String] {
        &self.rua_emails
    }

    pub fn ruf_emails(&self) -> &[String] {
        &self.ruf_emails
    }

    pub fn dkim_alignment(&self) -> Alignment {
        self.dkim_alignment
    }

    pub fn spf_alignment(&self) -> Alignment {
        self.spf_alignment
    }

    /// Requested interval between aggregate reports in seconds
    pub fn report_interval(&self) -> u32 {
        self.report_interval
    }

    pub fn failure_options(&self) -> &str {
        &self.failure_options
    }

    pub fn tags(&self) -> &[ParsedTag] {
        &self.tags
    }
}

/// Parses a DMARC TXT record value, already stripped of surrounding quotes.
pub fn parse_dmarc_record(raw: &str) -> DmarcRecord {
    let tokens = tokenize(raw, Grammar::Semicolon);
    let mut record = DmarcRecord::default();
    let mut seen: Vec<String> = Vec::new();

    for token in &tokens {
        let key = token.key().to_lowercase();
        let value = token.value();
        trace!("Parsing DMARC tag '{}'.", key);

        record.tags.push(annotate(&key, token));
        // The first occurrence of a tag defines the policy
        if seen.contains(&key) {
            continue;
        }
        apply(&mut record, &key, value);
        seen.push(key);
    }
    debug!("Parsed DMARC record with {} tags.", record.tags.len());

    record
}

fn apply(record: &mut DmarcRecord, key: &str, value: &str) {
    match key {
        "v" => record.version = Some(value.to_string()),
        "p" => record.policy = DmarcPolicy::from_value(value),
        "sp" => record.subdomain_policy = DmarcPolicy::from_value(value),
        "pct" => {
            if let Some(pct) = value.parse::<u8>().ok().filter(|x| *x <= 100) {
                record.percentage = pct
            }
        }
        "rua" => record.rua_emails = report_addresses(value),
        "ruf" => record.ruf_emails = report_addresses(value),
        "adkim" => record.dkim_alignment = Alignment::from_value(value).unwrap_or_default(),
        "aspf" => record.spf_alignment = Alignment::from_value(value).unwrap_or_default(),
        "ri" => {
            if let Ok(ri) = value.parse::<u32>() {
                record.report_interval = ri
            }
        }
        "fo" => record.failure_options = value.to_string(),
        _ => {}
    }
}

/// Splits a comma separated list of report URIs and strips the `mailto:` scheme.
pub(crate) fn report_addresses(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(|uri| match uri.get(..7) {
            Some(scheme) if scheme.eq_ignore_ascii_case("mailto:") => uri[7..].to_string(),
            _ => uri.to_string(),
        })
        .collect()
}

fn annotate(key: &str, token: &Token) -> ParsedTag {
    let tag = token.key();
    let value = token.value();
    match key {
        "v" => {
            if value == "DMARC1" {
                ParsedTag::new(tag, value, "DMARC version 1", TagStatus::Good)
            } else {
                ParsedTag::new(tag, value, "Invalid DMARC version; expected DMARC1", TagStatus::Error)
            }
        }
        "p" => match (DmarcPolicy::from_value(value), describe(POLICIES, value)) {
            (Some(policy), Some(description)) => ParsedTag::new(tag, value, description, policy_status(policy)),
            _ => ParsedTag::new(
                tag,
                value,
                format!("Invalid policy '{}'; expected none, quarantine, or reject", value),
                TagStatus::Error,
            ),
        },
        "sp" => match (DmarcPolicy::from_value(value), describe(POLICIES, value)) {
            (Some(DmarcPolicy::None), Some(description)) => {
                ParsedTag::new(tag, value, format!("Subdomains: {}", description), TagStatus::Info)
            }
            (Some(policy), Some(description)) => ParsedTag::new(
                tag,
                value,
                format!("Subdomains: {}", description),
                policy_status(policy),
            ),
            _ => ParsedTag::new(
                tag,
                value,
                format!("Invalid subdomain policy '{}'", value),
                TagStatus::Warning,
            ),
        },
        "rua" => {
            let addresses = report_addresses(value);
            if addresses.is_empty() {
                ParsedTag::new(tag, value, "No aggregate report destination given", TagStatus::Warning)
            } else {
                ParsedTag::new(
                    tag,
                    value,
                    format!("Aggregate reports are sent to {}", addresses.join(", ")),
                    TagStatus::Good,
                )
            }
        }
        "ruf" => ParsedTag::new(
            tag,
            value,
            format!("Failure reports are sent to {}", report_addresses(value).join(", ")),
            TagStatus::Info,
        ),
        "pct" => match value.parse::<i64>() {
            Ok(100) => ParsedTag::new(tag, value, "Policy applies to 100% of failing mail", TagStatus::Good),
            Ok(pct) => ParsedTag::new(
                tag,
                value,
                format!("Policy applies to {}% of failing mail", pct),
                TagStatus::Warning,
            ),
            Err(_) => ParsedTag::new(
                tag,
                value,
                format!("Policy applies to NaN% of failing mail; '{}' is not a number", value),
                TagStatus::Warning,
            ),
        },
        "adkim" => alignment_tag(tag, value, DKIM_ALIGNMENTS, "DKIM"),
        "aspf" => alignment_tag(tag, value, SPF_ALIGNMENTS, "SPF"),
        "ri" => {
            // Rounded to the nearest hour
            let hours = value.parse::<u64>().map(|seconds| seconds.saturating_add(1800) / 3600);
            let description = match hours {
                Ok(1) => "Aggregate reports every hour".to_string(),
                Ok(hours) if hours > 0 => format!("Aggregate reports every {} hours", hours),
                _ => format!("Aggregate reports every {} seconds", value),
            };
            ParsedTag::new(tag, value, description, TagStatus::Info)
        }
        "fo" => {
            let descriptions: Vec<&str> = value
                .split(':')
                .filter_map(|x| describe(FAILURE_OPTIONS, x.trim()))
                .collect();
            let description = if descriptions.is_empty() {
                format!("Failure reporting options: {}", value)
            } else {
                descriptions.join("; ")
            };
            ParsedTag::new(tag, value, description, TagStatus::Info)
        }
        _ => ParsedTag::new(tag, value, "Unknown tag", TagStatus::Info),
    }
}

fn policy_status(policy: DmarcPolicy) -> TagStatus {
    match policy {
        DmarcPolicy::Reject => TagStatus::Good,
        DmarcPolicy::Quarantine => TagStatus::Warning,
        DmarcPolicy::None => TagStatus::Error,
    }
}

fn alignment_tag(tag: &str, value: &str, table: &[(&'static str, &'static str)], mechanism: &str) -> ParsedTag {
    match (Alignment::from_value(value), describe(table, value)) {
        (Some(Alignment::Strict), Some(description)) => ParsedTag::new(tag, value, description, TagStatus::Good),
        (Some(Alignment::Relaxed), Some(description)) => ParsedTag::new(tag, value, description, TagStatus::Info),
        _ => ParsedTag::new(
            tag,
            value,
            format!("Unknown {} alignment mode '{}'", mechanism, value),
            TagStatus::Info,
        ),
    }
}

#[cfg(test)]
mod tests {
    use spectral::prelude::*;

    use super::*;

    fn tag_names(record: &DmarcRecord) -> Vec<&str> {
        record.tags().iter().map(ParsedTag::tag).collect()
    }

    fn status_of(record: &DmarcRecord, tag: &str) -> Option<TagStatus> {
        record.tags().iter().find(|x| x.tag() == tag).map(ParsedTag::status)
    }

    #[test]
    fn full_record() {
        crate::utils::tests::logging::init();
        let record = "v=DMARC1; p=quarantine; sp=reject; pct=25; rua=mailto:agg@example.com,mailto:dmarc@thirdparty.example; ruf=mailto:forensic@example.com; adkim=s; aspf=r; ri=3600; fo=1";

        let dmarc = parse_dmarc_record(record);

        assert_that(&dmarc.version()).is_equal_to(Some("DMARC1"));
        assert_that(&dmarc.policy()).is_equal_to(Some(DmarcPolicy::Quarantine));
        assert_that(&dmarc.subdomain_policy()).is_equal_to(Some(DmarcPolicy::Reject));
        assert_that(&dmarc.percentage()).is_equal_to(25);
        assert_that(&dmarc.rua_emails().to_vec())
            .is_equal_to(vec!["agg@example.com".to_string(), "dmarc@thirdparty.example".to_string()]);
        assert_that(&dmarc.ruf_emails().to_vec()).is_equal_to(vec!["forensic@example.com".to_string()]);
        assert_that(&dmarc.dkim_alignment()).is_equal_to(Alignment::Strict);
        assert_that(&dmarc.spf_alignment()).is_equal_to(Alignment::Relaxed);
        assert_that(&dmarc.report_interval()).is_equal_to(3600);
        assert_that(&dmarc.failure_options()).is_equal_to("1");
    }

    #[test]
    fn defaults() {
        crate::utils::tests::logging::init();

        let dmarc = parse_dmarc_record("v=DMARC1; p=none");

        assert_that(&dmarc.percentage()).is_equal_to(100);
        assert_that(&dmarc.report_interval()).is_equal_to(86400);
        assert_that(&dmarc.dkim_alignment()).is_equal_to(Alignment::Relaxed);
        assert_that(&dmarc.spf_alignment()).is_equal_to(Alignment::Relaxed);
        assert_that(&Alignment::default()).is_equal_to(Alignment::Relaxed);
        assert_that(&dmarc.failure_options()).is_equal_to("0");
        assert_that(&dmarc.subdomain_policy()).is_equal_to(Some(DmarcPolicy::None));
        asserting("no explicit sp").that(&dmarc.has_subdomain_policy()).is_false();
        assert_that(&dmarc.rua_emails().is_empty()).is_true();
    }

    #[test]
    fn tag_order_is_preserved() {
        crate::utils::tests::logging::init();

        let dmarc = parse_dmarc_record("v=DMARC1; p=reject; pct=50; rua=mailto:a@x.com");

        assert_that(&tag_names(&dmarc)).is_equal_to(vec!["v", "p", "pct", "rua"]);
    }

    #[test]
    fn duplicates_are_kept_but_first_wins() {
        crate::utils::tests::logging::init();

        let dmarc = parse_dmarc_record("v=DMARC1; p=reject; p=none");

        assert_that(&tag_names(&dmarc)).is_equal_to(vec!["v", "p", "p"]);
        assert_that(&dmarc.policy()).is_equal_to(Some(DmarcPolicy::Reject));
    }

    #[test]
    fn policy_status() {
        crate::utils::tests::logging::init();

        assert_that(&status_of(&parse_dmarc_record("p=reject"), "p")).is_equal_to(Some(TagStatus::Good));
        assert_that(&status_of(&parse_dmarc_record("p=quarantine"), "p")).is_equal_to(Some(TagStatus::Warning));
        assert_that(&status_of(&parse_dmarc_record("p=none"), "p")).is_equal_to(Some(TagStatus::Error));
        assert_that(&status_of(&parse_dmarc_record("p=bogus"), "p")).is_equal_to(Some(TagStatus::Error));
        assert_that(&status_of(&parse_dmarc_record("sp=none"), "sp")).is_equal_to(Some(TagStatus::Info));
        assert_that(&status_of(&parse_dmarc_record("sp=reject"), "sp")).is_equal_to(Some(TagStatus::Good));
    }

    #[test]
    fn version_must_match_exactly() {
        crate::utils::tests::logging::init();

        assert_that(&status_of(&parse_dmarc_record("v=DMARC1"), "v")).is_equal_to(Some(TagStatus::Good));
        assert_that(&status_of(&parse_dmarc_record("v=dmarc1"), "v")).is_equal_to(Some(TagStatus::Error));
    }

    #[test]
    fn percentage_boundaries() {
        crate::utils::tests::logging::init();

        assert_that(&status_of(&parse_dmarc_record("pct=100"), "pct")).is_equal_to(Some(TagStatus::Good));
        assert_that(&status_of(&parse_dmarc_record("pct=99"), "pct")).is_equal_to(Some(TagStatus::Warning));
    }

    #[test]
    fn non_numeric_percentage_degrades() {
        crate::utils::tests::logging::init();

        let dmarc = parse_dmarc_record("v=DMARC1; p=reject; pct=abc");
        let pct = &dmarc.tags()[2];

        assert_that(&pct.status()).is_equal_to(TagStatus::Warning);
        asserting("description mentions NaN").that(&pct.description().contains("NaN")).is_true();
        assert_that(&dmarc.percentage()).is_equal_to(100);
    }

    #[test]
    fn alignment_status() {
        crate::utils::tests::logging::init();

        let dmarc = parse_dmarc_record("adkim=s; aspf=r; adkim=x");

        let statuses: Vec<TagStatus> = dmarc.tags().iter().map(ParsedTag::status).collect();
        assert_that(&statuses).is_equal_to(vec![TagStatus::Good, TagStatus::Info, TagStatus::Info]);
    }

    #[test]
    fn report_interval_description() {
        crate::utils::tests::logging::init();

        let hours = parse_dmarc_record("ri=86400");
        let hour = parse_dmarc_record("ri=3600");
        let seconds = parse_dmarc_record("ri=60");

        assert_that(&hours.tags()[0].description()).is_equal_to("Aggregate reports every 24 hours");
        assert_that(&hour.tags()[0].description()).is_equal_to("Aggregate reports every hour");
        assert_that(&seconds.tags()[0].description()).is_equal_to("Aggregate reports every 60 seconds");
    }

    #[test]
    fn failure_options() {
        crate::utils::tests::logging::init();

        let known = parse_dmarc_record("fo=d:s");
        let unknown = parse_dmarc_record("fo=x");

        asserting("description mentions DKIM").that(&known.tags()[0].description().contains("DKIM")).is_true();
        asserting("description mentions SPF").that(&known.tags()[0].description().contains("SPF")).is_true();
        assert_that(&unknown.tags()[0].status()).is_equal_to(TagStatus::Info);
        assert_that(&unknown.tags()[0].description()).is_equal_to("Failure reporting options: x");
    }

    #[test]
    fn unknown_tags_are_kept() {
        crate::utils::tests::logging::init();

        let dmarc = parse_dmarc_record("v=DMARC1; p=reject; foo=bar");

        assert_that(&dmarc.tags()[2]).is_equal_to(ParsedTag::new("foo", "bar", "Unknown tag", TagStatus::Info));
    }

    #[test]
    fn idempotent() {
        crate::utils::tests::logging::init();
        let record = "v=DMARC1; p=reject; rua=mailto:a@x.com; bogus";

        assert_that(&parse_dmarc_record(record)).is_equal_to(parse_dmarc_record(record));
    }
}
