// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Looks up and checks all authentication records of a domain.

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::lints::{validate_record, Issues, ValidationIssue};
use crate::lookup::{dkim_name, dmarc_name, TxtRecords};
use crate::recommendations::get_recommendations;
use crate::records::{parse_dkim_record, parse_dmarc_record, parse_spf_record, ParsedTag, RecordKind};

#[derive(Debug, Clone, Serialize)]
pub struct RecordCheck {
    kind: RecordKind,
    name: Option<String>,
    record: Option<String>,
    tags: Vec<ParsedTag>,
    issues: Vec<ValidationIssue>,
    recommendations: Vec<String>,
}

impl RecordCheck {
    /// Parses, lints, and advises on a single record; `name` is the DNS name it was found at, if any.
    pub fn new(kind: RecordKind, name: Option<String>, record: &str) -> RecordCheck {
        RecordCheck {
            kind,
            name,
            record: Some(record.to_string()),
            tags: parse_tags(kind, record),
            issues: validate_record(kind, record),
            recommendations: get_recommendations(kind, Some(record)),
        }
    }

    /// Checks the TXT strings found at `name`; strings of other kinds are ignored.
    pub fn from_txt_records(kind: RecordKind, name: String, txts: &[String]) -> RecordCheck {
        let candidates: Vec<&String> = txts.iter().filter(|x| kind.matches(x)).collect();
        debug!(
            "Found {} {} candidates among {} TXT records at '{}'.",
            candidates.len(),
            kind,
            txts.len(),
            name
        );

        let record = match candidates.first() {
            Some(record) => record.as_str(),
            None => {
                return RecordCheck {
                    kind,
                    issues: vec![ValidationIssue::warning(format!("No {} record found at '{}'", kind, name))],
                    name: Some(name),
                    record: None,
                    tags: Vec::new(),
                    recommendations: get_recommendations(kind, None),
                }
            }
        };

        let mut check = RecordCheck::new(kind, Some(name), record);
        if candidates.len() > 1 {
            let issue = ValidationIssue::error(format!(
                "Found {} {} records; receivers treat multiple records as an error and ignore all of them",
                candidates.len(),
                kind,
            ));
            check.issues.insert(0, issue);
        }

        check
    }

    fn from_lookup_error(kind: RecordKind, name: String, error: &crate::Error) -> RecordCheck {
        RecordCheck {
            kind,
            issues: vec![ValidationIssue::error(format!("Failed to look up '{}': {}", name, error))],
            name: Some(name),
            record: None,
            tags: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    pub fn without_issues(self) -> RecordCheck {
        RecordCheck {
            issues: Vec::new(),
            ..self
        }
    }

    pub fn without_recommendations(self) -> RecordCheck {
        RecordCheck {
            recommendations: Vec::new(),
            ..self
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn record(&self) -> Option<&str> {
        self.record.as_deref()
    }

    pub fn tags(&self) -> &[ParsedTag] {
        &self.tags
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }
}

fn parse_tags(kind: RecordKind, raw: &str) -> Vec<ParsedTag> {
    match kind {
        RecordKind::Dmarc => parse_dmarc_record(raw).tags().to_vec(),
        RecordKind::Spf => parse_spf_record(raw).tags().to_vec(),
        RecordKind::Dkim => parse_dkim_record(raw).tags().to_vec(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainCheck {
    domain: String,
    checks: Vec<RecordCheck>,
}

impl DomainCheck {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn checks(&self) -> &[RecordCheck] {
        &self.checks
    }

    pub fn has_errors(&self) -> bool {
        self.checks.iter().any(|x| x.issues.has_errors())
    }

    pub fn without_recommendations(self) -> DomainCheck {
        DomainCheck {
            checks: self
                .checks
                .into_iter()
                .map(RecordCheck::without_recommendations)
                .collect(),
            ..self
        }
    }
}

/// Looks up the DMARC, SPF, and DKIM records for each of `selectors` concurrently and checks them.
pub async fn check_domain<L: TxtRecords>(lookup: &L, domain: &str, selectors: &[String]) -> DomainCheck {
    let domain = domain.trim_end_matches('.').to_string();
    let mut targets = vec![
        (RecordKind::Dmarc, dmarc_name(&domain)),
        (RecordKind::Spf, domain.clone()),
    ];
    targets.extend(selectors.iter().map(|selector| (RecordKind::Dkim, dkim_name(selector, &domain))));

    let lookups = targets.iter().map(|(_, name)| lookup.txt_records(name));
    let results = join_all(lookups).await;

    let checks = targets
        .into_iter()
        .zip(results)
        .map(|((kind, name), result)| match result {
            Ok(txts) => RecordCheck::from_txt_records(kind, name, &txts),
            Err(e) => {
                warn!("Failed to look up {} record at '{}': {}", kind, name, e);
                RecordCheck::from_lookup_error(kind, name, &e)
            }
        })
        .collect();

    DomainCheck { domain, checks }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::future::{ready, Future};

    use spectral::prelude::*;

    use super::*;
    use crate::lints::Severity;
    use crate::{Error, Result};

    #[derive(Default)]
    struct StaticRecords {
        records: HashMap<String, Vec<String>>,
    }

    impl StaticRecords {
        fn with(mut self, name: &str, txt: &str) -> Self {
            self.records.entry(name.to_string()).or_default().push(txt.to_string());
            self
        }
    }

    impl TxtRecords for StaticRecords {
        fn txt_records(&self, name: &str) -> impl Future<Output = Result<Vec<String>>> + Send {
            let result = if name.starts_with("broken.") {
                Err(Error::ParserError {
                    what: name.to_string(),
                    to: "TXT records",
                    why: "lookup timed out".to_string(),
                })
            } else {
                Ok(self.records.get(name).cloned().unwrap_or_default())
            };
            ready(result)
        }
    }

    #[tokio::test]
    async fn complete_domain() {
        crate::utils::tests::logging::init();
        let lookup = StaticRecords::default()
            .with("_dmarc.example.com", "v=DMARC1; p=reject; rua=mailto:dmarc@example.com")
            .with("example.com", "google-site-verification=abc")
            .with("example.com", "v=spf1 mx -all")
            .with("s1._domainkey.example.com", "v=DKIM1; k=rsa; p=");

        let check = check_domain(&lookup, "example.com.", &["s1".to_string()]).await;

        assert_that(&check.domain()).is_equal_to("example.com");
        assert_that(&check.checks().len()).is_equal_to(3);
        let spf = &check.checks()[1];
        assert_that(&spf.kind()).is_equal_to(RecordKind::Spf);
        assert_that(&spf.record()).is_equal_to(Some("v=spf1 mx -all"));
        assert_that(&spf.issues().to_vec()).is_empty();
        let dkim = &check.checks()[2];
        assert_that(&dkim.name()).is_equal_to(Some("s1._domainkey.example.com"));
        asserting("revoked key").that(&check.has_errors()).is_true();
        asserting("tags").that(&dkim.tags().is_empty()).is_false();
    }

    #[tokio::test]
    async fn missing_records() {
        crate::utils::tests::logging::init();
        let lookup = StaticRecords::default();

        let check = check_domain(&lookup, "example.com", &[]).await;

        assert_that(&check.checks().len()).is_equal_to(2);
        for record_check in check.checks() {
            assert_that(&record_check.record()).is_none();
            assert_that(&record_check.issues()[0].severity()).is_equal_to(Severity::Warning);
            asserting("setup guidance")
                .that(&record_check.recommendations().is_empty())
                .is_false();
        }
        asserting("no errors").that(&check.has_errors()).is_false();
    }

    #[tokio::test]
    async fn multiple_spf_records() {
        crate::utils::tests::logging::init();
        let lookup = StaticRecords::default()
            .with("example.com", "v=spf1 mx -all")
            .with("example.com", "v=spf1 a -all");

        let check = check_domain(&lookup, "example.com", &[]).await;

        let spf = &check.checks()[1];
        assert_that(&spf.issues()[0].severity()).is_equal_to(Severity::Error);
        assert_that(&spf.record()).is_equal_to(Some("v=spf1 mx -all"));
    }

    #[test]
    fn single_record() {
        crate::utils::tests::logging::init();

        let check = RecordCheck::new(RecordKind::Dmarc, None, "p=none");

        assert_that(&check.name()).is_none();
        assert_that(&check.tags().len()).is_equal_to(1);
        asserting("missing version").that(&check.issues().has_errors()).is_true();
        asserting("recommendations")
            .that(&check.recommendations().is_empty())
            .is_false();
    }

    #[tokio::test]
    async fn failed_lookup() {
        crate::utils::tests::logging::init();
        let lookup = StaticRecords::default().with("_dmarc.example.com", "v=DMARC1; p=reject");

        let check = check_domain(&lookup, "broken.example.com", &[]).await;

        asserting("lookup error").that(&check.has_errors()).is_true();
        assert_that(&check.checks()[1].record()).is_none();
    }
}
