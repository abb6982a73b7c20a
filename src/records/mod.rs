// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Parsers for the TXT records that carry email authentication policies.
//!
//! Every parser is lenient: unknown or malformed tags degrade to [`TagStatus::Info`] instead of failing.
//! Each parsed record carries the annotated tags in the order they appear in the record, duplicates included.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::{Error, Result};

pub mod dkim;
pub mod dmarc;
pub mod spf;
pub mod tokenizer;

pub use dkim::{parse_dkim_record, DkimRecord, KeyState, KeyType};
pub use dmarc::{parse_dmarc_record, Alignment, DmarcPolicy, DmarcRecord};
pub use spf::{parse_spf_record, Mechanism, Modifier, Qualifier, SpfMechanism, SpfMechanismType, SpfRecord, SpfTerm};
pub use tokenizer::{tokenize, Grammar, Token};

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Dmarc,
    Spf,
    Dkim,
}

impl RecordKind {
    pub fn all() -> [RecordKind; 3] {
        [RecordKind::Dmarc, RecordKind::Spf, RecordKind::Dkim]
    }

    /// Checks if a TXT string looks like a record of this kind.
    pub fn matches(&self, txt: &str) -> bool {
        let txt = txt.trim_start();
        match self {
            RecordKind::Dmarc => starts_with_ignore_case(txt, "v=DMARC1"),
            RecordKind::Spf => {
                starts_with_ignore_case(txt, "v=spf1")
                    && txt[6..].chars().next().map(char::is_whitespace).unwrap_or(true)
            }
            // Keys published without a version tag are still valid; cf. RFC 6376, section 3.6.1
            RecordKind::Dkim => {
                starts_with_ignore_case(txt, "v=DKIM1")
                    || tokenize(txt, Grammar::Semicolon)
                        .iter()
                        .any(|t| t.key().eq_ignore_ascii_case("p"))
            }
        }
    }
}

fn starts_with_ignore_case(txt: &str, prefix: &str) -> bool {
    txt.get(..prefix.len())
        .map(|x| x.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let str = match self {
            RecordKind::Dmarc => "DMARC",
            RecordKind::Spf => "SPF",
            RecordKind::Dkim => "DKIM",
        };
        f.write_str(str)
    }
}

impl FromStr for RecordKind {
    type Err = Error;

    fn from_str(str: &str) -> Result<Self> {
        match str.to_lowercase().as_str() {
            "dmarc" => Ok(RecordKind::Dmarc),
            "spf" => Ok(RecordKind::Spf),
            "dkim" => Ok(RecordKind::Dkim),
            _ => Err(Error::ParserError {
                what: str.to_string(),
                to: "RecordKind",
                why: "unsupported record kind; use dmarc, spf, or dkim".to_string(),
            }),
        }
    }
}

/// Quality classification of a single tag, independent of validation results.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagStatus {
    Good,
    Warning,
    Error,
    Info,
}

impl fmt::Display for TagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let str = match self {
            TagStatus::Good => "good",
            TagStatus::Warning => "warning",
            TagStatus::Error => "error",
            TagStatus::Info => "info",
        };
        f.write_str(str)
    }
}

/// One interpreted directive of a record.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct ParsedTag {
    tag: String,
    value: String,
    description: String,
    status: TagStatus,
}

impl ParsedTag {
    pub fn new<T: Into<String>, V: Into<String>, D: Into<String>>(
        tag: T,
        value: V,
        description: D,
        status: TagStatus,
    ) -> ParsedTag {
        ParsedTag {
            tag: tag.into(),
            value: value.into(),
            description: description.into(),
            status,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> TagStatus {
        self.status
    }
}

/// Looks up `key` in a static description table.
pub(crate) fn describe(table: &[(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use spectral::prelude::*;

    use super::*;

    #[test]
    fn record_kind_from_str() {
        crate::utils::tests::logging::init();

        assert_that(&RecordKind::from_str("DMARC").ok()).is_equal_to(Some(RecordKind::Dmarc));
        assert_that(&RecordKind::from_str("spf").ok()).is_equal_to(Some(RecordKind::Spf));
        assert_that(&RecordKind::from_str("bimi")).is_err();
    }

    #[test]
    fn matches_spf() {
        crate::utils::tests::logging::init();

        asserting("spf record").that(&RecordKind::Spf.matches("v=spf1 -all")).is_true();
        asserting("bare version").that(&RecordKind::Spf.matches("v=spf1")).is_true();
        asserting("spf10 is not spf1").that(&RecordKind::Spf.matches("v=spf10 -all")).is_false();
        asserting("dmarc record").that(&RecordKind::Spf.matches("v=DMARC1; p=none")).is_false();
    }

    #[test]
    fn matches_dkim_without_version() {
        crate::utils::tests::logging::init();

        asserting("key without version").that(&RecordKind::Dkim.matches("k=rsa; p=MIGf")).is_true();
        asserting("random txt").that(&RecordKind::Dkim.matches("google-site-verification=abc")).is_false();
    }

    #[test]
    fn describe_is_case_insensitive() {
        let table = [("reject", "Reject")];

        assert_that(&describe(&table, "REJECT")).is_equal_to(Some("Reject"));
        assert_that(&describe(&table, "none")).is_none();
    }
}
