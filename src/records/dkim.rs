// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! DKIM public key records, cf. RFC 6376, section 3.6.1.

use std::fmt;

use serde::Serialize;
use tracing::{debug, trace};

use crate::records::tokenizer::{tokenize, Grammar, Token};
use crate::records::{describe, ParsedTag, TagStatus};

/// Public keys longer than this are shortened for display.
pub const MAX_KEY_DISPLAY_LEN: usize = 50;

pub const REVOKED: &str = "(revoked)";

static KEY_TYPES: &[(&str, &str)] = &[
    ("rsa", "RSA public key"),
    ("ed25519", "Ed25519 public key; cf. RFC 8463"),
];

static FLAGS: &[(&str, &str)] = &[
    ("y", "Testing mode; verifiers must not treat messages differently from unsigned mail"),
    ("s", "Strict mode; the signing domain must not be a subdomain of the identity"),
];

static HASH_ALGORITHMS: &[(&str, &str)] = &[
    ("sha256", "SHA-256"),
    ("sha1", "SHA-1, deprecated; cf. RFC 8301"),
];

static SERVICE_TYPES: &[(&str, &str)] = &[
    ("*", "Key may be used by all service types"),
    ("email", "Key may be used for email only"),
];

#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    #[default]
    Rsa,
    Ed25519,
    Other(String),
}

impl KeyType {
    pub fn from_value(value: &str) -> KeyType {
        match value.to_lowercase().as_str() {
            "rsa" => KeyType::Rsa,
            "ed25519" => KeyType::Ed25519,
            _ => KeyType::Other(value.to_string()),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Rsa => f.write_str("rsa"),
            KeyType::Ed25519 => f.write_str("ed25519"),
            KeyType::Other(other) => f.write_str(other),
        }
    }
}

/// State of the public key; an empty `p` tag explicitly revokes a key.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyState {
    Missing,
    Revoked,
    Present,
}

#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize)]
pub struct DkimRecord {
    version: Option<String>,
    key_type: KeyType,
    public_key: Option<String>,
    flags: Vec<String>,
    hash_algorithms: Vec<String>,
    service_type: Vec<String>,
    notes: Option<String>,
    tags: Vec<ParsedTag>,
}

impl DkimRecord {
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn key_type(&self) -> &KeyType {
        &self.key_type
    }

    /// `Some("")` if the key has been revoked
    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    pub fn key_state(&self) -> KeyState {
        match self.public_key.as_deref() {
            None => KeyState::Missing,
            Some("") => KeyState::Revoked,
            Some(_) => KeyState::Present,
        }
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn is_testing(&self) -> bool {
        self.flags.iter().any(|x| x.eq_ignore_ascii_case("y"))
    }

    pub fn is_strict(&self) -> bool {
        self.flags.iter().any(|x| x.eq_ignore_ascii_case("s"))
    }

    pub fn hash_algorithms(&self) -> &[String] {
        &self.hash_algorithms
    }

    pub fn service_type(&self) -> &[String] {
        &self.service_type
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn tags(&self) -> &[ParsedTag] {
        &self.tags
    }
}

/// Parses a DKIM key TXT record value, already stripped of surrounding quotes.
pub fn parse_dkim_record(raw: &str) -> DkimRecord {
    let tokens = tokenize(raw, Grammar::Semicolon);
    let mut record = DkimRecord::default();
    let mut seen: Vec<String> = Vec::new();

    for token in &tokens {
        let key = token.key().to_lowercase();
        trace!("Parsing DKIM tag '{}'.", key);

        record.tags.push(annotate(&key, token));
        if seen.contains(&key) {
            continue;
        }
        apply(&mut record, &key, token.value());
        seen.push(key);
    }
    debug!("Parsed DKIM record with {} tags.", record.tags.len());

    record
}

fn apply(record: &mut DkimRecord, key: &str, value: &str) {
    match key {
        "v" => record.version = Some(value.to_string()),
        "k" => record.key_type = KeyType::from_value(value),
        "p" => record.public_key = Some(value.to_string()),
        "t" => record.flags = colon_list(value),
        "h" => record.hash_algorithms = colon_list(value),
        "s" => record.service_type = colon_list(value),
        "n" => record.notes = Some(value.to_string()),
        _ => {}
    }
}

pub(crate) fn colon_list(value: &str) -> Vec<String> {
    value
        .split(':')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn describe_list(table: &[(&'static str, &'static str)], value: &str) -> String {
    colon_list(value)
        .iter()
        .map(|x| describe(table, x).map(ToString::to_string).unwrap_or_else(|| format!("unknown '{}'", x)))
        .collect::<Vec<_>>()
        .join("; ")
}

fn annotate(key: &str, token: &Token) -> ParsedTag {
    let tag = token.key();
    let value = token.value();
    match key {
        "v" => {
            if value == "DKIM1" {
                ParsedTag::new(tag, value, "DKIM version 1", TagStatus::Good)
            } else {
                ParsedTag::new(tag, value, "Invalid DKIM version; expected DKIM1", TagStatus::Error)
            }
        }
        "k" => match describe(KEY_TYPES, value) {
            Some(description) => ParsedTag::new(tag, value, description, TagStatus::Good),
            None => ParsedTag::new(tag, value, format!("Unknown key type '{}'", value), TagStatus::Info),
        },
        "p" if value.is_empty() => ParsedTag::new(tag, REVOKED, "The key has been revoked", TagStatus::Error),
        "p" => {
            let length = value.chars().count();
            let display = if length > MAX_KEY_DISPLAY_LEN {
                format!("{}...", value.chars().take(MAX_KEY_DISPLAY_LEN).collect::<String>())
            } else {
                value.to_string()
            };
            ParsedTag::new(tag, display, format!("Public key ({} characters)", length), TagStatus::Good)
        }
        "t" => {
            let status = if colon_list(value).iter().any(|x| x.eq_ignore_ascii_case("y")) {
                TagStatus::Warning
            } else {
                TagStatus::Info
            };
            ParsedTag::new(tag, value, describe_list(FLAGS, value), status)
        }
        "h" => ParsedTag::new(
            tag,
            value,
            format!("Acceptable hash algorithms: {}", describe_list(HASH_ALGORITHMS, value)),
            TagStatus::Info,
        ),
        "s" => ParsedTag::new(tag, value, describe_list(SERVICE_TYPES, value), TagStatus::Info),
        "n" => ParsedTag::new(tag, value, "Notes for administrators", TagStatus::Info),
        _ => ParsedTag::new(tag, value, "Unknown tag", TagStatus::Info),
    }
}

#[cfg(test)]
mod tests {
    use spectral::prelude::*;

    use super::*;

    static KEY: &str = "MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQDwIRP/UC3SBsEmGqZ9ZJW3/DkMoGeLnQg1fWn7/zYtIxN2SnFCjxOCKG9v3b4jYfcTNh5ijSsq631uBItLa7od+v/RtdC2UzJ1lWT947qR+Rcac2gbto/NMqJ0fzfVjH4OuKhitdY9tf6mcwGjaNBcWToIMmPSPDdQPNUYckcQ2QIDAQAB";

    #[test]
    fn full_record() {
        crate::utils::tests::logging::init();
        let record = format!("v=DKIM1; k=rsa; h=sha256; s=email; t=s; n=rotated 2021; p={}", KEY);

        let dkim = parse_dkim_record(&record);

        assert_that(&dkim.version()).is_equal_to(Some("DKIM1"));
        assert_that(dkim.key_type()).is_equal_to(&KeyType::Rsa);
        assert_that(&dkim.public_key()).is_equal_to(Some(KEY));
        assert_that(&dkim.key_state()).is_equal_to(KeyState::Present);
        assert_that(&dkim.hash_algorithms().to_vec()).is_equal_to(vec!["sha256".to_string()]);
        assert_that(&dkim.service_type().to_vec()).is_equal_to(vec!["email".to_string()]);
        assert_that(&dkim.notes()).is_equal_to(Some("rotated 2021"));
        asserting("strict flag").that(&dkim.is_strict()).is_true();
        asserting("no testing flag").that(&dkim.is_testing()).is_false();
    }

    #[test]
    fn revoked_key() {
        crate::utils::tests::logging::init();

        let dkim = parse_dkim_record("v=DKIM1; k=rsa; p=");

        let p = &dkim.tags()[2];
        assert_that(&p.value()).is_equal_to("(revoked)");
        assert_that(&p.status()).is_equal_to(TagStatus::Error);
        assert_that(&dkim.key_state()).is_equal_to(KeyState::Revoked);
    }

    #[test]
    fn missing_key() {
        crate::utils::tests::logging::init();

        let dkim = parse_dkim_record("v=DKIM1; k=rsa");

        assert_that(&dkim.key_state()).is_equal_to(KeyState::Missing);
    }

    #[test]
    fn long_key_is_truncated_for_display() {
        crate::utils::tests::logging::init();

        let dkim = parse_dkim_record(&format!("p={}", KEY));

        let p = &dkim.tags()[0];
        assert_that(&p.value().chars().count()).is_equal_to(MAX_KEY_DISPLAY_LEN + 3);
        asserting("ellipsis").that(&p.value().ends_with("...")).is_true();
        assert_that(&p.description()).is_equal_to(format!("Public key ({} characters)", KEY.len()).as_str());
        assert_that(&p.status()).is_equal_to(TagStatus::Good);
    }

    #[test]
    fn short_key_is_not_truncated() {
        crate::utils::tests::logging::init();

        let dkim = parse_dkim_record("p=MCowBQYDK2VwAyEA");

        assert_that(&dkim.tags()[0].value()).is_equal_to("MCowBQYDK2VwAyEA");
    }

    #[test]
    fn testing_flag() {
        crate::utils::tests::logging::init();

        let testing = parse_dkim_record("t=y");
        let strict = parse_dkim_record("t=s");

        assert_that(&testing.tags()[0].status()).is_equal_to(TagStatus::Warning);
        asserting("testing").that(&testing.is_testing()).is_true();
        assert_that(&strict.tags()[0].status()).is_equal_to(TagStatus::Info);
    }

    #[test]
    fn key_types() {
        crate::utils::tests::logging::init();

        let dkim = parse_dkim_record("k=ed25519; k=dsa");

        assert_that(&dkim.tags()[0].status()).is_equal_to(TagStatus::Good);
        assert_that(&dkim.tags()[1].status()).is_equal_to(TagStatus::Info);
        assert_that(dkim.key_type()).is_equal_to(&KeyType::Ed25519);
        assert_that(&parse_dkim_record("").key_type().clone()).is_equal_to(KeyType::Rsa);
        assert_that(&KeyType::default()).is_equal_to(KeyType::Rsa);
    }

    #[test]
    fn service_types_are_distinct() {
        crate::utils::tests::logging::init();

        let all = parse_dkim_record("s=*");
        let email = parse_dkim_record("s=email");

        assert_that(&all.tags()[0].description()).is_not_equal_to(email.tags()[0].description());
    }

    #[test]
    fn unknown_tags_are_kept() {
        crate::utils::tests::logging::init();

        let dkim = parse_dkim_record("v=DKIM1; x=1; p=abc");

        assert_that(&dkim.tags()[1]).is_equal_to(&ParsedTag::new("x", "1", "Unknown tag", TagStatus::Info));
    }
}
