// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use data_encoding::BASE64;
use tracing::debug;

use crate::lints::ValidationIssue;
use crate::records::dkim::KeyType;
use crate::records::tokenizer::{tokenize, Grammar, Token};

static KNOWN_TAGS: &[&str] = &["v", "g", "h", "k", "n", "p", "s", "t"];

/// DER encoded RSA public keys of 1024 and 2048 bits are at least this long.
const MIN_RSA_1024_LEN: usize = 128;
const MIN_RSA_2048_LEN: usize = 256;
const ED25519_KEY_LEN: usize = 32;

pub fn validate_dkim_record(raw: &str) -> Vec<ValidationIssue> {
    let mut results = Vec::new();
    let tokens = tokenize(raw, Grammar::Semicolon);

    if tokens.is_empty() {
        results.push(ValidationIssue::error("DKIM record is empty"));
        return results;
    }

    check_version(&tokens, &mut results);
    check_key(&tokens, &mut results);
    check_flags(&tokens, &mut results);
    check_hash_algorithms(&tokens, &mut results);
    check_unknown_tags(&tokens, &mut results);
    debug!("Found {} issues in DKIM record.", results.len());

    results
}

/// Length of the decoded public key; whitespace within the key is ignored.
pub(crate) fn decoded_key_len(key: &str) -> Option<usize> {
    let key: String = key.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64.decode(key.as_bytes()).ok().map(|x| x.len())
}

pub(crate) fn is_short_rsa_key(len: usize) -> bool {
    len < MIN_RSA_2048_LEN
}

fn first<'a>(tokens: &'a [Token], key: &str) -> Option<&'a str> {
    tokens
        .iter()
        .find(|x| x.key().eq_ignore_ascii_case(key))
        .map(Token::value)
}

fn check_version(tokens: &[Token], results: &mut Vec<ValidationIssue>) {
    match first(tokens, "v") {
        None => results.push(ValidationIssue::info("No version tag; DKIM1 is assumed").with_field("v")),
        Some(version) if version != "DKIM1" => results.push(
            ValidationIssue::error(format!("Invalid version '{}'; must be DKIM1", version)).with_field("v"),
        ),
        Some(_) if !tokens[0].key().eq_ignore_ascii_case("v") => {
            results.push(ValidationIssue::warning("The version tag must be the first tag").with_field("v"))
        }
        Some(_) => {}
    }
}

fn check_key(tokens: &[Token], results: &mut Vec<ValidationIssue>) {
    let key_type = first(tokens, "k").map(KeyType::from_value).unwrap_or_default();
    if let KeyType::Other(ref other) = key_type {
        results.push(ValidationIssue::warning(format!("Unknown key type '{}'", other)).with_field("k"));
    }

    let key = match first(tokens, "p") {
        Some(key) => key,
        None => {
            results.push(ValidationIssue::error("Missing required public key tag").with_field("p"));
            return;
        }
    };
    let key: String = key.chars().filter(|c| !c.is_whitespace()).collect();
    if key.is_empty() {
        results.push(ValidationIssue::error("The public key has been revoked").with_field("p"));
        return;
    }

    let decoded = match BASE64.decode(key.as_bytes()) {
        Ok(decoded) => decoded,
        Err(e) => {
            results.push(ValidationIssue::error(format!("Public key is not valid base64: {}", e)).with_field("p"));
            return;
        }
    };
    match key_type {
        KeyType::Rsa if decoded.len() < MIN_RSA_1024_LEN => results.push(
            ValidationIssue::error("RSA key is shorter than 1024 bits; receivers ignore such signatures")
                .with_field("p"),
        ),
        KeyType::Rsa if is_short_rsa_key(decoded.len()) => results.push(
            ValidationIssue::warning("RSA key is shorter than 2048 bits").with_field("p"),
        ),
        KeyType::Ed25519 if decoded.len() != ED25519_KEY_LEN => results.push(
            ValidationIssue::error(format!(
                "Ed25519 key must be {} bytes, but is {} bytes",
                ED25519_KEY_LEN,
                decoded.len()
            ))
            .with_field("p"),
        ),
        _ => {}
    }
}

fn check_flags(tokens: &[Token], results: &mut Vec<ValidationIssue>) {
    let testing = first(tokens, "t")
        .map(|x| x.split(':').any(|flag| flag.trim().eq_ignore_ascii_case("y")))
        .unwrap_or(false);
    if testing {
        results.push(
            ValidationIssue::warning("Testing mode is enabled; verifiers treat signed mail like unsigned mail")
                .with_field("t"),
        );
    }
}

fn check_hash_algorithms(tokens: &[Token], results: &mut Vec<ValidationIssue>) {
    let sha1 = first(tokens, "h")
        .map(|x| x.split(':').any(|alg| alg.trim().eq_ignore_ascii_case("sha1")))
        .unwrap_or(false);
    if sha1 {
        results.push(ValidationIssue::warning("SHA-1 is deprecated; cf. RFC 8301").with_field("h"));
    }
}

fn check_unknown_tags(tokens: &[Token], results: &mut Vec<ValidationIssue>) {
    for token in tokens {
        let key = token.key().to_lowercase();
        if !KNOWN_TAGS.contains(&key.as_str()) {
            results.push(ValidationIssue::info(format!("Unknown tag '{}'", token.key())).with_field(token.key()));
        }
    }
}

#[cfg(test)]
mod tests {
    use spectral::prelude::*;

    use super::*;
    use crate::lints::Severity;

    fn has(issues: &[ValidationIssue], severity: Severity, field: Option<&str>) -> bool {
        issues.iter().any(|x| x.severity() == severity && x.field() == field)
    }

    fn key_of_len(len: usize) -> String {
        BASE64.encode(&vec![0x42u8; len])
    }

    #[test]
    fn rsa_2048_has_no_issues() {
        crate::utils::tests::logging::init();
        let record = format!("v=DKIM1; k=rsa; p={}", key_of_len(294));

        let issues = validate_dkim_record(&record);

        assert_that(&issues).is_empty();
    }

    #[test]
    fn revoked_key() {
        crate::utils::tests::logging::init();

        let issues = validate_dkim_record("v=DKIM1; k=rsa; p=");

        assert_that(&issues).has_length(1);
        asserting("revoked").that(&has(&issues, Severity::Error, Some("p"))).is_true();
    }

    #[test]
    fn weak_rsa_keys() {
        crate::utils::tests::logging::init();

        let short = validate_dkim_record(&format!("v=DKIM1; p={}", key_of_len(94)));
        let medium = validate_dkim_record(&format!("v=DKIM1; p={}", key_of_len(162)));

        asserting("512 bits").that(&has(&short, Severity::Error, Some("p"))).is_true();
        asserting("1024 bits").that(&has(&medium, Severity::Warning, Some("p"))).is_true();
    }

    #[test]
    fn ed25519_key_length() {
        crate::utils::tests::logging::init();

        let good = validate_dkim_record(&format!("v=DKIM1; k=ed25519; p={}", key_of_len(32)));
        let bad = validate_dkim_record(&format!("v=DKIM1; k=ed25519; p={}", key_of_len(33)));

        assert_that(&good).is_empty();
        asserting("wrong length").that(&has(&bad, Severity::Error, Some("p"))).is_true();
    }

    #[test]
    fn invalid_base64() {
        crate::utils::tests::logging::init();

        let issues = validate_dkim_record("v=DKIM1; p=not*base64");

        asserting("base64").that(&has(&issues, Severity::Error, Some("p"))).is_true();
    }

    #[test]
    fn key_split_by_whitespace() {
        crate::utils::tests::logging::init();
        let key = key_of_len(294);
        let record = format!("v=DKIM1; p={} {}", &key[..100], &key[100..]);

        assert_that(&validate_dkim_record(&record)).is_empty();
    }

    #[test]
    fn version() {
        crate::utils::tests::logging::init();
        let key = key_of_len(294);

        let missing = validate_dkim_record(&format!("p={}", key));
        let wrong = validate_dkim_record(&format!("v=DKIM2; p={}", key));
        let late = validate_dkim_record(&format!("p={}; v=DKIM1", key));

        asserting("missing").that(&has(&missing, Severity::Info, Some("v"))).is_true();
        asserting("wrong").that(&has(&wrong, Severity::Error, Some("v"))).is_true();
        asserting("not first").that(&has(&late, Severity::Warning, Some("v"))).is_true();
    }

    #[test]
    fn flags_hashes_and_unknown_tags() {
        crate::utils::tests::logging::init();
        let record = format!("v=DKIM1; k=dsa; t=y:s; h=sha1:sha256; x=1; p={}", key_of_len(294));

        let issues = validate_dkim_record(&record);

        asserting("key type").that(&has(&issues, Severity::Warning, Some("k"))).is_true();
        asserting("testing").that(&has(&issues, Severity::Warning, Some("t"))).is_true();
        asserting("sha1").that(&has(&issues, Severity::Warning, Some("h"))).is_true();
        asserting("unknown").that(&has(&issues, Severity::Info, Some("x"))).is_true();
    }

    #[test]
    fn missing_key() {
        crate::utils::tests::logging::init();

        let issues = validate_dkim_record("v=DKIM1; k=rsa");

        asserting("missing p").that(&has(&issues, Severity::Error, Some("p"))).is_true();
    }
}
