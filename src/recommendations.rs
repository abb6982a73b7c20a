// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Advisory next steps for DMARC, SPF, and DKIM records; most urgent first.

use tracing::debug;

use crate::lints::dkim::{decoded_key_len, is_short_rsa_key};
use crate::records::dkim::{parse_dkim_record, KeyState, KeyType};
use crate::records::dmarc::{parse_dmarc_record, Alignment, DmarcPolicy};
use crate::records::spf::{parse_spf_record, Qualifier, SpfMechanismType};
use crate::records::RecordKind;

/// Returns setup guidance if there is no record, otherwise hardening suggestions for the record.
pub fn get_recommendations(kind: RecordKind, record: Option<&str>) -> Vec<String> {
    let recommendations = match record.map(str::trim).filter(|x| !x.is_empty()) {
        None => setup(kind),
        Some(raw) => {
            let mut recommendations = Recommendations::default();
            match kind {
                RecordKind::Dmarc => dmarc(raw, &mut recommendations),
                RecordKind::Spf => spf(raw, &mut recommendations),
                RecordKind::Dkim => dkim(raw, &mut recommendations),
            }
            recommendations.into_ordered()
        }
    };
    debug!("Recommending {} steps for {} record.", recommendations.len(), kind);

    recommendations
}

#[derive(Default)]
struct Recommendations {
    danger: Vec<String>,
    enforcement: Vec<String>,
    reporting: Vec<String>,
    hardening: Vec<String>,
}

impl Recommendations {
    fn into_ordered(self) -> Vec<String> {
        let Recommendations {
            mut danger,
            enforcement,
            reporting,
            hardening,
        } = self;
        danger.extend(enforcement);
        danger.extend(reporting);
        danger.extend(hardening);
        danger
    }
}

fn setup(kind: RecordKind) -> Vec<String> {
    let steps: &[&str] = match kind {
        RecordKind::Dmarc => &[
            "Add a DMARC TXT record at _dmarc.<your-domain>",
            "Start with monitoring only: v=DMARC1; p=none; rua=mailto:dmarc-reports@<your-domain>",
            "Move to p=quarantine and then p=reject once aggregate reports show that all legitimate mail passes SPF or DKIM",
        ],
        RecordKind::Spf => &[
            "Add an SPF TXT record at <your-domain>",
            "List every service sending mail for the domain and end with -all, e.g. v=spf1 mx include:_spf.<provider> -all",
            "Domains that never send mail should publish v=spf1 -all",
        ],
        RecordKind::Dkim => &[
            "Generate a 2048-bit RSA key pair and configure your mail server to sign outgoing mail",
            "Add the public key as TXT record at <selector>._domainkey.<your-domain>: v=DKIM1; k=rsa; p=<base64 public key>",
            "Use t=y only while testing and remove it once signatures verify",
        ],
    };
    steps.iter().map(ToString::to_string).collect()
}

fn dmarc(raw: &str, recommendations: &mut Recommendations) {
    let record = parse_dmarc_record(raw);

    if !record.version().map(|x| x == "DMARC1").unwrap_or(false) {
        recommendations
            .danger
            .push("Start the record with v=DMARC1; receivers ignore records without it".to_string());
    }
    match record.policy() {
        None => recommendations
            .danger
            .push("Add a valid policy tag p=none, p=quarantine, or p=reject; without it the record is ignored".to_string()),
        Some(DmarcPolicy::None) => recommendations.enforcement.push(
            "Move from p=none to p=quarantine once aggregate reports show that all legitimate senders pass".to_string(),
        ),
        Some(DmarcPolicy::Quarantine) => recommendations.enforcement.push(
            "Move from p=quarantine to p=reject; consider lowering pct before moving to p=reject".to_string(),
        ),
        Some(DmarcPolicy::Reject) => {}
    }
    let enforcing = record.policy().map(|x| x.is_enforcing()).unwrap_or(false);
    if enforcing && record.percentage() < 100 {
        recommendations.enforcement.push(format!(
            "Raise pct from {} to 100 step by step so the policy applies to all failing mail",
            record.percentage()
        ));
    }

    if record.rua_emails().is_empty() {
        recommendations.reporting.push(
            "Add rua=mailto:dmarc-reports@<your-domain> to receive aggregate reports about who sends mail for the domain"
                .to_string(),
        );
    }

    if enforcing && record.dkim_alignment() == Alignment::Relaxed {
        recommendations
            .hardening
            .push("Consider strict DKIM alignment adkim=s if all mail is signed by the exact domain".to_string());
    }
    if enforcing && record.spf_alignment() == Alignment::Relaxed {
        recommendations
            .hardening
            .push("Consider strict SPF alignment aspf=s if all mail is sent from the exact domain".to_string());
    }
    if record.policy() == Some(DmarcPolicy::Reject) && record.subdomain_policy() != Some(DmarcPolicy::Reject) {
        recommendations
            .hardening
            .push("Set sp=reject to protect subdomains as well".to_string());
    }
}

fn spf(raw: &str, recommendations: &mut Recommendations) {
    let record = parse_spf_record(raw);

    if !record.version().map(|x| x.eq_ignore_ascii_case("spf1")).unwrap_or(false) {
        recommendations
            .danger
            .push("Start the record with v=spf1; receivers ignore records without it".to_string());
    }
    if record.has_all() && record.all_qualifier() == Some(Qualifier::Pass) {
        recommendations
            .danger
            .push("Replace +all with -all; +all allows anyone to send mail for the domain".to_string());
    }
    if record.dns_lookups() > crate::lints::spf::MAX_DNS_LOOKUPS {
        recommendations.danger.push(format!(
            "Reduce the number of DNS lookups from {} to at most {}, e.g. by replacing includes with ip4 and ip6 networks",
            record.dns_lookups(),
            crate::lints::spf::MAX_DNS_LOOKUPS
        ));
    }

    match record.all_qualifier() {
        Some(Qualifier::Softfail) => recommendations
            .enforcement
            .push("Switch from ~all to -all once all legitimate senders are listed".to_string()),
        Some(Qualifier::Neutral) => recommendations
            .enforcement
            .push("Replace ?all with ~all or -all; ?all does not protect the domain".to_string()),
        None if !record.has_redirect() => recommendations
            .enforcement
            .push("End the record with -all to reject mail from unlisted servers".to_string()),
        _ => {}
    }

    if record.mechanisms().iter().any(|x| x.kind() == SpfMechanismType::Ptr) {
        recommendations
            .hardening
            .push("Remove the deprecated ptr mechanism and list the sending networks with ip4 or ip6".to_string());
    }
    if !record.unknown().is_empty() {
        recommendations.hardening.push(format!(
            "Remove or fix the unknown terms {}",
            record.unknown().join(", ")
        ));
    }
}

fn dkim(raw: &str, recommendations: &mut Recommendations) {
    let record = parse_dkim_record(raw);

    match record.key_state() {
        KeyState::Missing => recommendations
            .danger
            .push("Add the public key in the p tag; signatures cannot be verified without it".to_string()),
        KeyState::Revoked => recommendations.danger.push(
            "The key is revoked; sign with a new key under a new selector and remove this record afterwards".to_string(),
        ),
        KeyState::Present => {}
    }

    if record.is_testing() {
        recommendations
            .enforcement
            .push("Remove t=y once signatures verify; verifiers ignore signatures in testing mode".to_string());
    }

    let short_key = record.key_state() == KeyState::Present
        && record.key_type() == &KeyType::Rsa
        && record
            .public_key()
            .and_then(decoded_key_len)
            .map(is_short_rsa_key)
            .unwrap_or(false);
    if short_key {
        recommendations
            .hardening
            .push("Rotate to an RSA key of at least 2048 bits".to_string());
    }
    if record.hash_algorithms().iter().any(|x| x.eq_ignore_ascii_case("sha1")) {
        recommendations
            .hardening
            .push("Restrict the hash algorithms to h=sha256".to_string());
    }
}

#[cfg(test)]
mod tests {
    use data_encoding::BASE64;
    use spectral::prelude::*;

    use super::*;

    #[test]
    fn setup_guidance_without_record() {
        crate::utils::tests::logging::init();

        for kind in RecordKind::all().iter() {
            let recommendations = get_recommendations(*kind, None);
            let blank = get_recommendations(*kind, Some("  "));

            assert_that(&recommendations).has_length(3);
            asserting("no empty suggestion")
                .that(&recommendations.iter().all(|x| !x.is_empty()))
                .is_true();
            assert_that(&blank).is_equal_to(&recommendations);
        }
        let dmarc = get_recommendations(RecordKind::Dmarc, None);
        asserting("where to publish").that(&dmarc[0].contains("_dmarc.")).is_true();
    }

    #[test]
    fn dmarc_none_to_quarantine() {
        crate::utils::tests::logging::init();

        let recommendations = get_recommendations(RecordKind::Dmarc, Some("v=DMARC1; p=none"));

        assert_that(&recommendations).has_length(2);
        asserting("enforcement first")
            .that(&recommendations[0].contains("p=quarantine"))
            .is_true();
        asserting("then reporting").that(&recommendations[1].contains("rua=")).is_true();
    }

    #[test]
    fn dmarc_quarantine_to_reject() {
        crate::utils::tests::logging::init();

        let recommendations = get_recommendations(
            RecordKind::Dmarc,
            Some("v=DMARC1; p=quarantine; pct=50; rua=mailto:dmarc@example.com"),
        );

        asserting("reject next").that(&recommendations[0].contains("p=reject")).is_true();
        asserting("raise pct").that(&recommendations[1].contains("pct")).is_true();
    }

    #[test]
    fn dmarc_strict_record_needs_nothing() {
        crate::utils::tests::logging::init();

        let recommendations = get_recommendations(
            RecordKind::Dmarc,
            Some("v=DMARC1; p=reject; sp=reject; adkim=s; aspf=s; rua=mailto:dmarc@example.com"),
        );

        assert_that(&recommendations).is_empty();
    }

    #[test]
    fn dmarc_missing_policy_is_most_urgent() {
        crate::utils::tests::logging::init();

        let recommendations = get_recommendations(RecordKind::Dmarc, Some("v=DMARC1; rua=mailto:dmarc@example.com"));

        assert_that(&recommendations).has_length(1);
        asserting("policy").that(&recommendations[0].contains("p=none")).is_true();
    }

    #[test]
    fn spf_pass_all_first() {
        crate::utils::tests::logging::init();

        let recommendations = get_recommendations(RecordKind::Spf, Some("v=spf1 ptr +all"));

        asserting("+all first").that(&recommendations[0].contains("+all")).is_true();
        asserting("ptr last")
            .that(&recommendations[recommendations.len() - 1].contains("ptr"))
            .is_true();
    }

    #[test]
    fn spf_softfail() {
        crate::utils::tests::logging::init();

        let softfail = get_recommendations(RecordKind::Spf, Some("v=spf1 mx ~all"));
        let fail = get_recommendations(RecordKind::Spf, Some("v=spf1 mx -all"));
        let redirect = get_recommendations(RecordKind::Spf, Some("v=spf1 redirect=_spf.example.com"));

        assert_that(&softfail).has_length(1);
        asserting("-all").that(&softfail[0].contains("-all")).is_true();
        assert_that(&fail).is_empty();
        assert_that(&redirect).is_empty();
    }

    #[test]
    fn dkim_revoked_and_testing() {
        crate::utils::tests::logging::init();

        let recommendations = get_recommendations(RecordKind::Dkim, Some("v=DKIM1; t=y; p="));

        assert_that(&recommendations).has_length(2);
        asserting("revoked first").that(&recommendations[0].contains("revoked")).is_true();
        asserting("testing").that(&recommendations[1].contains("t=y")).is_true();
    }

    #[test]
    fn dkim_short_key() {
        crate::utils::tests::logging::init();
        let short = format!("v=DKIM1; k=rsa; h=sha1; p={}", BASE64.encode(&[7u8; 162]));
        let long = format!("v=DKIM1; k=rsa; p={}", BASE64.encode(&[7u8; 294]));

        let recommendations = get_recommendations(RecordKind::Dkim, Some(&short));

        assert_that(&recommendations).has_length(2);
        asserting("rotate").that(&recommendations[0].contains("2048")).is_true();
        assert_that(&get_recommendations(RecordKind::Dkim, Some(&long))).is_empty();
    }
}
