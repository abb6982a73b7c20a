// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use spectral::prelude::*;

use dnsauth::records::{KeyState, Qualifier, SpfMechanismType};
use dnsauth::{
    get_recommendations, parse_dkim_record, parse_dmarc_record, parse_spf_record, validate_record, RecordKind,
    Severity, TagStatus,
};

const RECORDS: &[(RecordKind, &str)] = &[
    (RecordKind::Dmarc, "v=DMARC1; p=reject; pct=100; rua=mailto:dmarc@example.com"),
    (RecordKind::Dmarc, "v=DMARC1;;; p=;=none; pct=abc; ri=-1"),
    (RecordKind::Spf, "v=spf1 ip4:192.0.2.0/24 include:_spf.example.com -all"),
    (RecordKind::Spf, "v=spf1 ip4:999.1.1.1 ptr +all garbage ~"),
    (RecordKind::Dkim, "v=DKIM1; k=rsa; p=MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQC"),
    (RecordKind::Dkim, "v=DKIM1; k=; p=; t=y:s; h=sha1"),
];

#[test]
fn parsing_is_idempotent() {
    for (kind, record) in RECORDS {
        let first = match kind {
            RecordKind::Dmarc => parse_dmarc_record(record).tags().to_vec(),
            RecordKind::Spf => parse_spf_record(record).tags().to_vec(),
            RecordKind::Dkim => parse_dkim_record(record).tags().to_vec(),
        };
        let second = match kind {
            RecordKind::Dmarc => parse_dmarc_record(record).tags().to_vec(),
            RecordKind::Spf => parse_spf_record(record).tags().to_vec(),
            RecordKind::Dkim => parse_dkim_record(record).tags().to_vec(),
        };
        assert_that(&first).is_equal_to(&second);
    }
}

#[test]
fn dmarc_tags_keep_record_order() {
    let dmarc = parse_dmarc_record("v=DMARC1; p=reject; pct=100; rua=mailto:dmarc@example.com");

    let names: Vec<_> = dmarc.tags().iter().map(|x| x.tag()).collect();

    assert_that(&names).is_equal_to(vec!["v", "p", "pct", "rua"]);
    assert_that(&dmarc.rua_emails().to_vec()).is_equal_to(vec!["dmarc@example.com".to_string()]);
}

#[test]
fn dmarc_percentage() {
    let full = parse_dmarc_record("v=DMARC1; p=reject; pct=100");
    let partial = parse_dmarc_record("v=DMARC1; p=reject; pct=99");
    let absent = parse_dmarc_record("v=DMARC1; p=reject");

    let pct_status = |tags: &[dnsauth::ParsedTag]| tags.iter().find(|x| x.tag() == "pct").map(|x| x.status());

    assert_that(&pct_status(full.tags())).is_equal_to(Some(TagStatus::Good));
    assert_that(&pct_status(partial.tags())).is_equal_to(Some(TagStatus::Warning));
    assert_that(&pct_status(absent.tags())).is_none();
    assert_that(&absent.percentage()).is_equal_to(100);
}

#[test]
fn dkim_revoked_key() {
    let dkim = parse_dkim_record("v=DKIM1; k=rsa; p=");

    let p = dkim.tags().iter().find(|x| x.tag() == "p");

    assert_that(&p.map(|x| x.value())).is_equal_to(Some("(revoked)"));
    assert_that(&p.map(|x| x.status())).is_equal_to(Some(TagStatus::Error));
    assert_that(&dkim.key_state()).is_equal_to(KeyState::Revoked);

    let issues = validate_record(RecordKind::Dkim, "v=DKIM1; k=rsa; p=");
    assert_that(&issues.iter().any(|x| x.severity() == Severity::Error)).is_true();
}

#[test]
fn spf_hard_fail_all() {
    let spf = parse_spf_record("v=spf1 ip4:192.0.2.0/24 -all");

    let all: Vec<_> = spf.tags().iter().filter(|x| x.tag() == "all").collect();

    assert_that(&all).has_length(1);
    assert_that(&all[0].status()).is_equal_to(TagStatus::Good);
    assert_that(&spf.all_qualifier()).is_equal_to(Some(Qualifier::Fail));
}

#[test]
fn spf_pass_all_is_an_error() {
    let spf = parse_spf_record("v=spf1 +all");

    let all = spf.tags().iter().find(|x| x.tag() == "all");
    assert_that(&all.map(|x| x.status())).is_equal_to(Some(TagStatus::Error));

    let issues = validate_record(RecordKind::Spf, "v=spf1 +all");
    assert_that(&issues.iter().any(|x| x.severity() == Severity::Error)).is_true();
}

#[test]
fn spf_ip4_value_is_preserved() {
    let spf = parse_spf_record("v=spf1 ip4:192.0.2.0/24 -all");

    let ip4 = spf.mechanisms().iter().find(|x| x.kind() == SpfMechanismType::Ip4);
    let tag = spf.tags().iter().find(|x| x.tag() == "ip4");

    assert_that(&ip4.map(|x| x.value())).is_equal_to(Some("192.0.2.0/24"));
    assert_that(&tag.map(|x| x.value())).is_equal_to(Some("192.0.2.0/24"));
}

#[test]
fn validators_never_panic() {
    let junk = [
        "",
        " ",
        ";",
        "=",
        "v=",
        "v=DMARC1; p",
        "v=spf1 ip4:/ ip6:: a:/ mx// include: redirect= exp=",
        "v=DKIM1; p=!!!; k=ed25519",
        "\u{1F4E7}=\u{1F4E7}; \u{00e4}=\u{00f6}",
        "v=spf1 ?",
    ];
    for kind in RecordKind::all() {
        for record in junk {
            let _ = validate_record(kind, record);
            let _ = get_recommendations(kind, Some(record));
        }
    }
}

#[test]
fn missing_records_get_setup_recommendations() {
    for kind in RecordKind::all() {
        let absent = get_recommendations(kind, None);
        let blank = get_recommendations(kind, Some("  "));

        assert_that(&absent.is_empty()).is_false();
        assert_that(&blank).is_equal_to(&absent);
    }
}

#[test]
fn strict_dmarc_has_no_errors() {
    let issues = validate_record(
        RecordKind::Dmarc,
        "v=DMARC1; p=reject; sp=reject; adkim=s; aspf=s; rua=mailto:dmarc@example.com",
    );

    assert_that(&issues.iter().any(|x| x.is_error())).is_false();
}
