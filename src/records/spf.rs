// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! SPF records, cf. RFC 7208.

use std::fmt;

use nom::Err;
use serde::Serialize;
use tracing::{debug, trace};

use crate::records::tokenizer::{tokenize, Grammar};
use crate::records::{describe, ParsedTag, TagStatus};
use crate::{Error, Result};

static ALL_QUALIFIERS: &[(&str, &str)] = &[
    ("-", "Hard fail; mail from all other servers must be rejected"),
    ("~", "Soft fail; mail from all other servers should be marked as suspicious"),
    ("?", "Neutral; no statement about other servers, nothing is enforced"),
    ("+", "Pass; every server on the internet may send mail for this domain"),
];

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize)]
pub enum Qualifier {
    // +
    #[serde(rename = "+")]
    Pass,
    // ?
    #[serde(rename = "?")]
    Neutral,
    // ~
    #[serde(rename = "~")]
    Softfail,
    // -
    #[serde(rename = "-")]
    Fail,
}

impl Qualifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Qualifier::Pass => "+",
            Qualifier::Neutral => "?",
            Qualifier::Softfail => "~",
            Qualifier::Fail => "-",
        }
    }
}

impl From<Option<char>> for Qualifier {
    fn from(c_opt: Option<char>) -> Self {
        match c_opt {
            Some('?') => Qualifier::Neutral,
            Some('~') => Qualifier::Softfail,
            Some('-') => Qualifier::Fail,
            Some(_) | None => Qualifier::Pass,
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single whitespace delimited term of an SPF record
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SpfTerm<'a> {
    Version(&'a str),
    Mechanism(Qualifier, Mechanism<'a>),
    Modifier(Modifier<'a>),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Mechanism<'a> {
    All,
    A {
        domain_spec: Option<&'a str>,
        cidr_len: Option<&'a str>,
    },
    IPv4(&'a str),
    IPv6(&'a str),
    MX {
        domain_spec: Option<&'a str>,
        cidr_len: Option<&'a str>,
    },
    PTR(Option<&'a str>),
    Exists(&'a str),
    Include(&'a str),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Modifier<'a> {
    Redirect(&'a str),
    Exp(&'a str),
}

#[allow(clippy::should_implement_trait)]
impl<'a> SpfTerm<'a> {
    /// Strictly parses a single term; prefixes are matched case-insensitively, values keep their case.
    pub fn from_str(txt: &'a str) -> Result<SpfTerm<'a>> {
        match parser::term(txt) {
            Ok((_, term)) => Ok(term),
            Err(Err::Incomplete(_)) => Err(Error::ParserError {
                what: txt.to_string(),
                to: "SPF term",
                why: "input is incomplete".to_string(),
            }),
            Err(Err::Error(e)) | Err(Err::Failure(e)) => Err(Error::ParserError {
                what: txt.to_string(),
                to: "SPF term",
                why: format!("{} at '{}'", e.code.description(), e.input),
            }),
        }
    }

    /// Counts against the limit of 10 DNS lookups; cf. RFC 7208, section 4.6.4
    pub fn is_dns_lookup(&self) -> bool {
        matches!(
            self,
            SpfTerm::Mechanism(_, Mechanism::A { .. })
                | SpfTerm::Mechanism(_, Mechanism::MX { .. })
                | SpfTerm::Mechanism(_, Mechanism::PTR(_))
                | SpfTerm::Mechanism(_, Mechanism::Exists(_))
                | SpfTerm::Mechanism(_, Mechanism::Include(_))
                | SpfTerm::Modifier(Modifier::Redirect(_))
        )
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpfMechanismType {
    Include,
    A,
    Mx,
    Ptr,
    Ip4,
    Ip6,
    Exists,
    Redirect,
    Exp,
}

impl SpfMechanismType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpfMechanismType::Include => "include",
            SpfMechanismType::A => "a",
            SpfMechanismType::Mx => "mx",
            SpfMechanismType::Ptr => "ptr",
            SpfMechanismType::Ip4 => "ip4",
            SpfMechanismType::Ip6 => "ip6",
            SpfMechanismType::Exists => "exists",
            SpfMechanismType::Redirect => "redirect",
            SpfMechanismType::Exp => "exp",
        }
    }

    pub fn is_dns_lookup(&self) -> bool {
        matches!(
            self,
            SpfMechanismType::Include
                | SpfMechanismType::A
                | SpfMechanismType::Mx
                | SpfMechanismType::Ptr
                | SpfMechanismType::Exists
                | SpfMechanismType::Redirect
        )
    }
}

impl fmt::Display for SpfMechanismType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct SpfMechanism {
    #[serde(rename = "type")]
    kind: SpfMechanismType,
    qualifier: Qualifier,
    value: String,
}

impl SpfMechanism {
    pub fn new<T: Into<String>>(kind: SpfMechanismType, qualifier: Qualifier, value: T) -> SpfMechanism {
        SpfMechanism {
            kind,
            qualifier,
            value: value.into(),
        }
    }

    pub fn kind(&self) -> SpfMechanismType {
        self.kind
    }

    pub fn qualifier(&self) -> Qualifier {
        self.qualifier
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize)]
pub struct SpfRecord {
    version: Option<String>,
    mechanisms: Vec<SpfMechanism>,
    has_all: bool,
    all_qualifier: Option<Qualifier>,
    unknown: Vec<String>,
    tags: Vec<ParsedTag>,
}

impl SpfRecord {
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// All mechanisms and modifiers except `all` in record order
    pub fn mechanisms(&self) -> &[SpfMechanism] {
        &self.mechanisms
    }

    pub fn has_all(&self) -> bool {
        self.has_all
    }

    /// Qualifier of the last `all` mechanism
    pub fn all_qualifier(&self) -> Option<Qualifier> {
        self.all_qualifier
    }

    pub fn has_redirect(&self) -> bool {
        self.mechanisms.iter().any(|x| x.kind == SpfMechanismType::Redirect)
    }

    /// Terms that could not be parsed
    pub fn unknown(&self) -> &[String] {
        &self.unknown
    }

    /// Syntactic count of terms causing DNS lookups; nested includes are not resolved
    pub fn dns_lookups(&self) -> usize {
        self.mechanisms.iter().filter(|x| x.kind.is_dns_lookup()).count()
    }

    pub fn tags(&self) -> &[ParsedTag] {
        &self.tags
    }
}

/// Parses an SPF TXT record value, already stripped of surrounding quotes.
pub fn parse_spf_record(raw: &str) -> SpfRecord {
    let mut record = SpfRecord::default();

    for token in tokenize(raw, Grammar::Whitespace) {
        let word = token.key();
        trace!("Parsing SPF term '{}'.", word);
        match SpfTerm::from_str(word) {
            Ok(term) => apply(&mut record, &term),
            Err(err) => {
                debug!("Ignoring unknown SPF term: {}", err);
                record.unknown.push(word.to_string());
                record
                    .tags
                    .push(ParsedTag::new(word, word, "Unknown mechanism", TagStatus::Info));
            }
        }
    }
    debug!("Parsed SPF record with {} tags.", record.tags.len());

    record
}

fn apply(record: &mut SpfRecord, term: &SpfTerm) {
    let (tag, mechanism) = match term {
        SpfTerm::Version(version) => {
            record.version.get_or_insert_with(|| version.to_string());
            (version_tag(version), None)
        }
        SpfTerm::Mechanism(qualifier, mechanism) => match mechanism_value(mechanism) {
            Some((kind, value)) => {
                let tag = mechanism_tag(kind, &value);
                (tag, Some(SpfMechanism::new(kind, *qualifier, value)))
            }
            None => {
                record.has_all = true;
                record.all_qualifier = Some(*qualifier);
                (all_tag(*qualifier), None)
            }
        },
        SpfTerm::Modifier(Modifier::Redirect(domain)) => (
            ParsedTag::new(
                "redirect",
                *domain,
                format!("Replaced by the SPF policy of {}", domain),
                TagStatus::Warning,
            ),
            Some(SpfMechanism::new(SpfMechanismType::Redirect, Qualifier::Pass, *domain)),
        ),
        SpfTerm::Modifier(Modifier::Exp(domain)) => (
            ParsedTag::new(
                "exp",
                *domain,
                format!("Explanation for rejected mail is published at {}", domain),
                TagStatus::Info,
            ),
            Some(SpfMechanism::new(SpfMechanismType::Exp, Qualifier::Pass, *domain)),
        ),
    };
    record.tags.push(tag);
    if let Some(mechanism) = mechanism {
        record.mechanisms.push(mechanism);
    }
}

/// Type and display value of a mechanism; `all` carries no value.
fn mechanism_value(mechanism: &Mechanism) -> Option<(SpfMechanismType, String)> {
    fn with_cidr(domain_spec: Option<&str>, cidr_len: Option<&str>) -> String {
        format!("{}{}", domain_spec.unwrap_or("self"), cidr_len.unwrap_or(""))
    }

    let value = match mechanism {
        Mechanism::All => return None,
        Mechanism::A { domain_spec, cidr_len } => (SpfMechanismType::A, with_cidr(*domain_spec, *cidr_len)),
        Mechanism::MX { domain_spec, cidr_len } => (SpfMechanismType::Mx, with_cidr(*domain_spec, *cidr_len)),
        Mechanism::IPv4(network) => (SpfMechanismType::Ip4, network.to_string()),
        Mechanism::IPv6(network) => (SpfMechanismType::Ip6, network.to_string()),
        Mechanism::PTR(domain_spec) => (SpfMechanismType::Ptr, domain_spec.unwrap_or("self").to_string()),
        Mechanism::Exists(domain_spec) => (SpfMechanismType::Exists, domain_spec.to_string()),
        Mechanism::Include(domain_spec) => (SpfMechanismType::Include, domain_spec.to_string()),
    };
    Some(value)
}

fn version_tag(version: &str) -> ParsedTag {
    if version.eq_ignore_ascii_case("spf1") {
        ParsedTag::new("v", version, "SPF version 1", TagStatus::Good)
    } else {
        ParsedTag::new(
            "v",
            version,
            format!("Unsupported SPF version '{}'; expected spf1", version),
            TagStatus::Error,
        )
    }
}

fn all_tag(qualifier: Qualifier) -> ParsedTag {
    let status = match qualifier {
        Qualifier::Fail => TagStatus::Good,
        Qualifier::Softfail | Qualifier::Neutral => TagStatus::Warning,
        Qualifier::Pass => TagStatus::Error,
    };
    let description = describe(ALL_QUALIFIERS, qualifier.as_str()).unwrap_or("All other servers");
    ParsedTag::new("all", format!("{}all", qualifier), description, status)
}

fn mechanism_tag(kind: SpfMechanismType, value: &str) -> ParsedTag {
    let target = if value == "self" || value.starts_with("self/") {
        "this domain"
    } else {
        value
    };
    let (description, status) = match kind {
        SpfMechanismType::Include => (format!("Authorizes the senders of {}", value), TagStatus::Info),
        SpfMechanismType::A => (format!("Authorizes the A/AAAA addresses of {}", target), TagStatus::Info),
        SpfMechanismType::Mx => (format!("Authorizes the mail servers (MX) of {}", target), TagStatus::Info),
        SpfMechanismType::Ip4 => (format!("Authorizes the IPv4 addresses {}", value), TagStatus::Info),
        SpfMechanismType::Ip6 => (format!("Authorizes the IPv6 addresses {}", value), TagStatus::Info),
        SpfMechanismType::Exists => (format!("Authorizes if {} resolves", value), TagStatus::Info),
        SpfMechanismType::Ptr => (
            "PTR is deprecated, slow, and unreliable; cf. RFC 7208, section 5.5".to_string(),
            TagStatus::Warning,
        ),
        SpfMechanismType::Redirect | SpfMechanismType::Exp => (String::new(), TagStatus::Info),
    };
    ParsedTag::new(kind.as_str(), value, description, status)
}

/// SPF term parser -- cf. https://tools.ietf.org/html/rfc7208#section-12
pub(crate) mod parser {
    use nom::branch::alt;
    use nom::bytes::complete::{tag_no_case, take_while1};
    use nom::character::complete::{char, one_of};
    use nom::combinator::{all_consuming, map, opt, recognize, rest};
    use nom::sequence::preceded;
    use nom::IResult;

    use super::{Mechanism, Modifier, Qualifier, SpfTerm};

    pub fn term(input: &str) -> IResult<&str, SpfTerm> {
        all_consuming(alt((version, spf_modifier, spf_mechanism_with_qualifier)))(input)
    }

    fn version(input: &str) -> IResult<&str, SpfTerm> {
        let (input, _) = tag_no_case("v=")(input)?;
        let (input, version) = rest(input)?;

        Ok((input, SpfTerm::Version(version)))
    }

    fn spf_mechanism_with_qualifier(input: &str) -> IResult<&str, SpfTerm> {
        let (input, qualifier) = map(opt(one_of("+?~-")), Qualifier::from)(input)?;
        let (input, mechanism) = spf_mechanism(input)?;

        Ok((input, SpfTerm::Mechanism(qualifier, mechanism)))
    }

    fn spf_mechanism(input: &str) -> IResult<&str, Mechanism> {
        alt((
            spf_mechanism_all,
            spf_mechanism_include,
            spf_mechanism_a,
            spf_mechanism_mx,
            spf_mechanism_ptr,
            spf_mechanism_ip4,
            spf_mechanism_ip6,
            spf_mechanism_exists,
        ))(input)
    }

    fn spf_mechanism_all(input: &str) -> IResult<&str, Mechanism> {
        let (input, _) = all_consuming(tag_no_case("all"))(input)?;
        Ok((input, Mechanism::All))
    }

    fn spf_mechanism_a(input: &str) -> IResult<&str, Mechanism> {
        let (input, _) = tag_no_case("a")(input)?;
        let (input, domain_spec) = opt(domain_spec)(input)?;
        let (input, cidr_len) = opt(cidr_len)(input)?;
        Ok((input, Mechanism::A { domain_spec, cidr_len }))
    }

    fn spf_mechanism_mx(input: &str) -> IResult<&str, Mechanism> {
        let (input, _) = tag_no_case("mx")(input)?;
        let (input, domain_spec) = opt(domain_spec)(input)?;
        let (input, cidr_len) = opt(cidr_len)(input)?;
        Ok((input, Mechanism::MX { domain_spec, cidr_len }))
    }

    fn domain_spec(input: &str) -> IResult<&str, &str> {
        preceded(char(':'), take_while1(|c: char| c != '/'))(input)
    }

    /// Keeps the leading slash as well as dual CIDR lengths like `/24//64`
    fn cidr_len(input: &str) -> IResult<&str, &str> {
        recognize(preceded(char('/'), rest))(input)
    }

    fn spf_mechanism_ptr(input: &str) -> IResult<&str, Mechanism> {
        let (input, _) = tag_no_case("ptr")(input)?;
        let (input, domain_spec) = opt(domain_spec)(input)?;
        Ok((input, Mechanism::PTR(domain_spec)))
    }

    fn spf_mechanism_ip4(input: &str) -> IResult<&str, Mechanism> {
        let (input, ipv4) = preceded(tag_no_case("ip4:"), rest)(input)?;
        Ok((input, Mechanism::IPv4(ipv4)))
    }

    fn spf_mechanism_ip6(input: &str) -> IResult<&str, Mechanism> {
        let (input, ipv6) = preceded(tag_no_case("ip6:"), rest)(input)?;
        Ok((input, Mechanism::IPv6(ipv6)))
    }

    fn spf_mechanism_exists(input: &str) -> IResult<&str, Mechanism> {
        let (input, domain_spec) = preceded(tag_no_case("exists:"), take_while1(|_: char| true))(input)?;
        Ok((input, Mechanism::Exists(domain_spec)))
    }

    fn spf_mechanism_include(input: &str) -> IResult<&str, Mechanism> {
        let (input, domain_spec) = preceded(tag_no_case("include:"), take_while1(|_: char| true))(input)?;
        Ok((input, Mechanism::Include(domain_spec)))
    }

    fn spf_modifier(input: &str) -> IResult<&str, SpfTerm> {
        let (input, modifier) = alt((spf_modifier_redirect, spf_modifier_exp))(input)?;

        Ok((input, SpfTerm::Modifier(modifier)))
    }

    fn spf_modifier_redirect(input: &str) -> IResult<&str, Modifier> {
        let (input, domain_spec) = preceded(tag_no_case("redirect="), take_while1(|_: char| true))(input)?;
        Ok((input, Modifier::Redirect(domain_spec)))
    }

    fn spf_modifier_exp(input: &str) -> IResult<&str, Modifier> {
        let (input, domain_spec) = preceded(tag_no_case("exp="), take_while1(|_: char| true))(input)?;
        Ok((input, Modifier::Exp(domain_spec)))
    }
}
