// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! dnsauth parses, lints, and explains the DNS records that authenticate email: DMARC, SPF, and DKIM.
//!
//! Parsers and validators are pure functions of the record string and never fail. Looking up the
//! records of a domain is done by [`check::check_domain`] using a [`lookup::TxtLookup`].

pub use error::Error;
pub use lints::{validate_dkim_record, validate_dmarc_record, validate_record, validate_spf_record};
pub use lints::{Issues, Severity, ValidationIssue};
pub use recommendations::get_recommendations;
pub use records::{parse_dkim_record, parse_dmarc_record, parse_spf_record, ParsedTag, RecordKind, TagStatus};

#[cfg(feature = "app-cli")]
pub mod app;
pub mod check;
pub mod error;
pub mod lints;
pub mod lookup;
pub mod recommendations;
pub mod records;
pub mod utils;

pub type Result<T> = std::result::Result<T, Error>;
