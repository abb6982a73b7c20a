// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Validators for DMARC, SPF, and DKIM records.
//!
//! Validators work on the raw record and never fail; every finding, including a missing record, is reported as a
//! [`ValidationIssue`]. Their severity is independent of the [`TagStatus`](crate::records::TagStatus) of the parsed
//! tags.

use std::fmt;

use serde::Serialize;

pub mod dkim;
pub mod dmarc;
pub mod spf;

pub use dkim::validate_dkim_record;
pub use dmarc::validate_dmarc_record;
pub use spf::validate_spf_record;

use crate::records::RecordKind;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let str = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(str)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct ValidationIssue {
    severity: Severity,
    field: Option<String>,
    message: String,
}

impl ValidationIssue {
    pub fn new<T: Into<String>>(severity: Severity, message: T) -> ValidationIssue {
        ValidationIssue {
            severity,
            field: None,
            message: message.into(),
        }
    }

    pub fn error<T: Into<String>>(message: T) -> ValidationIssue {
        ValidationIssue::new(Severity::Error, message)
    }

    pub fn warning<T: Into<String>>(message: T) -> ValidationIssue {
        ValidationIssue::new(Severity::Warning, message)
    }

    pub fn info<T: Into<String>>(message: T) -> ValidationIssue {
        ValidationIssue::new(Severity::Info, message)
    }

    pub fn with_field<T: Into<String>>(self, field: T) -> ValidationIssue {
        ValidationIssue {
            field: Some(field.into()),
            ..self
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{} [{}]: {}", self.severity, field, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Summarizes a set of validation issues.
pub trait Issues {
    fn has_errors(&self) -> bool;
    fn has_warnings(&self) -> bool;
    fn max_severity(&self) -> Option<Severity>;
}

impl Issues for [ValidationIssue] {
    fn has_errors(&self) -> bool {
        self.iter().any(ValidationIssue::is_error)
    }

    fn has_warnings(&self) -> bool {
        self.iter().any(ValidationIssue::is_warning)
    }

    fn max_severity(&self) -> Option<Severity> {
        self.iter().map(ValidationIssue::severity).max()
    }
}

/// Dispatches to the validator of `kind`.
pub fn validate_record(kind: RecordKind, raw: &str) -> Vec<ValidationIssue> {
    match kind {
        RecordKind::Dmarc => validate_dmarc_record(raw),
        RecordKind::Spf => validate_spf_record(raw),
        RecordKind::Dkim => validate_dkim_record(raw),
    }
}

#[cfg(test)]
mod tests {
    use spectral::prelude::*;

    use super::*;

    #[test]
    fn issues_summary() {
        crate::utils::tests::logging::init();
        let issues = vec![
            ValidationIssue::info("a"),
            ValidationIssue::warning("b").with_field("p"),
        ];

        asserting("no errors").that(&issues.has_errors()).is_false();
        asserting("warnings").that(&issues.has_warnings()).is_true();
        assert_that(&issues.max_severity()).is_equal_to(Some(Severity::Warning));
        assert_that(&issues[1].field()).is_equal_to(Some("p"));
    }

    #[test]
    fn display() {
        crate::utils::tests::logging::init();

        let issue = ValidationIssue::error("Missing required tag").with_field("p");

        assert_that(&issue.to_string()).is_equal_to("error [p]: Missing required tag".to_string());
    }

    #[test]
    fn empty_input_never_panics() {
        crate::utils::tests::logging::init();

        for kind in RecordKind::all().iter() {
            for raw in &["", ";", ";;=;", "=", "v=", "\0", " ; p ; = ;"] {
                let _ = validate_record(*kind, raw);
            }
        }
    }
}
