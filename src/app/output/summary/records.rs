// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::io::Write;

use tabwriter::TabWriter;
use yansi::Paint;

use super::*;
use crate::app::modules::recommend::Advice;
use crate::app::output::styles::{
    self, ATTENTION_PREFIX, CAPTION_PREFIX, ERROR_PREFIX, INFO_PREFIX, ITEMAZATION_PREFIX, OK_PREFIX,
};
use crate::check::{DomainCheck, RecordCheck};
use crate::lints::{Severity, ValidationIssue};
use crate::records::{ParsedTag, TagStatus};

impl SummaryFormatter for RecordCheck {
    fn output<W: Write>(&self, writer: &mut W, opts: &SummaryOptions) -> Result<()> {
        let mut tw = TabWriter::new(vec![]);
        output_record_check(&mut tw, self, opts)?;
        flush(tw, writer)
    }
}

impl SummaryFormatter for DomainCheck {
    fn output<W: Write>(&self, writer: &mut W, opts: &SummaryOptions) -> Result<()> {
        let mut tw = TabWriter::new(vec![]);
        for check in self.checks() {
            output_record_check(&mut tw, check, opts)?;
        }
        flush(tw, writer)
    }
}

impl SummaryFormatter for Advice {
    fn output<W: Write>(&self, writer: &mut W, _: &SummaryOptions) -> Result<()> {
        let caption = match self.record() {
            Some(_) => format!("Recommendations for {} record", self.kind()),
            None => format!("Setting up a {} record", self.kind()),
        };
        writeln!(writer, "{} {}", (*CAPTION_PREFIX).paint(styles::EMPH), caption.paint(styles::EMPH))?;
        if self.recommendations().is_empty() {
            writeln!(writer, "{} Nothing to improve.", (*OK_PREFIX).paint(styles::OK))?;
        }
        for (pos, recommendation) in self.recommendations().iter().enumerate() {
            writeln!(writer, "{:>2}. {}", pos + 1, recommendation)?;
        }

        Ok(())
    }
}

fn output_record_check<W: Write>(writer: &mut W, check: &RecordCheck, opts: &SummaryOptions) -> Result<()> {
    let caption = match check.name() {
        Some(name) => format!("{} record at {}", check.kind(), name),
        None => format!("{} record", check.kind()),
    };
    writeln!(writer, "{} {}", (*CAPTION_PREFIX).paint(styles::EMPH), caption.paint(styles::EMPH))?;

    if !opts.condensed() {
        if let Some(record) = check.record() {
            writeln!(writer, "  {}", record)?;
        }
        for tag in check.tags() {
            writeln!(writer, "{}", tag.render(opts))?;
        }
    }

    if check.issues().is_empty() {
        writeln!(writer, "{} No issues found.", (*OK_PREFIX).paint(styles::OK))?;
    }
    for issue in check.issues() {
        writeln!(writer, "{}", issue.render(opts))?;
    }

    if !check.recommendations().is_empty() {
        writeln!(writer, "{} Recommendations:", &*INFO_PREFIX)?;
    }
    for recommendation in check.recommendations() {
        writeln!(writer, " {} {}", &*ITEMAZATION_PREFIX, recommendation)?;
    }

    Ok(())
}

fn flush<W: Write>(tw: TabWriter<Vec<u8>>, writer: &mut W) -> Result<()> {
    let text_buffer = tw.into_inner().map_err(|_| Error::InternalError {
        msg: "finish TabWriter buffer",
    })?;
    let out = String::from_utf8(text_buffer).map_err(|_| Error::InternalError {
        msg: "convert TabWriter buffer to output",
    })?;
    write!(writer, "{}", out)?;

    Ok(())
}

impl Rendering for ParsedTag {
    fn render(&self, _: &SummaryOptions) -> String {
        let prefix = match self.status() {
            TagStatus::Good => (*OK_PREFIX).paint(styles::OK),
            TagStatus::Warning => (*ATTENTION_PREFIX).paint(styles::ATTENTION),
            TagStatus::Error => (*ERROR_PREFIX).paint(styles::ERROR),
            TagStatus::Info => (*INFO_PREFIX).paint(styles::INFO),
        };
        format!("{} {}\t{}\t{}", prefix, self.tag(), self.value(), self.description())
    }
}

impl Rendering for ValidationIssue {
    fn render(&self, _: &SummaryOptions) -> String {
        let prefix = match self.severity() {
            Severity::Error => (*ERROR_PREFIX).paint(styles::ERROR),
            Severity::Warning => (*ATTENTION_PREFIX).paint(styles::ATTENTION),
            Severity::Info => (*INFO_PREFIX).paint(styles::INFO),
        };
        format!("{} {}", prefix, self)
    }
}
