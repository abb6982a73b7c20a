// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::fmt;
use std::time::Duration;

use yansi::Painted;

use crate::app::output::styles::{self, CAPTION_PREFIX, ERROR_PREFIX, FINISHED_PREFIX, INFO_PREFIX};
use crate::app::output::OutputType;
use crate::app::AppConfig;

#[derive(Debug, Default)]
pub struct ConsoleOpts {
    quiet: bool,
}

impl From<&AppConfig> for ConsoleOpts {
    fn from(app_config: &AppConfig) -> Self {
        // Anything but results would break JSON output
        ConsoleOpts {
            quiet: app_config.quiet || app_config.output == OutputType::Json,
        }
    }
}

#[derive(Debug)]
pub struct Console {
    opts: ConsoleOpts,
}

impl Console {
    pub fn new(opts: ConsoleOpts) -> Console {
        Console { opts }
    }

    pub fn print_lookup_options(&self, app_config: &AppConfig) {
        if self.not_quiet() {
            let nameservers = if app_config.nameservers.is_empty() {
                "system".to_string()
            } else {
                app_config
                    .nameservers
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            };
            self.caption(format!(
                "{}: nameservers={}, timeout={}s",
                Fmt::emph("Options"),
                nameservers,
                app_config.timeout.as_secs(),
            ));
        }
    }

    pub fn print_caption<T: AsRef<str>>(&self, str: T) {
        if self.not_quiet() {
            self.caption(str);
        }
    }

    pub fn print_run_time(&self, total_run_time: Duration) {
        if self.not_quiet() {
            self.info(format!("Received responses within {} ms.", total_run_time.as_millis()));
        }
    }

    pub fn print_failed<T: AsRef<str>>(&self, str: T) {
        if self.not_quiet() {
            self.failed(str);
        }
    }

    pub fn print_finished(&self) {
        if self.not_quiet() {
            self.finished();
        }
    }

    pub fn emphasize<T: fmt::Display>(&self, item: T) {
        println!("{}", Fmt::emph(item))
    }

    pub fn info<T: AsRef<str>>(&self, str: T) {
        println!("{} {}", &*INFO_PREFIX, str.as_ref());
    }

    pub fn finished(&self) {
        self.emphasize(format!("{} Finished.", &*FINISHED_PREFIX));
    }

    pub fn caption<T: AsRef<str>>(&self, str: T) {
        self.emphasize(format!("{} {}", &*CAPTION_PREFIX, str.as_ref()));
    }

    pub fn failed<T: AsRef<str>>(&self, str: T) {
        println!("{} {}", Fmt::error(&*ERROR_PREFIX), str.as_ref());
    }

    pub fn error<T: AsRef<str>>(&self, str: T) {
        eprintln!("{} {}", Fmt::error(&*ERROR_PREFIX), str.as_ref());
    }

    pub fn not_quiet(&self) -> bool {
        !self.opts.quiet
    }
}

pub struct Fmt {}

impl Fmt {
    pub fn emph<T: fmt::Display>(item: T) -> Painted<T> {
        Painted {
            value: item,
            style: styles::EMPH,
        }
    }

    pub fn error<T: fmt::Display>(item: T) -> Painted<T> {
        Painted {
            value: item,
            style: styles::ERROR,
        }
    }
}
