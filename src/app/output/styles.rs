// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::SeqCst;

use lazy_static::lazy_static;
use yansi::Style;

static ASCII_MODE: AtomicBool = AtomicBool::new(false);

pub fn ascii_mode() {
    ASCII_MODE.store(true, SeqCst);
}

pub fn no_color_mode() {
    yansi::disable();
}

pub static ATTENTION: Style = Style::new().yellow().bold();
pub static ERROR: Style = Style::new().red().bold();
pub static EMPH: Style = Style::new().white().bold();
pub static OK: Style = Style::new().green().bold();
pub static INFO: Style = Style::new().cyan().bold();

fn prefix(ascii: &str, unicode: &str) -> String {
    (if ASCII_MODE.load(SeqCst) { ascii } else { unicode }).to_string()
}

// Must not be dereferenced before `ascii_mode` has been set
lazy_static! {
    pub static ref ATTENTION_PREFIX: String = prefix("!", "⚠︎");
    pub static ref CAPTION_PREFIX: String = prefix(">", "▶︎");
    pub static ref ERROR_PREFIX: String = prefix("!", "⚡︎");
    pub static ref INFO_PREFIX: String = prefix("-", "▸");
    pub static ref ITEMAZATION_PREFIX: String = prefix("*", "∙");
    pub static ref FINISHED_PREFIX: String = prefix("+", "❖");
    pub static ref OK_PREFIX: String = prefix("=", "✓");
}
