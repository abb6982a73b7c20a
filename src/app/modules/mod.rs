// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::app::console::Console;
use crate::app::AppConfig;

pub mod check;
pub mod parse;
pub mod recommend;

/** Pass environment like configs and console access to a module's steps
 */
pub struct Environment<'a, T> {
    pub app_config: &'a AppConfig,
    pub mod_config: &'a T,
    pub console: Console,
}

impl<'a, T> Environment<'a, T> {
    pub fn new(app_config: &'a AppConfig, mod_config: &'a T) -> Environment<'a, T> {
        let console = Console::new(app_config.into());
        Environment {
            app_config,
            mod_config,
            console,
        }
    }
}
