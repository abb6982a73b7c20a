// Copyright 2017-2021 Lukas Pustina <lukas@pustina.de>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use serde::Serialize;

/// Delimiter convention of a record grammar.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Grammar {
    /// `tag=value` pairs delimited by `;` as used by DMARC and DKIM
    Semicolon,
    /// Self-describing terms delimited by whitespace as used by SPF
    Whitespace,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub enum Token {
    Pair { key: String, value: String },
    Word(String),
}

impl Token {
    /// Key of a pair or the whole word
    pub fn key(&self) -> &str {
        match self {
            Token::Pair { key, .. } => key,
            Token::Word(word) => word,
        }
    }

    /// Value of a pair; words have no value
    pub fn value(&self) -> &str {
        match self {
            Token::Pair { value, .. } => value,
            Token::Word(_) => "",
        }
    }
}

/// Splits a raw record into its tokens. Never fails; empty input yields no tokens.
pub fn tokenize(raw: &str, grammar: Grammar) -> Vec<Token> {
    let tokens = match grammar {
        Grammar::Semicolon => parser::tag_list(raw),
        Grammar::Whitespace => parser::word_list(raw),
    };
    // Both parsers accept any input; an error here means a bug in the combinators.
    tokens.map(|(_, tokens)| tokens).unwrap_or_default()
}

pub(crate) mod parser {
    use nom::bytes::complete::{take_till, take_while, take_while1};
    use nom::character::complete::char;
    use nom::combinator::{map, opt, rest};
    use nom::multi::{many0, separated_list0};
    use nom::sequence::{preceded, terminated};
    use nom::IResult;

    use super::Token;

    /// `tag-list = tag-spec *( ";" tag-spec ) [ ";" ]`, cf. RFC 6376, section 3.2
    pub fn tag_list(input: &str) -> IResult<&str, Vec<Token>> {
        let (input, parts) = separated_list0(char(';'), take_till(|c| c == ';'))(input)?;
        let tokens = parts.into_iter().filter_map(tag_spec).collect();

        Ok((input, tokens))
    }

    fn tag_spec(part: &str) -> Option<Token> {
        let part = part.trim();
        if part.is_empty() {
            return None;
        }
        let (_, (key, value)) = key_value(part).ok()?;
        Some(Token::Pair {
            key: key.trim().to_string(),
            value: value.unwrap_or_default().trim().to_string(),
        })
    }

    // Splits on the first `=` only; the value keeps any further `=`, e.g. base64 padding.
    fn key_value(input: &str) -> IResult<&str, (&str, Option<&str>)> {
        let (input, key) = take_till(|c| c == '=')(input)?;
        let (input, value) = opt(preceded(char('='), rest))(input)?;

        Ok((input, (key, value)))
    }

    pub fn word_list(input: &str) -> IResult<&str, Vec<Token>> {
        let (input, _) = space(input)?;
        many0(map(
            terminated(take_while1(|c: char| !c.is_whitespace()), space),
            |word: &str| Token::Word(word.to_string()),
        ))(input)
    }

    fn space(input: &str) -> IResult<&str, &str> {
        take_while(|c: char| c.is_whitespace())(input)
    }
}
