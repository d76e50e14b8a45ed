//! nom building blocks shared by the uri, header and message parsers

use nom::IResult;
use nom::bytes::complete::{take_while, take_while1};
use nom::character::complete::{char, digit1};
use nom::combinator::{map_res, opt, recognize};
use nom::sequence::{delimited, pair, preceded};

pub(crate) fn whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

#[rustfmt::skip]
pub(crate) fn token(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '.' | '!' | '%' | '*' | '_' | '`' | '\'' | '~' | '+')
}

pub(crate) fn param_value_char(c: char) -> bool {
    token(c) || matches!(c, '[' | ']' | '/' | ':' | '&' | '$' | '@')
}

pub(crate) fn user_char(c: char) -> bool {
    c.is_alphanumeric()
        || matches!(
            c,
            '-' | '_' | '.' | '!' | '~' | '*' | '\'' | '(' | ')' | '&' | '=' | '+' | '$' | ',' | '?' | '/' | '%'
        )
}

fn hostname_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '.' | '_')
}

pub(crate) fn quoted(i: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_while(|c| c != '"'), char('"'))(i)
}

/// `host [":" port]`, IPv6 references keep their brackets
pub(crate) fn host_port(i: &str) -> IResult<&str, (&str, Option<u16>)> {
    pair(
        nom::branch::alt((
            recognize(delimited(char('['), take_while1(|c| c != ']'), char(']'))),
            take_while1(hostname_char),
        )),
        opt(preceded(
            char(':'),
            map_res(digit1, |port: &str| port.parse::<u16>()),
        )),
    )(i)
}

/// Split a header value at commas which are not part of a quoted string
/// or enclosed in angle brackets.
pub(crate) fn split_comma(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut start = 0;

    for (idx, c) in value.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => in_brackets = true,
            '>' if !in_quotes => in_brackets = false,
            ',' if !in_quotes && !in_brackets => {
                parts.push(value[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }

    parts.push(value[start..].trim());
    parts.retain(|part| !part.is_empty());
    parts
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn host_and_port() {
        assert_eq!(host_port("example.org:5060;x"), Ok((";x", ("example.org", Some(5060)))));
        assert_eq!(host_port("[::1]:5062"), Ok(("", ("[::1]", Some(5062)))));
        assert_eq!(host_port("10.0.0.1"), Ok(("", ("10.0.0.1", None))));
    }

    #[test]
    fn comma_split() {
        let parts = split_comma("<sip:a@x;lr>, \"B, C\" <sip:b@y>,sip:c@z");
        assert_eq!(parts, vec!["<sip:a@x;lr>", "\"B, C\" <sip:b@y>", "sip:c@z"]);
    }
}
