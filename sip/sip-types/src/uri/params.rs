use crate::parse::{param_value_char, quoted, token};
use bytesstr::BytesStr;
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::{char, space0};
use nom::combinator::{map, opt};
use nom::multi::many0;
use nom::sequence::{pair, preceded, tuple};
use std::fmt;

/// A single `;name[=value]` parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: BytesStr,
    pub value: Option<BytesStr>,
}

impl Param {
    pub fn name(name: impl Into<BytesStr>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn value(name: impl Into<BytesStr>, value: impl Into<BytesStr>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, ";{}={}", self.name, value),
            None => write!(f, ";{}", self.name),
        }
    }
}

/// Ordered list of parameters, names compare case-insensitive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<Param>);

impl Params {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, param: Param) {
        self.0.push(param);
    }

    pub fn with(mut self, param: Param) -> Self {
        self.push(param);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.0.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn get_val(&self, name: &str) -> Option<&BytesStr> {
        self.get(name).and_then(|p| p.value.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove the parameter and return its value
    pub fn take(&mut self, name: &str) -> Option<BytesStr> {
        let idx = self
            .0
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))?;

        self.0.remove(idx).value
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.0.iter()
    }

    pub(crate) fn parse(i: &str) -> IResult<&str, Self> {
        map(many0(parse_param), Params)(i)
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for param in &self.0 {
            param.fmt(f)?;
        }

        Ok(())
    }
}

fn parse_param(i: &str) -> IResult<&str, Param> {
    map(
        preceded(
            tuple((space0, char(';'), space0)),
            pair(
                take_while1(token),
                opt(preceded(
                    char('='),
                    alt((quoted, take_while1(param_value_char))),
                )),
            ),
        ),
        |(name, value): (&str, Option<&str>)| Param {
            name: BytesStr::from(name),
            value: value.map(BytesStr::from),
        },
    )(i)
}
