use crate::header::HeaderParse;
use crate::uri::{NameAddr, Params};
use bytesstr::BytesStr;
use nom::IResult;
use nom::combinator::map;
use std::fmt;

/// Shared representation of the `From` and `To` headers
///
/// The `tag` parameter is split from the remaining header parameters as it
/// is part of the dialog identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromTo {
    pub uri: NameAddr,
    pub tag: Option<BytesStr>,
    pub params: Params,
}

impl FromTo {
    pub fn new(uri: NameAddr, tag: Option<BytesStr>) -> Self {
        Self {
            uri,
            tag,
            params: Params::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<BytesStr>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Returns true if the tag equals `tag`, where `None` only matches a
    /// missing tag
    pub fn tag_matches(&self, tag: Option<&BytesStr>) -> bool {
        self.tag.as_ref() == tag
    }
}

impl HeaderParse for FromTo {
    fn parse(i: &str) -> IResult<&str, Self> {
        map(NameAddr::parse_with_params, |(uri, mut params)| {
            let tag = params.take("tag");

            Self { uri, tag, params }
        })(i)
    }
}

impl fmt::Display for FromTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)?;

        if let Some(tag) = &self.tag {
            write!(f, ";tag={tag}")?;
        }

        write!(f, "{}", self.params)
    }
}
