use crate::header::HeaderParse;
use crate::uri::{NameAddr, Params};
use nom::IResult;
use nom::combinator::map;
use std::fmt;

/// `Contact` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub uri: NameAddr,
    pub params: Params,
}

impl Contact {
    pub fn new(uri: NameAddr) -> Self {
        Self {
            uri,
            params: Params::new(),
        }
    }

    /// The `expires` parameter, used by registrars to report the granted
    /// binding lifetime
    pub fn expires(&self) -> Option<u32> {
        self.params
            .get_val("expires")
            .and_then(|expires| expires.parse().ok())
    }
}

impl HeaderParse for Contact {
    fn parse(i: &str) -> IResult<&str, Self> {
        map(NameAddr::parse_with_params, |(uri, params)| Self {
            uri,
            params,
        })(i)
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.uri, self.params)
    }
}

/// Single entry of a `Route` or `Record-Route` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub uri: NameAddr,
    pub params: Params,
}

impl HeaderParse for Route {
    fn parse(i: &str) -> IResult<&str, Self> {
        map(NameAddr::parse_with_params, |(uri, params)| Self {
            uri,
            params,
        })(i)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.uri, self.params)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn contact_expires() {
        let (_, contact) = Contact::parse("<sip:alice@10.0.0.1:5060>;expires=1800").unwrap();

        assert_eq!(contact.expires(), Some(1800));
        assert_eq!(contact.to_string(), "<sip:alice@10.0.0.1:5060>;expires=1800");
    }

    #[test]
    fn loose_route() {
        let (_, route) = Route::parse("<sip:proxy.example.org;lr>").unwrap();

        assert!(route.uri.uri.params.contains("lr"));
        assert!(route.params.is_empty());
    }
}
