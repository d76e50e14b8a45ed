use std::fmt;

/// Names of the headers understood by this crate
///
/// Parsing accepts the long and the compact form (RFC 3261 section 7.3.3),
/// printing always uses the long form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Name {
    Via,
    MaxForwards,
    From,
    To,
    CallId,
    CSeq,
    Contact,
    Route,
    RecordRoute,
    ContentType,
    ContentLength,
    Expires,
    UserAgent,
}

impl Name {
    pub fn as_str(self) -> &'static str {
        match self {
            Name::Via => "Via",
            Name::MaxForwards => "Max-Forwards",
            Name::From => "From",
            Name::To => "To",
            Name::CallId => "Call-ID",
            Name::CSeq => "CSeq",
            Name::Contact => "Contact",
            Name::Route => "Route",
            Name::RecordRoute => "Record-Route",
            Name::ContentType => "Content-Type",
            Name::ContentLength => "Content-Length",
            Name::Expires => "Expires",
            Name::UserAgent => "User-Agent",
        }
    }

    /// Lookup a header name, returns `None` for headers this crate ignores
    pub fn lookup(name: &str) -> Option<Self> {
        const NAMES: [(Name, Option<&str>); 13] = [
            (Name::Via, Some("v")),
            (Name::MaxForwards, None),
            (Name::From, Some("f")),
            (Name::To, Some("t")),
            (Name::CallId, Some("i")),
            (Name::CSeq, None),
            (Name::Contact, Some("m")),
            (Name::Route, None),
            (Name::RecordRoute, None),
            (Name::ContentType, Some("c")),
            (Name::ContentLength, Some("l")),
            (Name::Expires, None),
            (Name::UserAgent, None),
        ];

        NAMES.iter().find_map(|(known, compact)| {
            let matches = known.as_str().eq_ignore_ascii_case(name)
                || compact.is_some_and(|compact| compact.eq_ignore_ascii_case(name));

            matches.then_some(*known)
        })
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
