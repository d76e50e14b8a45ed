use std::fmt;
use std::str::FromStr;

type Repr = u16;

/// A SIP response status code
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StatusCode(Repr);

impl fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tuple = f.debug_tuple("StatusCode");
        tuple.field(&self.0);
        if let Some(text) = self.text() {
            tuple.field(&text);
        }
        tuple.finish()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Broad classification of a [`StatusCode`]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum CodeKind {
    /// 100..=199
    Provisional,
    /// 200..=299
    Success,
    /// 300..=399
    Redirection,
    /// 400..=499
    RequestFailure,
    /// 500..=599
    ServerFailure,
    /// 600..=699
    GlobalFailure,
    /// Everything outside the ranges above
    Custom,
}

impl StatusCode {
    /// Returns the [`CodeKind`] of the code
    ///
    /// ```
    /// use vcall_sip_types::{CodeKind, StatusCode};
    ///
    /// assert_eq!(StatusCode::from(200).kind(), CodeKind::Success);
    /// assert_eq!(StatusCode::DECLINE.kind(), CodeKind::GlobalFailure);
    /// ```
    #[inline]
    pub fn kind(self) -> CodeKind {
        match self.0 {
            100..=199 => CodeKind::Provisional,
            200..=299 => CodeKind::Success,
            300..=399 => CodeKind::Redirection,
            400..=499 => CodeKind::RequestFailure,
            500..=599 => CodeKind::ServerFailure,
            600..=699 => CodeKind::GlobalFailure,
            _ => CodeKind::Custom,
        }
    }

    #[inline]
    pub fn into_u16(self) -> Repr {
        self.0
    }

    /// Any code >= 200 ends a transaction
    #[inline]
    pub fn is_final(self) -> bool {
        self.0 >= 200
    }
}

impl FromStr for StatusCode {
    type Err = <Repr as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(StatusCode(Repr::from_str(s)?))
    }
}

impl From<Repr> for StatusCode {
    fn from(r: Repr) -> StatusCode {
        StatusCode(r)
    }
}

macro_rules! codes {
    ($([$code:expr => $name:ident, $text:literal];)*) => {
        impl StatusCode {
            /// Returns the default reason phrase for a known code
            pub fn text(self) -> Option<&'static str> {
                match self.0 {
                    $($code => Some($text),)*
                    _ => None
                }
            }

            $(pub const $name: StatusCode = StatusCode($code);)*
        }
    };
}

codes! {
    [100 => TRYING, "Trying"];
    [180 => RINGING, "Ringing"];
    [181 => CALL_IS_BEING_FORWARDED, "Call Is Being Forwarded"];
    [182 => QUEUED, "Queued"];
    [183 => SESSION_PROGRESS, "Session Progress"];

    [200 => OK, "OK"];

    [302 => MOVED_TEMPORARILY, "Moved Temporarily"];

    [400 => BAD_REQUEST, "Bad Request"];
    [403 => FORBIDDEN, "Forbidden"];
    [404 => NOT_FOUND, "Not Found"];
    [405 => METHOD_NOT_ALLOWED, "Method Not Allowed"];
    [408 => REQUEST_TIMEOUT, "Request Timeout"];
    [480 => TEMPORARILY_UNAVAILABLE, "Temporarily Unavailable"];
    [481 => CALL_OR_TRANSACTION_DOES_NOT_EXIST, "Call/Transaction Does Not Exist"];
    [486 => BUSY_HERE, "Busy Here"];
    [487 => REQUEST_TERMINATED, "Request Terminated"];
    [488 => NOT_ACCEPTABLE_HERE, "Not Acceptable Here"];

    [500 => SERVER_INTERNAL_ERROR, "Server Internal Error"];
    [503 => SERVICE_UNAVAILABLE, "Service Unavailable"];

    [600 => BUSY_EVERYWHERE, "Busy Everywhere"];
    [603 => DECLINE, "Decline"];
}
