use bytesstr::BytesStr;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Represents a SIP-Method.
///
/// Well known methods are available as constants, every other method is
/// kept verbatim.
///
/// # Example
///
/// ```
/// use vcall_sip_types::Method;
///
/// let invite: Method = "invite".parse().unwrap();
/// assert_eq!(invite, Method::INVITE);
///
/// let custom = Method::from("HELLO");
/// assert_eq!(custom.to_string(), "HELLO");
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Method(Repr);

macro_rules! methods {
    ($($print:literal, $ident:ident;)+) => {
        #[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[allow(clippy::upper_case_acronyms)]
        enum Repr {
            $($ident,)+
            Other(BytesStr),
        }

        impl Method {
            $(pub const $ident: Self = Self(Repr::$ident);)+

            fn from_known(s: &str) -> Option<Self> {
                $(
                if s.eq_ignore_ascii_case($print) {
                    return Some(Self::$ident);
                }
                )+

                None
            }

            pub fn as_str(&self) -> &str {
                match &self.0 {
                    $(Repr::$ident => $print,)+
                    Repr::Other(other) => other.as_str(),
                }
            }
        }
    };
}

methods! {
    "INVITE",   INVITE;
    "ACK",      ACK;
    "CANCEL",   CANCEL;
    "BYE",      BYE;
    "REGISTER", REGISTER;
    "OPTIONS",  OPTIONS;
    "INFO",     INFO;
    "UPDATE",   UPDATE;
}

impl Method {
    /// ACK and CANCEL never consume a new CSeq number of their own, they
    /// reuse the one of the request they belong to.
    pub fn reuses_cseq(&self) -> bool {
        matches!(self.0, Repr::ACK | Repr::CANCEL)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        Self::from_known(s).unwrap_or_else(|| Self(Repr::Other(BytesStr::from(s))))
    }
}
