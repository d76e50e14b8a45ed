use crate::header::Name;

/// Error returned when a message or one of its parts could not be parsed
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("message is not valid UTF-8")]
    NotUtf8,
    #[error("message has no header/body separator")]
    Incomplete,
    #[error("malformed start line `{0}`")]
    StartLine(String),
    #[error("malformed {name} header `{value}`")]
    Header { name: Name, value: String },
    #[error("missing mandatory {0} header")]
    Missing(Name),
    #[error("malformed uri `{0}`")]
    Uri(String),
    #[error("body shorter than Content-Length ({expected} > {got})")]
    Truncated { expected: usize, got: usize },
}

impl ParseError {
    pub(crate) fn header(name: Name, value: &str) -> Self {
        Self::Header {
            name,
            value: value.to_owned(),
        }
    }
}
