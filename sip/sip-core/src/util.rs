use bytesstr::BytesStr;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sip_types::header::typed::MAGIC_COOKIE;

pub(crate) const TAG_LEN: usize = 10;
pub(crate) const CALL_ID_LEN: usize = 16;

pub(crate) fn random_string(len: usize) -> BytesStr {
    rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect::<String>()
        .into()
}

/// Initial CSeq, kept below 2**31 as required by RFC 3261 section 8.1.1.5
pub(crate) fn random_sequence_number() -> u32 {
    rng().random_range(1..0x7FFF_FFFF)
}

pub(crate) fn generate_branch() -> BytesStr {
    MAGIC_COOKIE
        .bytes()
        .chain(rng().sample_iter(Alphanumeric).take(23))
        .map(char::from)
        .collect::<String>()
        .into()
}
