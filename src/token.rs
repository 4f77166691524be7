//! Token extractor: splits a delimiter-terminated run off the front of a
//! bit stream.

use crate::bitstream::BitVec;
use crate::error::ProtocolError;

/// Scans `stream` left to right for the first occurrence of `delimiter`.
/// Returns `(token_length, remainder)` where `token_length` is the index of
/// the delimiter plus one (the run up to and including the delimiter) and
/// `remainder` is everything after it.
pub fn pull_token(stream: &BitVec, delimiter: u8) -> Result<(usize, BitVec), ProtocolError> {
    match stream.position_of(delimiter) {
        Some(i) => {
            let token_length = i + 1;
            Ok((token_length, stream.slice_from(token_length)))
        }
        None => Err(ProtocolError::DelimiterNotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulls_up_to_and_including_delimiter() {
        let s = BitVec::from_bits_str("1110100");
        let (len, rem) = pull_token(&s, 0).unwrap();
        assert_eq!(len, 4);
        assert_eq!(rem.to01(), "100");
    }

    #[test]
    fn missing_delimiter_is_an_error() {
        let s = BitVec::from_bits_str("11111");
        assert!(pull_token(&s, 0).is_err());
    }

    #[test]
    fn property_remainder_len_and_delimiter_position() {
        let s = BitVec::from_bits_str("1101001011");
        let (len, rem) = pull_token(&s, 1).unwrap();
        assert_eq!(rem.len(), s.len() - len);
        assert_eq!(s.get(len - 1), Some(1));
        for i in 0..len - 1 {
            assert_ne!(s.get(i), Some(1));
        }
    }
}
