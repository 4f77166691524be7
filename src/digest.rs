//! Digest codec: maps a positive token length to a unique prefix-free bit
//! string drawn from a self-extending bucketed code.
//!
//! Lengths 1-17 come from a fixed seed table. Lengths 18 and up fall into
//! successive buckets of size `2^t` for tail width `t`, starting at
//! `n=18, t=4` and doubling: each bucket's digest is `t+1` one-bits, a
//! zero, and the length's offset into the bucket as a `t`-bit value.

use std::collections::HashMap;

use crate::bitstream::BitVec;
use crate::error::CodecError;

const SEEDED: &[(u32, &str)] = &[
    (1, "0"),
    (2, "100"),
    (3, "101"),
    (4, "1100"),
    (5, "1101"),
    (6, "111000"),
    (7, "111001"),
    (8, "111010"),
    (9, "111011"),
    (10, "11110000"),
    (11, "11110001"),
    (12, "11110010"),
    (13, "11110011"),
    (14, "11110100"),
    (15, "11110101"),
    (16, "11110110"),
    (17, "11110111"),
];

/// First length and tail width covered by the extension algorithm.
const FIRST_EXT_LEN: u32 = 18;
const FIRST_EXT_TAIL_WIDTH: u32 = 4;

/// Append-only table mapping token length -> digest. Shared across all
/// tokens of a single compression job.
pub struct DigestTable {
    entries: HashMap<u32, BitVec>,
}

impl DigestTable {
    pub fn new() -> Self {
        let mut entries = HashMap::with_capacity(SEEDED.len());
        for &(len, bits) in SEEDED {
            entries.insert(len, BitVec::from_bits_str(bits));
        }
        Self { entries }
    }

    /// Returns the digest for `token_length`, computing and caching it if
    /// this is the first time this length has been seen.
    pub fn digest(&mut self, token_length: i64) -> Result<BitVec, CodecError> {
        if token_length <= 0 {
            return Err(CodecError::NonPositiveLength(token_length));
        }
        let len = token_length as u32;
        if let Some(existing) = self.entries.get(&len) {
            return Ok(existing.clone());
        }
        let digest = compute_extension_digest(len);
        self.entries.insert(len, digest.clone());
        Ok(digest)
    }
}

impl Default for DigestTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Walks the bucket sequence starting at `(n=18, t=4)`, doubling bucket size
/// (`2^t`) at each step, until `len` falls within `[n, n + 2^t - 1]`.
fn compute_extension_digest(len: u32) -> BitVec {
    let mut n = FIRST_EXT_LEN;
    let mut t = FIRST_EXT_TAIL_WIDTH;
    loop {
        let bucket_size = 1u32 << t;
        if len < n + bucket_size {
            let offset = len - n;
            return build_digest(t, offset);
        }
        n += bucket_size;
        t += 1;
    }
}

/// Head is `t+1` ones followed by a zero; tail is `offset` as a `t`-bit
/// big-endian binary value.
fn build_digest(tail_width: u32, offset: u32) -> BitVec {
    let mut digest = BitVec::with_capacity((tail_width + 2) as usize);
    for _ in 0..tail_width + 1 {
        digest.push(1);
    }
    digest.push(0);
    for shift in (0..tail_width).rev() {
        digest.push(((offset >> shift) & 1) as u8);
    }
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s5_seeded_values() {
        let mut table = DigestTable::new();
        assert_eq!(table.digest(1).unwrap().to01(), "0");
        assert_eq!(table.digest(5).unwrap().to01(), "1101");
        assert_eq!(table.digest(17).unwrap().to01(), "11110111");
    }

    #[test]
    fn extension_first_bucket() {
        let mut table = DigestTable::new();
        // length 18 begins the t=4 bucket: head "111110", tail "0000".
        assert_eq!(table.digest(18).unwrap().to01(), "1111100000");
        // length 33 is the last entry of the same bucket (offset 15).
        assert_eq!(table.digest(33).unwrap().to01(), "1111101111");
        // length 34 begins the next bucket, t=5: head "1111110".
        assert_eq!(table.digest(34).unwrap().to01(), "111111000000");
    }

    #[test]
    fn non_positive_length_is_an_error() {
        let mut table = DigestTable::new();
        assert!(table.digest(0).is_err());
        assert!(table.digest(-5).is_err());
    }

    #[test]
    fn no_digest_is_a_prefix_of_another() {
        let mut table = DigestTable::new();
        let mut digests = Vec::new();
        for len in 1..500 {
            digests.push(table.digest(len).unwrap().to01());
        }
        for (i, a) in digests.iter().enumerate() {
            for (j, b) in digests.iter().enumerate() {
                if i == j {
                    continue;
                }
                assert!(
                    !b.starts_with(a.as_str()),
                    "digest for length {} ({}) is a prefix of digest for length {} ({})",
                    i + 1,
                    a,
                    j + 1,
                    b
                );
            }
        }
    }

    #[test]
    fn digests_cache_across_calls() {
        let mut table = DigestTable::new();
        let first = table.digest(100).unwrap();
        let second = table.digest(100).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn out_of_order_queries_are_still_correct() {
        let mut table = DigestTable::new();
        let high = table.digest(200).unwrap();
        let low = table.digest(40).unwrap();
        let mut fresh = DigestTable::new();
        assert_eq!(low, fresh.digest(40).unwrap());
        assert_eq!(high, fresh.digest(200).unwrap());
    }
}
