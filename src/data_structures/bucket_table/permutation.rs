// Copyright (c) 2025 Pueo Filter Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Permutation encoding for semi-sorted buckets.
//!
//! A bucket only needs to answer "is this tag present", so the order of its
//! four slots carries no information. Sorting the four low nibbles and storing
//! the rank of the resulting multiset takes 12 bits instead of 16: there are
//! exactly C(19, 4) = 3876 nondecreasing 4-tuples over 16 symbols.
//!
//! Nibbles are packed into a `u16` with slot 1 and slot 2 swapped
//! (`n0 | n2 << 4 | n1 << 8 | n3 << 12`). Every encode and decode in the crate
//! goes through [`pack`] and [`unpack`], so the convention is applied
//! consistently.

use once_cell::sync::Lazy;

/// Number of distinct codewords (nondecreasing 4-tuples of nibbles).
pub const CODEWORD_COUNT: usize = 3876;

/// Mask selecting the codeword field at the bottom of a packed bucket.
pub const CODEWORD_MASK: u64 = 0x0fff;

static TABLES: Lazy<PermEncoding> = Lazy::new(PermEncoding::build);

/// Returns the process-wide permutation tables, building them on first use.
pub fn tables() -> &'static PermEncoding {
    &TABLES
}

/// Bijection between sorted nibble 4-tuples and 12-bit codewords.
#[derive(Debug)]
pub struct PermEncoding {
    decode_table: Vec<u16>,
    encode_table: Vec<u16>,
}

impl PermEncoding {
    fn build() -> Self {
        let mut decode_table = Vec::with_capacity(CODEWORD_COUNT);
        let mut encode_table = vec![0u16; 1 << 16];

        // Lexicographic enumeration of n0 <= n1 <= n2 <= n3.
        for n0 in 0..16u8 {
            for n1 in n0..16u8 {
                for n2 in n1..16u8 {
                    for n3 in n2..16u8 {
                        let packed = pack([n0, n1, n2, n3]);
                        encode_table[packed as usize] = decode_table.len() as u16;
                        decode_table.push(packed);
                    }
                }
            }
        }
        debug_assert_eq!(decode_table.len(), CODEWORD_COUNT);

        Self {
            decode_table,
            encode_table,
        }
    }

    /// Decodes a codeword into the four low nibbles, in slot order.
    ///
    /// `codeword` must be below [`CODEWORD_COUNT`].
    #[inline]
    pub fn decode(&self, codeword: u16) -> [u8; 4] {
        unpack(self.decode_table[codeword as usize])
    }

    /// Encodes four low nibbles into a codeword.
    ///
    /// The nibbles must already be sorted in nondecreasing order; the encode
    /// table is only populated for sorted inputs.
    #[inline]
    pub fn encode(&self, nibbles: [u8; 4]) -> u16 {
        debug_assert!(
            nibbles.windows(2).all(|w| w[0] <= w[1]),
            "encode requires sorted nibbles: {nibbles:?}"
        );
        self.encode_table[pack(nibbles) as usize]
    }
}

/// Packs four nibbles into a `u16` using the 0, 2, 1, 3 slot convention.
#[inline]
pub fn pack(nibbles: [u8; 4]) -> u16 {
    (nibbles[0] as u16 & 0x000f)
        | ((nibbles[2] as u16) << 4 & 0x00f0)
        | ((nibbles[1] as u16) << 8 & 0x0f00)
        | ((nibbles[3] as u16) << 12 & 0xf000)
}

/// Inverse of [`pack`].
#[inline]
pub fn unpack(value: u16) -> [u8; 4] {
    [
        (value & 0x000f) as u8,
        ((value >> 8) & 0x000f) as u8,
        ((value >> 4) & 0x000f) as u8,
        ((value >> 12) & 0x000f) as u8,
    ]
}
