// Adapted from the two-bit packing scheme of GenomeTools' `core/encseq.c`
// family (see `original_source`), following the module layout and doc style
// of `bio::alphabets` in this crate's teacher.

//! Two-bit packed sequence encoding and positional read-mode decoding.
//!
//! Four-symbol alphabets (A, C, G, T after `alphabets::MultiRangeAlphabet`
//! transform) are packed two bits per symbol, big-endian within each `u64`
//! machine word, so that `GT_KMERSIZE` (4) consecutive symbols can be read
//! out of a single word with one shift-and-mask when they don't straddle a
//! word boundary, and with one shift-or-shift when they do.
//!
//! Symbols outside the four-letter range (wildcards, record separators) are
//! tracked in a side bitmap rather than the two-bit plane, since they have
//! no native two-bit code.

use crate::error::{EsaError, Result};
use bv::BitVec;
use serde::{Deserialize, Serialize};

/// Number of two-bit codes packed into a single `u64` word.
pub const UNITS_PER_WORD: usize = 32;
/// Symbols decoded per `code_at_position` call, matching `GT_KMERSIZE` in
/// the original C sources.
pub const KMERSIZE: usize = 4;

/// All-ones mask over a 2-bit field, used to complement a 2-bit code.
const TWOBIT_COMPLEMENT_MASK: u8 = 0b11;

/// One of the four positional decode strategies for a packed sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadMode {
    Forward,
    Reverse,
    Complement,
    ReverseComplement,
}

impl ReadMode {
    pub fn from_u32(v: u32) -> Result<Self> {
        match v {
            0 => Ok(ReadMode::Forward),
            1 => Ok(ReadMode::Reverse),
            2 => Ok(ReadMode::Complement),
            3 => Ok(ReadMode::ReverseComplement),
            other => Err(EsaError::BadInput(format!("illegal readmode {}", other))),
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            ReadMode::Forward => 0,
            ReadMode::Reverse => 1,
            ReadMode::Complement => 2,
            ReadMode::ReverseComplement => 3,
        }
    }

    /// Single-letter strand tag used by the query-match formatter (§4.H):
    /// F/R/C/P for FORWARD/REVERSE/COMPLEMENT/REVCOMPL.
    pub fn strand_tag(self) -> char {
        match self {
            ReadMode::Forward => 'F',
            ReadMode::Reverse => 'R',
            ReadMode::Complement => 'C',
            ReadMode::ReverseComplement => 'P',
        }
    }
}

/// Complement a 2-bit nucleotide code (A<->T, C<->G under the canonical
/// 0..3 assignment) by XOR with the all-ones 2-bit mask.
#[inline]
pub fn complement_code(code: u8) -> u8 {
    code ^ TWOBIT_COMPLEMENT_MASK
}

/// Reverse-complement a byte holding a packed 4-symbol (8-bit) code: swap
/// the two 4-bit halves (each containing two 2-bit fields) and complement
/// every 2-bit field.
#[inline]
pub fn revcompl_4mer_code(code: u8) -> u8 {
    let swapped = (code >> 4) | (code << 4);
    // complement each of the four 2-bit fields via XOR with 0b11_11_11_11,
    // then reverse the order of the four 2-bit fields within the byte.
    let complemented = swapped ^ 0xFF;
    // `swapped` already exchanged the two nibbles; to fully reverse the
    // 4-symbol order we also need to swap the two symbols within each
    // nibble (each nibble holds two 2-bit codes, high then low).
    let hi = complemented >> 4;
    let lo = complemented & 0x0F;
    let hi_swapped = ((hi & 0b0011) << 2) | (hi >> 2);
    let lo_swapped = ((lo & 0b0011) << 2) | (lo >> 2);
    (hi_swapped << 4) | lo_swapped
}

/// A packed two-bit sequence plus a side bitmap marking positions that hold
/// a non-nucleotide symbol (wildcard or separator), whose real byte value is
/// kept in `specials`.
pub struct TwoBitEncoded {
    words: Vec<u64>,
    len: usize,
    /// `true` at positions that are wildcard/separator, not a plain base.
    is_special: BitVec<u64>,
    specials: std::collections::HashMap<usize, u8>,
}

impl TwoBitEncoded {
    /// Pack `codes` (two-bit nucleotide codes, already alphabet-transformed)
    /// into words. `specials` gives the original byte value for every
    /// position whose code is not a plain 0..3 nucleotide code (those
    /// positions' entry in `codes` is ignored and treated as 0 filler).
    pub fn encode(codes: &[u8], specials: &std::collections::HashMap<usize, u8>) -> Self {
        let len = codes.len();
        let nwords = (len + UNITS_PER_WORD - 1) / UNITS_PER_WORD.max(1);
        let mut words = vec![0u64; nwords.max(1)];
        let mut is_special = BitVec::new_fill(false, len as u64);

        for (pos, &code) in codes.iter().enumerate() {
            let word = pos / UNITS_PER_WORD;
            let offset = pos % UNITS_PER_WORD;
            let shift = 62 - 2 * offset; // big-endian within the word
            let c = if specials.contains_key(&pos) {
                is_special.set(pos as u64, true);
                0
            } else {
                code & 0b11
            };
            words[word] |= (c as u64) << shift;
        }

        TwoBitEncoded {
            words,
            len,
            is_special,
            specials: specials.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw 2-bit code at absolute position `p` (0 for special positions;
    /// callers should check `is_special_position` first).
    #[inline]
    pub fn code_at(&self, p: usize) -> Result<u8> {
        if p >= self.len {
            return Err(EsaError::BadPosition {
                pos: p as u64,
                len: self.len as u64,
            });
        }
        let word = p / UNITS_PER_WORD;
        let offset = p % UNITS_PER_WORD;
        let shift = 62 - 2 * offset;
        Ok(((self.words[word] >> shift) & 0b11) as u8)
    }

    pub fn is_special_position(&self, p: usize) -> bool {
        p < self.len && self.is_special.get(p as u64)
    }

    /// Extract the 4-symbol (8-bit) code starting at absolute position `p`,
    /// following `gt_radixsort_str_code_at_position`: when the k-mer fits
    /// inside one word it is a single shift-and-mask, otherwise it is built
    /// from the low bits of one word and the high bits of the next. Only
    /// `p` itself is bounds-checked: callers (the radix sorter's overflow
    /// encoding) may legitimately read a short tail past `len` when near a
    /// record boundary, which reads as zero padding, matching the trailing
    /// padding word GenomeTools' on-disk encoding reserves for this.
    pub fn code4_at(&self, p: usize) -> Result<u8> {
        if p >= self.len {
            return Err(EsaError::BadPosition {
                pos: p as u64,
                len: self.len as u64,
            });
        }
        let word = p / UNITS_PER_WORD;
        let offset = p % UNITS_PER_WORD;
        if offset <= UNITS_PER_WORD - KMERSIZE {
            let shift = 2 * (UNITS_PER_WORD - KMERSIZE - offset);
            Ok(((self.words[word] >> shift) & 0xFF) as u8)
        } else {
            let shift_left = 2 * (offset + KMERSIZE - UNITS_PER_WORD);
            let hi = (self.words[word] << shift_left) as u8;
            let lo_shift = 2 * UNITS_PER_WORD as u32 - shift_left as u32;
            let lo = if (lo_shift as usize) < 64 {
                (self.words.get(word + 1).copied().unwrap_or(0) >> lo_shift) as u8
            } else {
                0
            };
            Ok(hi | lo)
        }
    }

    /// Decode the symbol at absolute position `p` under `mode`, per the
    /// read-mode contract in §4.A. Wildcards/separators pass through
    /// without complementation.
    pub fn decode(&self, p: usize, mode: ReadMode, alphabet_decode: impl Fn(u8) -> u8) -> Result<u8> {
        if p >= self.len {
            return Err(EsaError::BadPosition {
                pos: p as u64,
                len: self.len as u64,
            });
        }
        let resolved_pos = match mode {
            ReadMode::Forward | ReadMode::Complement => p,
            ReadMode::Reverse | ReadMode::ReverseComplement => self.len - 1 - p,
        };
        if let Some(&raw) = self.specials.get(&resolved_pos) {
            return Ok(raw);
        }
        let code = self.code_at(resolved_pos)?;
        let byte = alphabet_decode(code);
        match mode {
            ReadMode::Forward | ReadMode::Reverse => Ok(byte),
            ReadMode::Complement | ReadMode::ReverseComplement => {
                Ok(alphabet_decode(complement_code(code)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn identity(code: u8) -> u8 {
        b"ACGT"[code as usize]
    }

    #[test]
    fn roundtrip_plain_positions() {
        let codes = [0u8, 1, 2, 3, 0, 1, 2, 3, 3, 2, 1, 0];
        let enc = TwoBitEncoded::encode(&codes, &HashMap::new());
        for (i, &c) in codes.iter().enumerate() {
            assert_eq!(enc.code_at(i).unwrap(), c);
        }
    }

    #[test]
    fn decode_forward_and_reverse() {
        let codes = [0u8, 1, 2, 3];
        let enc = TwoBitEncoded::encode(&codes, &HashMap::new());
        assert_eq!(enc.decode(0, ReadMode::Forward, identity).unwrap(), b'A');
        assert_eq!(enc.decode(3, ReadMode::Forward, identity).unwrap(), b'T');
        assert_eq!(enc.decode(0, ReadMode::Reverse, identity).unwrap(), b'T');
        assert_eq!(enc.decode(3, ReadMode::Reverse, identity).unwrap(), b'A');
    }

    #[test]
    fn decode_complement_and_revcompl() {
        // A<->T (0<->3), C<->G (1<->2) under XOR-with-0b11.
        let codes = [0u8, 1, 2, 3];
        let enc = TwoBitEncoded::encode(&codes, &HashMap::new());
        assert_eq!(enc.decode(0, ReadMode::Complement, identity).unwrap(), b'T');
        assert_eq!(enc.decode(1, ReadMode::Complement, identity).unwrap(), b'G');
        // REVCOMPL(p) == compl(raw[L-1-p])
        for p in 0..codes.len() {
            let expected = complement_code(codes[codes.len() - 1 - p]);
            assert_eq!(
                enc.decode(p, ReadMode::ReverseComplement, identity).unwrap(),
                identity(expected)
            );
        }
    }

    #[test]
    fn bad_position_errors() {
        let enc = TwoBitEncoded::encode(&[0, 1, 2], &HashMap::new());
        assert!(enc.decode(3, ReadMode::Forward, identity).is_err());
    }

    #[test]
    fn special_positions_pass_through() {
        let mut specials = HashMap::new();
        specials.insert(2usize, b'N');
        let codes = [0u8, 1, 0, 3];
        let enc = TwoBitEncoded::encode(&codes, &specials);
        assert!(enc.is_special_position(2));
        assert_eq!(enc.decode(2, ReadMode::Complement, identity).unwrap(), b'N');
    }

    #[test]
    fn code4_spans_word_boundary() {
        // force a small word size scenario by using positions near 32 (UNITS_PER_WORD)
        let mut codes = vec![0u8; 40];
        for (i, c) in codes.iter_mut().enumerate() {
            *c = (i % 4) as u8;
        }
        let enc = TwoBitEncoded::encode(&codes, &HashMap::new());
        // position 30 straddles the word boundary at 32
        let code4 = enc.code4_at(30).unwrap();
        let expected = (codes[30] << 6) | (codes[31] << 4) | (codes[32] << 2) | codes[33];
        assert_eq!(code4, expected);
    }

    #[test]
    fn roundtrip_random_code_streams() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let len = rng.gen_range(0..80);
            let mut specials = HashMap::new();
            let codes: Vec<u8> = (0..len)
                .map(|pos| {
                    if rng.gen_range(0..10) == 0 {
                        specials.insert(pos, b'N');
                        0
                    } else {
                        rng.gen_range(0..4)
                    }
                })
                .collect();
            let enc = TwoBitEncoded::encode(&codes, &specials);
            for (pos, &c) in codes.iter().enumerate() {
                if specials.contains_key(&pos) {
                    assert!(enc.is_special_position(pos));
                } else {
                    assert_eq!(enc.code_at(pos).unwrap(), c);
                }
            }
        }
    }

    #[test]
    fn revcompl_4mer_matches_definition() {
        // 4mer ACGT = 00 01 10 11 = 0b00_01_10_11
        let code: u8 = 0b00_01_10_11;
        let rc = revcompl_4mer_code(code);
        // reverse-complement of ACGT is ACGT (palindromic test vector)
        assert_eq!(rc, code);
        let code2: u8 = 0b00_00_00_11; // AAAT
        let rc2 = revcompl_4mer_code(code2);
        // reverse -> TAAA, complement -> ATTT == 0b00_11_11_11
        assert_eq!(rc2, 0b00_11_11_11);
    }
}
