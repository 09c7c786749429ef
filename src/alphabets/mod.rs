// Adapted from GenomeTools' `src/libgtmatch/eis-mrangealphabet.c` (see
// `original_source`), kept in the doc-and-module style of `bio::alphabets`
// (this crate's teacher), whose `Alphabet`/`RankTransform` pair this type
// generalizes into a multi-range, wildcard-aware alphabet.

//! Multi-range alphabet: map a source byte alphabet onto contiguous code
//! ranges with a designated wildcard range.
//!
//! # Example
//!
//! ```
//! use esaligner::alphabets::MultiRangeAlphabet;
//!
//! let mra = MultiRangeAlphabet::new(&[
//!     vec![b'A'], vec![b'C'], vec![b'G'], vec![b'T'], vec![b'N'],
//! ]).unwrap();
//! let mut codes = vec![b'A', b'C', b'G', b'T', b'N'];
//! mra.transform(&mut codes).unwrap();
//! assert_eq!(codes, vec![0, 1, 2, 3, 4]);
//! mra.rev_transform(&mut codes).unwrap();
//! assert_eq!(codes, vec![b'A', b'C', b'G', b'T', b'N']);
//! ```

use crate::error::{EsaError, Result};
use bit_set::BitSet;

const UNDEFINED: u8 = 0xFF;

/// Whether a symbol falls inside a caller-selected subset of ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMembership {
    InRange,
    OutOfRange,
    Unknown,
}

/// A multi-range alphabet: contiguous code ranges over a source byte
/// alphabet, the last of which is the designated wildcard range.
#[derive(Debug, Clone)]
pub struct MultiRangeAlphabet {
    /// `forward[byte as usize]` is the assigned code, or `UNDEFINED`.
    forward: [u8; 256],
    /// `reverse[code as usize]` is the representative byte for that code.
    reverse: Vec<u8>,
    /// Exclusive end code index of range `r`, i.e. range `r` covers
    /// `[range_start(r), range_end_indices[r])`.
    range_end_indices: Vec<usize>,
    /// Which range index each defined byte belongs to (same length as
    /// `reverse`, indexed by code).
    code_range: Vec<usize>,
    /// Present byte set, following `bio::alphabets::Alphabet`'s use of
    /// `bit_set::BitSet` for membership.
    symbols: BitSet,
}

impl MultiRangeAlphabet {
    fn range_start(range_end_indices: &[usize], r: usize) -> usize {
        if r == 0 {
            0
        } else {
            range_end_indices[r - 1]
        }
    }

    /// Build an alphabet from an ordered list of ranges, each a list of
    /// bytes assigned contiguous codes in range order. The last range is
    /// the wildcard range. Fails with `BadAlphabet` if `ranges` is empty or
    /// a byte appears in more than one range.
    pub fn new(ranges: &[Vec<u8>]) -> Result<Self> {
        if ranges.is_empty() {
            return Err(EsaError::BadAlphabet("no ranges given".into()));
        }
        let mut forward = [UNDEFINED; 256];
        let mut reverse = Vec::new();
        let mut range_end_indices = Vec::with_capacity(ranges.len());
        let mut code_range = Vec::new();
        let mut symbols = BitSet::new();
        let mut code = 0u8;

        for (r, range) in ranges.iter().enumerate() {
            if range.is_empty() {
                return Err(EsaError::BadAlphabet(format!("range {} is empty", r)));
            }
            for &b in range {
                if forward[b as usize] != UNDEFINED {
                    return Err(EsaError::BadAlphabet(format!(
                        "symbol {} appears in more than one range",
                        b
                    )));
                }
                forward[b as usize] = code;
                reverse.push(b);
                code_range.push(r);
                symbols.insert(b as usize);
                code = code
                    .checked_add(1)
                    .ok_or_else(|| EsaError::BadAlphabet("too many symbols for u8 codes".into()))?;
            }
            range_end_indices.push(reverse.len());
        }

        Ok(MultiRangeAlphabet {
            forward,
            reverse,
            range_end_indices,
            code_range,
            symbols,
        })
    }

    /// Number of distinct ranges.
    pub fn num_ranges(&self) -> usize {
        self.range_end_indices.len()
    }

    /// Total number of mapped codes.
    pub fn size(&self) -> usize {
        self.reverse.len()
    }

    /// Index of the wildcard range (always the last one).
    pub fn wildcard_range(&self) -> usize {
        self.num_ranges() - 1
    }

    /// Wildcard code: the first code of the wildcard range.
    pub fn wildcard_code(&self) -> u8 {
        Self::range_start(&self.range_end_indices, self.wildcard_range()) as u8
    }

    pub fn is_mapped(&self, byte: u8) -> bool {
        self.forward[byte as usize] != UNDEFINED
    }

    /// Whether `byte` is present in this alphabet's symbol set.
    pub fn is_symbol(&self, byte: u8) -> bool {
        self.symbols.contains(byte as usize)
    }

    pub fn code_of(&self, byte: u8) -> Result<u8> {
        let c = self.forward[byte as usize];
        if c == UNDEFINED {
            Err(EsaError::BadAlphabet(format!("symbol {} not mapped", byte)))
        } else {
            Ok(c)
        }
    }

    pub fn byte_of(&self, code: u8) -> Result<u8> {
        self.reverse
            .get(code as usize)
            .copied()
            .ok_or_else(|| EsaError::BadAlphabet(format!("code {} not mapped", code)))
    }

    /// Map bytes to codes in place.
    pub fn transform(&self, bytes: &mut [u8]) -> Result<()> {
        for b in bytes.iter_mut() {
            *b = self.code_of(*b)?;
        }
        Ok(())
    }

    /// Map codes back to representative bytes in place.
    pub fn rev_transform(&self, codes: &mut [u8]) -> Result<()> {
        for c in codes.iter_mut() {
            *c = self.byte_of(*c)?;
        }
        Ok(())
    }

    /// Range index a given code belongs to.
    pub fn range_of_code(&self, code: u8) -> Option<usize> {
        self.code_range.get(code as usize).copied()
    }

    /// Produce an alphabet where ranges with `range_selector[r] == select`
    /// are preserved verbatim and every other range's symbols collapse onto
    /// `fallback`'s range. The resulting code count is never larger than
    /// this alphabet's.
    pub fn secondary_mapping(
        &self,
        select: usize,
        range_selector: &[usize],
        fallback: u8,
    ) -> Result<MultiRangeAlphabet> {
        if range_selector.len() != self.num_ranges() {
            return Err(EsaError::BadInput(
                "range_selector length must match number of ranges".into(),
            ));
        }
        let fallback_range = self
            .range_of_code(fallback)
            .ok_or_else(|| EsaError::BadAlphabet("fallback code unmapped".into()))?;

        let mut ranges: Vec<Vec<u8>> = Vec::new();
        let mut fallback_bucket: Vec<u8> = Vec::new();

        for r in 0..self.num_ranges() {
            let start = Self::range_start(&self.range_end_indices, r);
            let end = self.range_end_indices[r];
            let bytes: Vec<u8> = (start..end).map(|c| self.reverse[c]).collect();
            if range_selector[r] == select {
                ranges.push(bytes);
            } else if r == fallback_range {
                fallback_bucket.extend(bytes);
            } else {
                fallback_bucket.extend(bytes);
            }
        }
        if !fallback_bucket.is_empty() {
            // keep the fallback range's original byte first so its code is stable
            let mut merged = vec![self.reverse[fallback as usize]];
            merged.extend(
                fallback_bucket
                    .into_iter()
                    .filter(|&b| b != self.reverse[fallback as usize]),
            );
            ranges.push(merged);
        }
        MultiRangeAlphabet::new(&ranges)
    }

    /// Insert `sym` into range `r` at the end of that range's code block,
    /// shifting every subsequent code up by one. Fails with `AlreadyMapped`
    /// if `sym` is already mapped somewhere.
    pub fn add_symbol_to_range(&mut self, sym: u8, r: usize) -> Result<()> {
        if self.is_mapped(sym) {
            return Err(EsaError::AlreadyMapped(sym));
        }
        if r >= self.num_ranges() {
            return Err(EsaError::BadInput(format!("range {} does not exist", r)));
        }
        let insert_at = self.range_end_indices[r];

        for b in self.forward.iter_mut() {
            if *b != UNDEFINED && *b as usize >= insert_at {
                *b += 1;
            }
        }
        self.reverse.insert(insert_at, sym);
        self.code_range.insert(insert_at, r);
        for end in self.range_end_indices.iter_mut().skip(r) {
            *end += 1;
        }
        self.forward[sym as usize] = insert_at as u8;
        self.symbols.insert(sym as usize);
        Ok(())
    }

    /// Whether `sym` lies in one of the ranges selected by
    /// `range_selector[r] == select`.
    pub fn symbol_in_selected_ranges(
        &self,
        sym: u8,
        select: usize,
        range_selector: &[usize],
    ) -> RangeMembership {
        match self.range_of_code(self.forward[sym as usize]) {
            None => RangeMembership::Unknown,
            Some(r) => {
                if range_selector.get(r).copied() == Some(select) {
                    RangeMembership::InRange
                } else {
                    RangeMembership::OutOfRange
                }
            }
        }
    }
}
