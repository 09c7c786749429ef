// Ported from GenomeTools' `gt_radixsort_str_eqlen` and its helpers
// (`src/match/radixsort_str.c`, see `original_source`): bucket derivation
// (`gt_radixsort_str_get_code`), the `HAS_OVERFLOW`/`LAST_BUCKET`
// predicates, the iterative MSD stack algorithm and the insertion-sort
// fallback are kept verbatim in structure — the interaction between the
// terminal bucket and the overflow predicate is resolved by porting the
// exact C condition rather than a paraphrase.

//! String radix sorter for equal-length suffix records (§4.D).

use crate::encoding::{revcompl_4mer_code, TwoBitEncoded, KMERSIZE};
use crate::error::{EsaError, Result};

const NOF_KMER_CODES: usize = 1 << (KMERSIZE * 2); // 256, one byte-wide 4-mer code
const NOF_BUCKETS: usize = NOF_KMER_CODES * KMERSIZE + 1; // 1025
const LAST_BUCKET: u16 = (NOF_BUCKETS - 1) as u16;
const INSERTION_SORT_MAX: usize = 31;

#[inline]
fn has_overflow(code: u16) -> bool {
    (code & 3) > 0 || code == LAST_BUCKET
}

#[inline]
fn bucketnum(code: u16, overflow: u8) -> u16 {
    (code << 2) | overflow as u16
}

/// Bucket for `suffixnum` at `depth`, following
/// `gt_radixsort_str_get_code` exactly, including the mirrored
/// virtual-reverse-strand branch for `suffixnum > totallength`.
fn get_code(
    enc: &TwoBitEncoded,
    suffixnum: u64,
    depth: u64,
    equallengthplus1: u64,
    totallength: u64,
) -> Result<u16> {
    if suffixnum % equallengthplus1 + depth > equallengthplus1 - 2 {
        return Ok(LAST_BUCKET);
    }
    let pos = suffixnum + depth;
    if suffixnum <= totallength {
        let remaining = equallengthplus1 - 1 - pos % equallengthplus1;
        let mut code = enc.code4_at(pos as usize)? as u16;
        let mut overflow = 0u8;
        if remaining < KMERSIZE as u64 {
            overflow = (KMERSIZE as u64 - remaining) as u8;
            code |= (1u16 << (overflow * 2)) - 1;
        }
        Ok(bucketnum(code, overflow))
    } else {
        let mut pos = ((totallength + 1) << 1) - pos - 1;
        let remaining = pos % equallengthplus1;
        pos -= if remaining > KMERSIZE as u64 { KMERSIZE as u64 } else { remaining };
        let raw = enc.code4_at(pos as usize)? as u8;
        let mut code = revcompl_4mer_code(raw) as u16;
        let mut overflow = 0u8;
        if remaining < KMERSIZE as u64 {
            overflow = (KMERSIZE as u64 - remaining) as u8;
            code = (code << (overflow * 2)) | ((1u16 << (overflow * 2)) - 1);
        }
        Ok(bucketnum(code, overflow))
    }
}

fn insertion_sort(
    enc: &TwoBitEncoded,
    equallengthplus1: u64,
    maxdepth: Option<u64>,
    totallength: u64,
    bucket: &mut [u64],
    base_depth: u64,
) -> Result<()> {
    for i in 1..bucket.len() {
        let u = bucket[i];
        let mut j = i;
        while j > 0 {
            let v = bucket[j - 1];
            let mut depth = base_depth;
            let mut uvcmp = 0i32;
            let (mut unk, mut vnk) = (0u16, 0u16);
            loop {
                if !(maxdepth.map_or(true, |m| depth <= m) && uvcmp == 0 && !has_overflow(unk) && !has_overflow(vnk))
                {
                    break;
                }
                unk = get_code(enc, u, depth, equallengthplus1, totallength)?;
                vnk = get_code(enc, v, depth, equallengthplus1, totallength)?;
                uvcmp = vnk as i32 - unk as i32;
                depth += KMERSIZE as u64;
            }
            if uvcmp <= 0 {
                break;
            }
            bucket[j] = v;
            j -= 1;
        }
        bucket[j] = u;
    }
    Ok(())
}

struct Frame {
    start: usize,
    width: usize,
    depth: u64,
}

/// Sort `suffixes` (positions into records of length `equallengthplus1 -
/// 1`) by their 4-symbol k-mer codes starting at `depth`, per §4.D.
pub fn sort_equal_length(
    enc: &TwoBitEncoded,
    suffixes: &mut [u64],
    depth: u64,
    maxdepth: Option<u64>,
    equallengthplus1: u64,
    totallength: u64,
) -> Result<()> {
    if let Some(m) = maxdepth {
        if m < depth {
            return Err(EsaError::BadInput(format!("maxdepth {} < depth {}", m, depth)));
        }
    }
    if suffixes.len() < 2 {
        return Ok(());
    }

    let mut stack = vec![Frame {
        start: 0,
        width: suffixes.len(),
        depth,
    }];
    let mut oracle = vec![0u16; suffixes.len()];
    let mut sorted = vec![0u64; suffixes.len()];

    while let Some(frame) = stack.pop() {
        let bucket = &mut suffixes[frame.start..frame.start + frame.width];
        let oracle = &mut oracle[..bucket.len()];
        let sorted = &mut sorted[..bucket.len()];

        for (idx, &s) in bucket.iter().enumerate() {
            oracle[idx] = get_code(enc, s, frame.depth, equallengthplus1, totallength)?;
        }

        let mut bucket_size = vec![0usize; NOF_BUCKETS];
        for &code in oracle.iter() {
            bucket_size[code as usize] += 1;
        }
        let mut bucket_index = vec![0usize; NOF_BUCKETS];
        let mut previous = bucket_size[0];
        bucket_index[0] = 0;
        for idx in 1..NOF_BUCKETS {
            let tmp = bucket_index[idx - 1] + previous;
            previous = bucket_size[idx];
            bucket_index[idx] = tmp;
        }

        if bucket[0] > bucket[1] {
            for idx in (0..bucket.len()).rev() {
                let slot = &mut bucket_index[oracle[idx] as usize];
                sorted[*slot] = bucket[idx];
                *slot += 1;
            }
        } else {
            for idx in 0..bucket.len() {
                let slot = &mut bucket_index[oracle[idx] as usize];
                sorted[*slot] = bucket[idx];
                *slot += 1;
            }
        }
        bucket.copy_from_slice(sorted);

        let subdepth = frame.depth + KMERSIZE as u64;
        if subdepth < equallengthplus1 && maxdepth.map_or(true, |m| subdepth <= m) {
            let mut sub_start = frame.start;
            for idx in 0..NOF_BUCKETS {
                let end = bucket_index[idx];
                let start_in_bucket = if idx > 0 { bucket_index[idx - 1] } else { 0 };
                let sub_width = end - start_in_bucket;
                if sub_width > 1 {
                    if sub_width <= INSERTION_SORT_MAX {
                        insertion_sort(
                            enc,
                            equallengthplus1,
                            maxdepth,
                            totallength,
                            &mut suffixes[sub_start..sub_start + sub_width],
                            subdepth,
                        )?;
                    } else {
                        stack.push(Frame {
                            start: sub_start,
                            width: sub_width,
                            depth: subdepth,
                        });
                    }
                }
                sub_start += sub_width;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn build_encoding(records: &[&str]) -> TwoBitEncoded {
        let code_of = |b: u8| -> u8 {
            match b {
                b'A' => 0,
                b'C' => 1,
                b'G' => 2,
                b'T' => 3,
                _ => 0,
            }
        };
        let mut codes = Vec::new();
        for (i, r) in records.iter().enumerate() {
            for &b in r.as_bytes() {
                codes.push(code_of(b));
            }
            if i + 1 < records.len() {
                codes.push(0);
            }
        }
        TwoBitEncoded::encode(&codes, &HashMap::new())
    }

    #[test]
    fn sorts_equal_length_records() {
        let records = ["ACGT", "ACGA", "ACGG", "ACGC"];
        let enc = build_encoding(&records);
        let equallengthplus1 = 5u64;
        let totallength = (records.len() * 5 - 1) as u64;
        let mut suffixes: Vec<u64> = (0..records.len() as u64)
            .map(|i| i * equallengthplus1)
            .collect();
        sort_equal_length(&enc, &mut suffixes, 0, None, equallengthplus1, totallength).unwrap();
        // ACGA < ACGC < ACGG < ACGT
        assert_eq!(suffixes, vec![5, 15, 10, 0]);
    }

    #[test]
    fn rejects_maxdepth_below_depth() {
        let enc = build_encoding(&["ACGT"]);
        let mut suffixes = vec![0u64, 0u64];
        let err = sort_equal_length(&enc, &mut suffixes, 4, Some(2), 5, 3).unwrap_err();
        assert!(matches!(err, EsaError::BadInput(_)));
    }

    #[test]
    fn is_a_permutation_of_input() {
        let records = ["TTGG", "AACC", "GGTT", "CCAA", "ACGT"];
        let enc = build_encoding(&records);
        let equallengthplus1 = 5u64;
        let totallength = (records.len() * 5 - 1) as u64;
        let mut suffixes: Vec<u64> = (0..records.len() as u64)
            .map(|i| i * equallengthplus1)
            .collect();
        let original = suffixes.clone();
        sort_equal_length(&enc, &mut suffixes, 0, None, equallengthplus1, totallength).unwrap();
        let mut sorted_copy = suffixes.clone();
        sorted_copy.sort_unstable();
        let mut original_sorted = original.clone();
        original_sorted.sort_unstable();
        assert_eq!(sorted_copy, original_sorted);
    }

    #[test]
    fn random_inputs_are_permutations() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let alphabet = b"ACGT";
        for _ in 0..50 {
            let nrecords = rng.gen_range(2..16);
            let records: Vec<String> = (0..nrecords)
                .map(|_| {
                    (0..4)
                        .map(|_| alphabet[rng.gen_range(0..4)] as char)
                        .collect()
                })
                .collect();
            let refs: Vec<&str> = records.iter().map(|s| s.as_str()).collect();
            let enc = build_encoding(&refs);
            let equallengthplus1 = 5u64;
            let totallength = (nrecords * 5 - 1) as u64;
            let mut suffixes: Vec<u64> = (0..nrecords as u64).map(|i| i * equallengthplus1).collect();
            let original = suffixes.clone();
            sort_equal_length(&enc, &mut suffixes, 0, None, equallengthplus1, totallength).unwrap();
            let mut sorted_copy = suffixes.clone();
            sorted_copy.sort_unstable();
            let mut original_sorted = original.clone();
            original_sorted.sort_unstable();
            assert_eq!(sorted_copy, original_sorted);
        }
    }

    /// Records with duplicate content tie at every depth; their relative
    /// order in the output must match their relative order in the input
    /// (spec.md §8 property 4).
    #[test]
    fn stable_on_ties_preserves_input_order() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let nrecords = rng.gen_range(2..12);
            let reclen = 4;
            let alphabet = b"ACGT";
            let ndistinct = rng.gen_range(1..4);
            let distinct: Vec<String> = (0..ndistinct)
                .map(|_| {
                    (0..reclen)
                        .map(|_| alphabet[rng.gen_range(0..4)] as char)
                        .collect()
                })
                .collect();
            let records: Vec<String> = (0..nrecords)
                .map(|_| distinct[rng.gen_range(0..distinct.len())].clone())
                .collect();
            let refs: Vec<&str> = records.iter().map(|s| s.as_str()).collect();
            let enc = build_encoding(&refs);
            let equallengthplus1 = (reclen + 1) as u64;
            let totallength = (nrecords * (reclen + 1) - 1) as u64;
            let mut suffixes: Vec<u64> = (0..nrecords as u64).map(|i| i * equallengthplus1).collect();
            sort_equal_length(&enc, &mut suffixes, 0, None, equallengthplus1, totallength).unwrap();

            let mut seen_per_content: std::collections::HashMap<&str, Vec<usize>> =
                std::collections::HashMap::new();
            for &s in &suffixes {
                let idx = (s / equallengthplus1) as usize;
                seen_per_content.entry(records[idx].as_str()).or_default().push(idx);
            }
            for idxs in seen_per_content.values() {
                let mut sorted_idxs = idxs.clone();
                sorted_idxs.sort_unstable();
                assert_eq!(idxs, &sorted_idxs, "ties must keep their input-order relative position");
            }
        }
    }
}
