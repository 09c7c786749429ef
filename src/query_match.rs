// Adapted from GenomeTools' `GtQuerymatch` (`src/match/querymatch.c`, see
// `original_source`): the field set, the self-match canonical-ordering
// predicate (`gt_querymatch_okay`), the `querystart_fwdstrand` derivation,
// the identity/error-rate formulas, and the `gt_querymatch_coordinates_out`
// line grammar are kept; Karlin-Altschul statistics are abstracted behind
// a trait instead of `GtKarlinAltschulStat*`; the statistics module itself
// is treated as an opaque oracle here.

//! Query-match record and line formatter (§4.H).

use crate::encoding::ReadMode;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

fn is_reverse(mode: ReadMode) -> bool {
    matches!(mode, ReadMode::Reverse | ReadMode::ReverseComplement)
}

/// Optional Karlin-Altschul statistics, supplied by an external statistics
/// module; this crate only consumes its output.
pub trait EvalueStatistics {
    /// Returns `(evalue, bit_score)` for the given match composition.
    fn evaluate(&self, matches: u64, mismatches: u64, indels: u64) -> (f64, f64);
}

/// Which optional output columns to include, mirroring the C display flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayFlags {
    pub seed: bool,
    pub seqlength: bool,
    pub evalue: bool,
    pub bit_score: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Seed {
    pub pos1: u64,
    pub pos2: u64,
    pub len: u64,
}

/// One match between a database sequence and a query sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMatch {
    pub dbseqnum: u64,
    pub dbstart_relative: u64,
    pub dblen: u64,
    pub dbseqlen: u64,
    pub queryseqnum: u64,
    /// Match start within the query, relative to the query's own start, in
    /// `readmode`'s direction (not yet mapped to the forward strand).
    pub querystart: u64,
    pub querylen: u64,
    pub query_totallength: u64,
    pub readmode: ReadMode,
    /// `0` for an exact match; `None` means "no score computed" (distance
    /// and identity are then omitted from the formatted line).
    pub score: Option<i64>,
    pub distance: u64,
    pub mismatches: u64,
    pub seed: Option<Seed>,
    pub evalue: Option<f64>,
    pub bit_score: Option<f64>,
}

impl QueryMatch {
    /// `querystart` mapped onto the query's forward strand, following
    /// `gt_querymatch_querystart_derive`.
    pub fn querystart_fwdstrand(&self) -> u64 {
        if is_reverse(self.readmode) {
            self.query_totallength - self.querystart - self.querylen
        } else {
            self.querystart
        }
    }

    fn alignedlen(&self) -> u64 {
        self.dblen + self.querylen
    }

    /// `200 * distance / alignedlen`, following `gt_querymatch_error_rate`.
    pub fn error_rate(&self) -> f64 {
        200.0 * self.distance as f64 / self.alignedlen() as f64
    }

    /// Percent identity, following `gt_querymatch_similarity`.
    pub fn identity(&self) -> f64 {
        if self.distance == 0 {
            100.0
        } else {
            100.0 - self.error_rate()
        }
    }

    pub fn matches(&self) -> u64 {
        (self.alignedlen() - self.distance - self.mismatches) / 2
    }

    pub fn indels(&self) -> u64 {
        self.distance - self.mismatches
    }

    /// Fill `evalue`/`bit_score` from an external statistics oracle,
    /// following `gt_querymatch_evalue_bit_score`.
    pub fn with_statistics(mut self, stats: &dyn EvalueStatistics) -> Self {
        let (evalue, bit_score) = stats.evaluate(self.matches(), self.mismatches, self.indels());
        self.evalue = Some(evalue);
        self.bit_score = Some(bit_score);
        self
    }

    /// Self-match canonical ordering test (§4.H, `gt_querymatch_okay`): a
    /// self-match is emitted only once, for the lexicographically-smaller
    /// of its two occurrences, with a `≤` tie-break on reverse strand.
    pub fn is_canonical_self_match(&self) -> bool {
        if is_reverse(self.readmode) {
            self.dbseqnum < self.queryseqnum
                || (self.dbseqnum == self.queryseqnum
                    && self.dbstart_relative <= self.querystart_fwdstrand())
        } else {
            self.dbseqnum < self.queryseqnum
                || (self.dbseqnum == self.queryseqnum
                    && self.dbstart_relative < self.querystart_fwdstrand())
        }
    }

    /// Render the output line, following `gt_querymatch_coordinates_out`'s
    /// exact column order and number formatting, terminated by `\n`.
    pub fn format_line(&self, display: &DisplayFlags) -> String {
        let mut out = String::new();
        if display.seed {
            if let Some(seed) = self.seed {
                let _ = write!(out, "# seed:\t{}\t{}\t{}\n", seed.pos1, seed.pos2, seed.len);
            }
        }
        let strand = self.readmode.strand_tag();
        let _ = write!(
            out,
            "{} {} {} {} {} {} {}",
            self.dblen,
            self.dbseqnum,
            self.dbstart_relative,
            strand,
            self.querylen,
            self.queryseqnum,
            self.querystart_fwdstrand(),
        );
        if let Some(score) = self.score {
            if score > 0 {
                let _ = write!(out, " {} {} {:.2}", score, self.distance, self.identity());
            }
        }
        if display.seqlength {
            let _ = write!(out, " {} {}", self.dbseqlen, self.query_totallength);
        }
        if display.evalue {
            if let Some(evalue) = self.evalue {
                let _ = write!(out, " {:.0e}", evalue);
            }
        }
        if display.bit_score {
            if let Some(bit_score) = self.bit_score {
                let _ = write!(out, " {:.1}", bit_score);
            }
        }
        out.push('\n');
        out
    }
}

/// Stable sort by `(queryseqnum, querystart_fwd + querylen)`, per §4.H.
pub fn sort_matches(matches: &mut [QueryMatch], descending: bool) {
    matches.sort_by(|a, b| {
        let ka = (a.queryseqnum, a.querystart_fwdstrand() + a.querylen);
        let kb = (b.queryseqnum, b.querystart_fwdstrand() + b.querylen);
        if descending {
            kb.cmp(&ka)
        } else {
            ka.cmp(&kb)
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_match() -> QueryMatch {
        QueryMatch {
            dbseqnum: 0,
            dbstart_relative: 0,
            dblen: 10,
            dbseqlen: 100,
            queryseqnum: 1,
            querystart: 5,
            querylen: 10,
            query_totallength: 100,
            readmode: ReadMode::Forward,
            score: Some(17),
            distance: 2,
            mismatches: 2,
            seed: None,
            evalue: None,
            bit_score: None,
        }
    }

    #[test]
    fn forward_querystart_fwdstrand_is_identity() {
        let m = base_match();
        assert_eq!(m.querystart_fwdstrand(), 5);
    }

    #[test]
    fn reverse_querystart_fwdstrand_is_mirrored() {
        let mut m = base_match();
        m.readmode = ReadMode::Reverse;
        assert_eq!(m.querystart_fwdstrand(), 100 - 5 - 10);
    }

    #[test]
    fn exact_match_has_full_identity() {
        let mut m = base_match();
        m.distance = 0;
        assert_eq!(m.identity(), 100.0);
    }

    #[test]
    fn canonical_self_match_requires_dbstart_strictly_less_on_forward() {
        let mut m = base_match();
        m.queryseqnum = m.dbseqnum;
        m.querystart = 0;
        m.dbstart_relative = 0;
        // querystart_fwdstrand == dbstart_relative on forward strand: not canonical (needs strict <)
        assert!(!m.is_canonical_self_match());
    }

    #[test]
    fn canonical_self_match_allows_equal_on_reverse_strand() {
        let mut m = base_match();
        m.readmode = ReadMode::Reverse;
        m.queryseqnum = m.dbseqnum;
        m.dbstart_relative = m.querystart_fwdstrand();
        assert!(m.is_canonical_self_match());
    }

    #[test]
    fn format_line_includes_score_block_only_when_positive() {
        let mut m = base_match();
        m.score = Some(0);
        let line = m.format_line(&DisplayFlags::default());
        assert_eq!(line.trim_end(), "10 0 0 F 10 1 5");
    }

    #[test]
    fn format_line_with_positive_score() {
        let m = base_match();
        let line = m.format_line(&DisplayFlags::default());
        assert_eq!(line.trim_end(), "10 0 0 F 10 1 5 17 2 80.00");
    }

    #[test]
    fn self_match_at_equal_forward_coordinates_is_suppressed_but_emitted_on_revcompl() {
        let mut m = base_match();
        m.dbseqnum = 2;
        m.dbstart_relative = 10;
        m.queryseqnum = 2;
        m.querystart = 10;
        m.querylen = 0;
        m.query_totallength = 20;

        m.readmode = ReadMode::Forward;
        assert_eq!(m.querystart_fwdstrand(), 10);
        assert!(!m.is_canonical_self_match());

        m.readmode = ReadMode::ReverseComplement;
        assert_eq!(m.querystart_fwdstrand(), 10);
        assert!(m.is_canonical_self_match());
    }

    #[test]
    fn sort_is_stable_ascending_by_queryseqnum_then_end() {
        let mut a = base_match();
        a.queryseqnum = 2;
        a.querystart = 0;
        a.querylen = 3;
        let mut b = base_match();
        b.queryseqnum = 1;
        let mut matches = vec![a, b];
        sort_matches(&mut matches, false);
        assert_eq!(matches[0].queryseqnum, 1);
        assert_eq!(matches[1].queryseqnum, 2);
    }
}
