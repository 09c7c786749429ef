// Adapted from `bio::alignment::pairwise`'s `Scoring`/`MatchFunc` pair (this
// crate's teacher uses the same shape for its banded Smith-Waterman
// aligner), narrowed to the linear-space affine-gap cost model of
// GenomeTools' `extended/affinealign.h` / `linearalign_affinegapcost.c`.

//! Shared types for the linear-space affine-gap aligners: global
//! (`linear_space`, Hirschberg crosspoint recursion) and local
//! (`linear_space_local`, Smith-Waterman variant).

pub mod linear_space;
pub mod linear_space_local;

/// A symbol-pair cost/score function. Blanket-implemented for any matching
/// closure, following `bio::alignment::pairwise::MatchFunc`.
pub trait MatchFunc: Fn(u8, u8) -> i64 {}
impl<T: Fn(u8, u8) -> i64> MatchFunc for T {}

/// Affine gap-cost parameters for the global (cost-minimizing) aligner.
#[derive(Debug, Clone, Copy)]
pub struct AffineCosts {
    pub match_cost: i64,
    pub mismatch_cost: i64,
    pub gap_open: i64,
    pub gap_extend: i64,
}

impl AffineCosts {
    pub fn cost(&self, a: u8, b: u8) -> i64 {
        if crate::util::symbols_equal(a, b) {
            self.match_cost
        } else {
            self.mismatch_cost
        }
    }
}

/// Affine gap-score parameters for the local (score-maximizing) aligner.
#[derive(Debug, Clone, Copy)]
pub struct AffineScores {
    pub match_score: i64,
    pub mismatch_score: i64,
    pub gap_open: i64,
    pub gap_extend: i64,
}

impl AffineScores {
    pub fn score(&self, a: u8, b: u8) -> i64 {
        if crate::util::symbols_equal(a, b) {
            self.match_score
        } else {
            self.mismatch_score
        }
    }

    /// Convert this score scheme to an equivalent cost scheme for the
    /// global linear-space aligner, following
    /// `change_score_to_cost_affine_function` in
    /// `extended/linearalign_affinegapcost.c`:
    /// `max = max(ceil(match/2), ceil(mismatch/2), 1 + gap_extend)`,
    /// `cost = 2*max - score`.
    pub fn to_costs(&self) -> AffineCosts {
        let ceil_div2 = |v: i64| -> i64 {
            if v >= 0 {
                (v + 1) / 2
            } else {
                v / 2
            }
        };
        let max = ceil_div2(self.match_score)
            .max(ceil_div2(self.mismatch_score))
            .max(1 + self.gap_extend)
            .max(0);
        AffineCosts {
            match_cost: 2 * max - self.match_score,
            mismatch_cost: 2 * max - self.mismatch_score,
            gap_open: -self.gap_open,
            gap_extend: max - self.gap_extend,
        }
    }
}

/// The three affine DP states, plus the "undefined" entry edge `X` used to
/// seed column 0. Ordering matches `original_source`'s `AffineAlignEdge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    R,
    D,
    I,
    X,
}

/// Pick the edge achieving the minimum of the three costs, with tie-break
/// `R > D > I` (first minimum wins), matching `set_edge` in
/// `extended/linearalign_affinegapcost.c`.
pub fn set_edge_min(r: i64, d: i64, i: i64) -> Edge {
    let minval = r.min(d).min(i);
    if r == minval {
        Edge::R
    } else if d == minval {
        Edge::D
    } else {
        Edge::I
    }
}

/// Pick the edge achieving the maximum of the three scores, with the same
/// `R > D > I` tie-break convention, used by the local aligner.
pub fn set_edge_max(r: i64, d: i64, i: i64) -> Edge {
    let maxval = r.max(d).max(i);
    if r == maxval {
        Edge::R
    } else if d == maxval {
        Edge::D
    } else {
        Edge::I
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tie_break_prefers_r_then_d() {
        assert_eq!(set_edge_min(1, 1, 1), Edge::R);
        assert_eq!(set_edge_min(2, 1, 1), Edge::D);
        assert_eq!(set_edge_min(2, 2, 1), Edge::I);
    }

    #[test]
    fn score_to_cost_is_order_preserving_for_ties() {
        let scores = AffineScores {
            match_score: 6,
            mismatch_score: -3,
            gap_open: -2,
            gap_extend: -1,
        };
        let costs = scores.to_costs();
        assert!(costs.match_cost <= costs.mismatch_cost);
        assert!(costs.gap_extend >= 0);
    }
}
