// Adapted from GenomeTools' local-alignment variant in
// `extended/linearalign_affinegapcost.c` (`gt_computelinearalign_affinegapcost`
// with a local cost function, see `original_source`): track a fourth
// "restart at zero" state alongside R/D/I, record the best total score and
// its start coordinate while sweeping, then hand the extracted window to
// the global aligner via `AffineScores::to_costs`.

//! Linear-space local (Smith-Waterman-style) affine-gap alignment (§4.G).

use super::linear_space::{self, LinspaceLimits};
use super::AffineScores;
use crate::alignment::{Alignment, AlignmentMode};
use crate::util::{add_safe_min, SAFE_MIN};

/// Find the highest-scoring local alignment window between `u` and `v`
/// under affine gap scores, then solve that window exactly with the global
/// aligner (converted to costs via `AffineScores::to_costs`).
pub fn align_local(u: &[u8], v: &[u8], scores: &AffineScores, limits: &LinspaceLimits) -> Alignment {
    let m = u.len();
    let n = v.len();
    if m == 0 || n == 0 {
        return Alignment {
            score: 0,
            ystart: 0,
            xstart: 0,
            yend: 0,
            xend: 0,
            ylen: n,
            xlen: m,
            operations: Vec::new(),
            mode: AlignmentMode::Local,
        };
    }

    let window = best_window(u, v, scores);
    if window.best_score <= 0 {
        return Alignment {
            score: 0,
            ystart: 0,
            xstart: 0,
            yend: 0,
            xend: 0,
            ylen: n,
            xlen: m,
            operations: Vec::new(),
            mode: AlignmentMode::Local,
        };
    }

    let costs = scores.to_costs();
    let u_window = &u[window.ustart..window.uend];
    let v_window = &v[window.vstart..window.vend];
    let global = linear_space::align_global(u_window, v_window, &costs, limits);

    Alignment {
        score: window.best_score,
        xstart: window.ustart,
        ystart: window.vstart,
        xend: window.uend,
        yend: window.vend,
        xlen: m,
        ylen: n,
        operations: global.operations,
        mode: AlignmentMode::Local,
    }
}

struct Window {
    best_score: i64,
    ustart: usize,
    uend: usize,
    vstart: usize,
    vend: usize,
}

/// One column of the four-state sweep: `r`/`d`/`i` are the three affine DP
/// states, `total` is their max floored at 0 (the restart-at-zero rule),
/// and `*_start` is the `(u, v)` coordinate at which the run backing that
/// state's current value began.
struct StateColumn {
    r: Vec<i64>,
    d: Vec<i64>,
    i: Vec<i64>,
    total: Vec<i64>,
    r_start: Vec<(usize, usize)>,
    d_start: Vec<(usize, usize)>,
    i_start: Vec<(usize, usize)>,
}

impl StateColumn {
    fn new(m: usize) -> Self {
        StateColumn {
            r: vec![SAFE_MIN; m + 1],
            d: vec![SAFE_MIN; m + 1],
            i: vec![SAFE_MIN; m + 1],
            total: vec![0; m + 1],
            r_start: vec![(0, 0); m + 1],
            d_start: vec![(0, 0); m + 1],
            i_start: vec![(0, 0); m + 1],
        }
    }
}

/// The `(u, v)` coordinate backing `total[row]`: whichever of `r`/`d`/`i`
/// achieves it (`R > D > I` tie-break), or, once `total` has been floored
/// to 0, the coordinate the floor itself was recorded at (`r_start`,
/// `d_start` and `i_start` are kept equal at that point).
fn run_origin(col: &StateColumn, row: usize) -> (usize, usize) {
    if col.total[row] == 0 {
        col.r_start[row]
    } else {
        match crate::alignment::pairwise::set_edge_max(col.r[row], col.d[row], col.i[row]) {
            crate::alignment::pairwise::Edge::R => col.r_start[row],
            crate::alignment::pairwise::Edge::D => col.d_start[row],
            crate::alignment::pairwise::Edge::I => col.i_start[row],
            crate::alignment::pairwise::Edge::X => unreachable!(),
        }
    }
}

/// Four-state (R, D, I, and implicit restart-at-zero) forward DP sweep,
/// following `nextAStabcolumn`/`firstAStabcolumn`: `R` is a single term
/// from the diagonal predecessor's floored total, `D`/`I` each choose
/// between continuing their own gap or reopening from a floored total, and
/// only the combined `total` is floored at 0 (not `R`, `D`, `I`
/// individually). The best total cell gives the local alignment's window.
fn best_window(u: &[u8], v: &[u8], scores: &AffineScores) -> Window {
    let m = u.len();
    let n = v.len();
    let go_ge = scores.gap_open + scores.gap_extend;

    let mut col = StateColumn::new(m);
    for row in 1..=m {
        col.d[row] = go_ge;
        col.total[row] = col.r[row].max(col.d[row]).max(col.i[row]).max(0);
        col.r_start[row] = (row, 0);
        col.d_start[row] = (row, 0);
        col.i_start[row] = (row, 0);
    }

    let mut best = Window {
        best_score: 0,
        ustart: 0,
        uend: 0,
        vstart: 0,
        vend: 0,
    };

    for cidx in 1..=n {
        let mut new_col = StateColumn::new(m);
        new_col.i[0] = go_ge;
        new_col.total[0] = new_col.r[0].max(new_col.d[0]).max(new_col.i[0]).max(0);
        new_col.r_start[0] = (0, cidx);
        new_col.d_start[0] = (0, cidx);
        new_col.i_start[0] = (0, cidx);

        for row in 1..=m {
            let sym_score = scores.score(u[row - 1], v[cidx - 1]);

            new_col.r[row] = add_safe_min(col.total[row - 1], sym_score);
            new_col.r_start[row] = run_origin(&col, row - 1);

            let d_continue = add_safe_min(new_col.d[row - 1], scores.gap_extend);
            let d_reopen = add_safe_min(new_col.total[row - 1], go_ge);
            new_col.d[row] = d_continue.max(d_reopen);
            new_col.d_start[row] = if d_continue >= d_reopen {
                new_col.d_start[row - 1]
            } else {
                run_origin(&new_col, row - 1)
            };

            let i_continue = add_safe_min(col.i[row], scores.gap_extend);
            let i_reopen = add_safe_min(col.total[row], go_ge);
            new_col.i[row] = i_continue.max(i_reopen);
            new_col.i_start[row] = if i_continue >= i_reopen {
                col.i_start[row]
            } else {
                run_origin(&col, row)
            };

            new_col.total[row] = new_col.r[row].max(new_col.d[row]).max(new_col.i[row]).max(0);
            if new_col.total[row] == 0 {
                let here = (row, cidx);
                new_col.r_start[row] = here;
                new_col.d_start[row] = here;
                new_col.i_start[row] = here;
            }

            if new_col.total[row] > best.best_score {
                let origin = run_origin(&new_col, row);
                best = Window {
                    best_score: new_col.total[row],
                    ustart: origin.0,
                    uend: row,
                    vstart: origin.1,
                    vend: cidx,
                };
            }
        }

        col = new_col;
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores() -> AffineScores {
        AffineScores {
            match_score: 2,
            mismatch_score: -1,
            gap_open: -2,
            gap_extend: -1,
        }
    }

    #[test]
    fn finds_strong_local_core() {
        let u = b"ACGTTGAC";
        let v = b"TTGACGTA";
        let limits = LinspaceLimits::default();
        let aln = align_local(u, v, &scores(), &limits);
        assert!(aln.score > 0);
        assert!(aln.x_aln_len() <= u.len());
        assert!(aln.y_aln_len() <= v.len());
    }

    #[test]
    fn no_positive_score_gives_empty_alignment() {
        let u = b"AAAA";
        let v = b"TTTT";
        let limits = LinspaceLimits::default();
        let aln = align_local(u, v, &scores(), &limits);
        assert_eq!(aln.score, 0);
        assert!(aln.operations.is_empty());
    }

    #[test]
    fn exact_five_mer_core_scores_thirty() {
        // u="ACGTTGAC", v="TTGACGTA": "TTGAC" occurs in both (u[3..8],
        // v[0..5]) with no gaps or mismatches needed, so the optimum is
        // exactly 5 matches at 6 points each.
        let u = b"ACGTTGAC";
        let v = b"TTGACGTA";
        let scores = AffineScores {
            match_score: 6,
            mismatch_score: -3,
            gap_open: -2,
            gap_extend: -1,
        };
        let limits = LinspaceLimits::default();
        let aln = align_local(u, v, &scores, &limits);
        assert_eq!(aln.score, 30);
    }
}
