// Adapted from GenomeTools' generic bottom-up LCP-interval driver
// (`esa-bottomup.h`, referenced from `src/match/esa-spmsk.c`, see
// `original_source`) and its suffix-prefix-match specialization
// (`gt_spmsk_processleafedge`/`gt_spmsk_processlcpinterval`): the stack of
// open intervals, the `firstinW` bookkeeping (mirrored here for Lset too,
// since both sets need scoping to the interval that owns them), and the
// W/L-set emission rule at interval close are kept; multi-sequence boundary
// lookups are abstracted behind `SequenceLayout` instead of `GtEncseq`.

//! Bottom-up LCP interval traversal and suffix-prefix match engine (§4.E).

/// Maps absolute positions in a concatenated multi-record text to sequence
/// numbers and sequence-boundary tests, standing in for `GtEncseq`'s
/// separator queries.
pub struct SequenceLayout {
    /// Start offset of each sequence, in increasing order.
    starts: Vec<u64>,
    /// One-past-the-last real-symbol offset of each sequence; for all but
    /// the final sequence this is exactly its separator byte's position.
    ends: Vec<u64>,
    totallength: u64,
}

impl SequenceLayout {
    /// Build a layout from sequence lengths (not counting separators); a
    /// one-symbol separator is assumed between consecutive sequences.
    pub fn from_lengths(lengths: &[u64]) -> Self {
        let mut starts = Vec::with_capacity(lengths.len());
        let mut ends = Vec::with_capacity(lengths.len());
        let mut pos = 0u64;
        for (i, &len) in lengths.iter().enumerate() {
            starts.push(pos);
            pos += len;
            ends.push(pos);
            if i + 1 < lengths.len() {
                pos += 1; // separator byte
            }
        }
        SequenceLayout {
            starts,
            ends,
            totallength: pos,
        }
    }

    pub fn totallength(&self) -> u64 {
        self.totallength
    }

    pub fn seqnum(&self, pos: u64) -> usize {
        match self.starts.binary_search(&pos) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }

    /// Whether `pos` is a separator byte or the virtual end-of-text
    /// sentinel; `pos` strictly inside a sequence's own span is not a
    /// boundary even though it lies between two `starts` entries.
    pub fn is_boundary(&self, pos: u64) -> bool {
        if pos >= self.totallength {
            return true;
        }
        self.ends[..self.ends.len() - 1].contains(&pos)
    }
}

struct Interval {
    lcp: u64,
    lb: usize,
    first_in_w: usize,
    first_in_l: usize,
}

/// One emitted suffix-prefix match: `(l_seqnum, w_seqnum, overlap_len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuffixPrefixMatch {
    pub l_seqnum: usize,
    pub w_seqnum: usize,
    pub overlap: u64,
}

/// A leaf registered into W/L-set: its sequence and its absolute start
/// position, the latter kept only to reject a leaf pairing with itself
/// (the whole-sequence-reaches-both-boundaries degenerate case).
#[derive(Clone, Copy)]
struct SetEntry {
    seqnum: usize,
    startpos: u64,
}

/// Drive the bottom-up traversal over `suftab`/`lcptab` (same length,
/// `lcptab[0]` unused) and collect every suffix-prefix match of overlap at
/// least `minmatchlength`, following §4.E.
///
/// Each leaf's matching depth is the lcp of whichever neighbor (left or
/// right in sorted order) it is deeper with, i.e. the lcp-interval it is an
/// immediate child of; a leaf registered for one index is finalized only
/// once its owning interval is known, which requires looking at the
/// following index's lcp value before committing a depth (`pending`/
/// `registered` below defer that decision by exactly one step).
pub fn suffix_prefix_matches(
    suftab: &[u64],
    lcptab: &[u64],
    layout: &SequenceLayout,
    minmatchlength: u64,
) -> Vec<SuffixPrefixMatch> {
    assert_eq!(suftab.len(), lcptab.len(), "suftab/lcptab length mismatch");
    let mut matches = Vec::new();
    if suftab.is_empty() {
        return matches;
    }

    let mut wset: Vec<SetEntry> = Vec::new();
    let mut lset: Vec<SetEntry> = Vec::new();
    let mut stack = vec![Interval {
        lcp: 0,
        lb: 0,
        first_in_w: 0,
        first_in_l: 0,
    }];

    let process_leaf_edge = |fd: u64, pos: u64, wset: &mut Vec<SetEntry>, lset: &mut Vec<SetEntry>| {
        if fd >= minmatchlength {
            let seqnum = layout.seqnum(pos);
            if pos == 0 || layout.is_boundary(pos - 1) {
                wset.push(SetEntry { seqnum, startpos: pos });
            }
            if pos + fd == layout.totallength() || layout.is_boundary(pos + fd) {
                lset.push(SetEntry { seqnum, startpos: pos });
            }
        }
    };

    let process_lcp_interval = |lcp: u64,
                                 first_in_w: usize,
                                 first_in_l: usize,
                                 wset: &mut Vec<SetEntry>,
                                 lset: &mut Vec<SetEntry>,
                                 matches: &mut Vec<SuffixPrefixMatch>| {
        if lcp >= minmatchlength {
            for &l in &lset[first_in_l..] {
                for &w in &wset[first_in_w..] {
                    if l.startpos == w.startpos {
                        continue;
                    }
                    matches.push(SuffixPrefixMatch {
                        l_seqnum: l.seqnum,
                        w_seqnum: w.seqnum,
                        overlap: lcp,
                    });
                }
            }
            lset.truncate(first_in_l);
        } else {
            wset.clear();
        }
    };

    let mut pending = suftab[0];
    for i in 1..suftab.len() {
        let mut registered = false;
        if lcptab[i] < stack.last().unwrap().lcp {
            process_leaf_edge(stack.last().unwrap().lcp, pending, &mut wset, &mut lset);
            registered = true;
        }
        let mut lb = i - 1;
        let mut popped_bounds: Option<(usize, usize)> = None;
        while stack.last().unwrap().lcp > lcptab[i] {
            let top = stack.pop().unwrap();
            process_lcp_interval(
                top.lcp,
                top.first_in_w,
                top.first_in_l,
                &mut wset,
                &mut lset,
                &mut matches,
            );
            lb = top.lb;
            popped_bounds = Some((top.first_in_w, top.first_in_l));
        }
        if stack.last().unwrap().lcp < lcptab[i] {
            let (first_in_w, first_in_l) =
                popped_bounds.unwrap_or_else(|| (wset.len(), lset.len()));
            stack.push(Interval {
                lcp: lcptab[i],
                lb,
                first_in_w,
                first_in_l,
            });
        }
        if !registered {
            process_leaf_edge(stack.last().unwrap().lcp, pending, &mut wset, &mut lset);
        }
        pending = suftab[i];
    }
    process_leaf_edge(stack.last().unwrap().lcp, pending, &mut wset, &mut lset);

    while stack.len() > 1 {
        let top = stack.pop().unwrap();
        process_lcp_interval(
            top.lcp,
            top.first_in_w,
            top.first_in_l,
            &mut wset,
            &mut lset,
            &mut matches,
        );
    }

    matches
}


impl std::hash::Hash for SuffixPrefixMatch {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.l_seqnum.hash(state);
        self.w_seqnum.hash(state);
        self.overlap.hash(state);
    }
}
