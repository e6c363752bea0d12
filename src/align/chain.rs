use super::minimizer::{Minimizer, MinimizerIndex};
use crate::runtime::AlignerParams;

/// A shared minimizer between query and target. `q` is on the query strand that
/// matches the target forward strand
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Anchor {
    pub target: u32,
    pub rev: bool,
    pub t: i64,
    pub q: i64,
    pub span: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chain {
    pub target: u32,
    pub rev: bool,
    pub score: i32,
    /// Ascending in both target and query
    pub anchors: Vec<Anchor>,
}

/// Pair every query minimizer with its occurrences in the index
pub fn collect_anchors(index: &MinimizerIndex, query: &[Minimizer], query_len: usize) -> Vec<Anchor> {
    let mut anchors = Vec::new();
    for m in query {
        for e in index.lookup(m.hash) {
            let rev = m.rev != e.rev;
            let q = if rev {
                query_len as i64 - (m.pos as i64 + m.span as i64)
            } else {
                m.pos as i64
            };
            anchors.push(Anchor {
                target: e.target,
                rev,
                t: e.pos as i64,
                q,
                span: e.span as i64,
            });
        }
    }
    anchors.sort_unstable();
    anchors.dedup();
    anchors
}

fn ilog2(x: i64) -> i64 {
    if x <= 1 {
        0
    } else {
        63 - x.leading_zeros() as i64
    }
}

/// Co-linear chaining by dynamic programming over sorted anchors. Each anchor looks back
/// at most `max_chain_iter` predecessors within `max_gap` and the diagonal `bandwidth`,
/// and gives up after `max_chain_skip` predecessors that do not improve its score
pub fn chain_anchors(anchors: &[Anchor], params: &AlignerParams) -> Vec<Chain> {
    let n = anchors.len();
    if n == 0 {
        return Vec::new();
    }
    let max_gap = params.max_gap as i64;
    let bandwidth = params.bandwidth as i64;

    let mut score = vec![0i64; n];
    let mut parent: Vec<Option<usize>> = vec![None; n];

    let mut group_start = 0;
    for i in 0..n {
        let ai = &anchors[i];
        if i > 0 && (anchors[i - 1].target, anchors[i - 1].rev) != (ai.target, ai.rev) {
            group_start = i;
        }
        let mut best = ai.span;
        let mut best_j = None;
        let mut skipped = 0;
        let lowest = group_start.max(i.saturating_sub(params.max_chain_iter));

        for j in (lowest..i).rev() {
            let aj = &anchors[j];
            let dt = ai.t - aj.t;
            if dt > max_gap {
                break;
            }
            let dq = ai.q - aj.q;
            if dt <= 0 || dq <= 0 || dq > max_gap {
                continue;
            }
            let dd = (dt - dq).abs();
            if dd > bandwidth {
                continue;
            }
            let gain = dt.min(dq).min(ai.span);
            let gap_cost = (dd as f64 * 0.01 * ai.span as f64) as i64 + (ilog2(dd) >> 1);
            let candidate = score[j] + gain - gap_cost;
            if candidate > best {
                best = candidate;
                best_j = Some(j);
                skipped = 0;
            } else {
                skipped += 1;
                if skipped > params.max_chain_skip {
                    break;
                }
            }
        }
        score[i] = best;
        parent[i] = best_j;
    }

    // backtrack from the best ends; every anchor belongs to at most one chain
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| score[b].cmp(&score[a]).then(a.cmp(&b)));
    let mut used = vec![false; n];
    let mut chains = Vec::new();
    for end in order {
        if used[end] || score[end] < params.min_chain_score as i64 {
            continue;
        }
        let mut members = Vec::new();
        let mut cursor = Some(end);
        let mut stop_score = 0;
        while let Some(i) = cursor {
            if used[i] {
                stop_score = score[i];
                break;
            }
            used[i] = true;
            members.push(anchors[i]);
            cursor = parent[i];
        }
        let chain_score = score[end] - stop_score;
        if chain_score < params.min_chain_score as i64 {
            continue;
        }
        members.reverse();
        chains.push(Chain {
            target: anchors[end].target,
            rev: anchors[end].rev,
            score: chain_score as i32,
            anchors: members,
        });
    }
    chains
}
