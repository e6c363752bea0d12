use bio::alphabets::dna;
use bio::data_structures::suffix_array::suffix_array;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use super::graph::StringGraph;
use super::read_table::ReadTable;
use super::simplify::transitive_reduction;
use crate::fileformat::asqg::ASQG_VERSION;
use crate::fileformat::{AsqgGraph, AsqgHeader, Overlap, SeqCoord, VertexRecord};
use crate::runtime::{AssemblyParams, Error, Result};

const SENTINEL: u8 = b'$';

///////////////////////////////
/// Computes all pairwise overlaps of a read table. The result holds one vertex per
/// entry, flagged when contained in another entry, and one record per accepted overlap
pub trait OverlapEngine {
    fn compute(&self, table: &ReadTable, params: &AssemblyParams) -> Result<AsqgGraph>;
}

///////////////////////////////
/// Seed-and-verify overlapper over two generalized suffix arrays: one of the reads
/// as given and one of their reverse complements
#[derive(Clone, Copy, Debug, Default)]
pub struct SuffixArrayOverlapper;

struct ReadIndex {
    text: Vec<u8>,
    sa: Vec<usize>,
    starts: Vec<usize>,
}

impl ReadIndex {
    fn build<'a, I: IntoIterator<Item = &'a [u8]>>(seqs: I) -> Self {
        let mut text = Vec::new();
        let mut starts = Vec::new();
        for seq in seqs {
            starts.push(text.len());
            text.extend_from_slice(seq);
            text.push(SENTINEL);
        }
        let sa = suffix_array(&text);
        ReadIndex { text, sa, starts }
    }

    /// Every occurrence of `pattern` as (read index, offset in read)
    fn locate(&self, pattern: &[u8]) -> Vec<(usize, usize)> {
        let n = self.text.len();
        let k = pattern.len();
        let prefix = |s: usize| &self.text[s..(s + k).min(n)];
        let lo = self.sa.partition_point(|&s| prefix(s) < pattern);
        let hi = self.sa.partition_point(|&s| prefix(s) <= pattern);
        self.sa[lo..hi]
            .iter()
            .map(|&pos| {
                let read = self.starts.partition_point(|&s| s <= pos) - 1;
                (read, pos - self.starts[read])
            })
            .collect()
    }
}

/// Offsets where seeds are taken: every `stride` bases, plus the last full seed
fn seed_positions(len: usize, seed_length: usize, stride: usize) -> Vec<usize> {
    if len < seed_length {
        return Vec::new();
    }
    let last = len - seed_length;
    let mut positions: Vec<usize> = (0..=last).step_by(stride.max(1)).collect();
    if positions.last() != Some(&last) {
        positions.push(last);
    }
    positions
}

/// Ungapped overlap of `a` and `b` on diagonal `diag` (a[x] pairs with b[x - diag]).
/// Half-open intervals on a and b plus the number of mismatches
fn verify(
    a: &[u8],
    b: &[u8],
    diag: isize,
    params: &AssemblyParams,
) -> Option<((usize, usize), (usize, usize), usize)> {
    let la = a.len() as isize;
    let lb = b.len() as isize;
    let a_start = diag.max(0);
    let a_end = la.min(lb + diag);
    if a_end - a_start < params.min_overlap as isize {
        return None;
    }
    let (a_start, a_end) = (a_start as usize, a_end as usize);
    let b_start = (a_start as isize - diag) as usize;
    let len = a_end - a_start;

    let max_diff = params.max_diff(len);
    let mut diff = 0;
    for (x, y) in a[a_start..a_end].iter().zip(&b[b_start..b_start + len]) {
        if x != y {
            diff += 1;
            if diff > max_diff {
                return None;
            }
        }
    }
    Some(((a_start, a_end), (b_start, b_start + len), diff))
}

impl OverlapEngine for SuffixArrayOverlapper {
    fn compute(&self, table: &ReadTable, params: &AssemblyParams) -> Result<AsqgGraph> {
        let header = AsqgHeader {
            version: ASQG_VERSION,
            error_rate: params.error_rate,
            min_overlap: params.min_overlap,
            containment: true,
            transitive: !params.irreducible_only,
        };
        let mut asqg = AsqgGraph::new(header);
        if table.is_empty() {
            return Ok(asqg);
        }
        if params.seed_length == 0 || params.seed_length > params.min_overlap {
            return Err(Error::graph_build(Some(format!(
                "seed length {} incompatible with minimum overlap {}",
                params.seed_length, params.min_overlap
            ))));
        }

        let entries = table.entries();
        let forward: Vec<&[u8]> = entries.iter().map(|e| e.seq.as_slice()).collect();
        let reverse: Vec<Vec<u8>> = entries.iter().map(|e| dna::revcomp(&e.seq)).collect();
        let fwd_index = ReadIndex::build(forward.iter().copied());
        let rev_index = ReadIndex::build(reverse.iter().map(|s| s.as_slice()));
        debug!(
            "Built overlap indexes over {} reads ({} bases)",
            entries.len(),
            fwd_index.text.len()
        );

        // best overlap per (lower read, higher read, reverse)
        let mut best: FxHashMap<(usize, usize, bool), Overlap> = FxHashMap::default();
        let mut seen: FxHashSet<(usize, bool, isize)> = FxHashSet::default();

        for (i, a) in forward.iter().enumerate() {
            seen.clear();
            for p in seed_positions(a.len(), params.seed_length, params.seed_stride) {
                let seed = &a[p..p + params.seed_length];
                for (is_reverse, index) in [(false, &fwd_index), (true, &rev_index)] {
                    for (j, q) in index.locate(seed) {
                        if j == i {
                            continue;
                        }
                        let diag = p as isize - q as isize;
                        if !seen.insert((j, is_reverse, diag)) {
                            continue;
                        }
                        let b: &[u8] = if is_reverse { &reverse[j] } else { forward[j] };
                        let Some(((a_s, a_e), (b_s, b_e), diff)) = verify(a, b, diag, params)
                        else {
                            continue;
                        };

                        let a_coord = SeqCoord::new(a_s, a_e - 1, a.len());
                        let mut b_coord = SeqCoord::new(b_s, b_e - 1, b.len());
                        if is_reverse {
                            b_coord = b_coord.flipped();
                        }
                        let (lo, hi, coords) = if i < j {
                            (i, j, [a_coord, b_coord])
                        } else {
                            (j, i, [b_coord, a_coord])
                        };
                        let candidate = Overlap {
                            ids: [entries[lo].id.clone(), entries[hi].id.clone()],
                            coords,
                            is_reverse,
                            num_diff: diff,
                        };
                        let slot = best.entry((lo, hi, is_reverse));
                        slot.and_modify(|current| {
                            let better = candidate.coords[0].len() > current.coords[0].len()
                                || (candidate.coords[0].len() == current.coords[0].len()
                                    && candidate.num_diff < current.num_diff);
                            if better {
                                *current = candidate.clone();
                            }
                        })
                        .or_insert_with(|| candidate.clone());
                    }
                }
            }
        }

        let mut overlaps: Vec<((usize, usize, bool), Overlap)> = best.into_iter().collect();
        overlaps.sort_by_key(|(key, _)| *key);

        let mut contained = vec![false; entries.len()];
        for ((lo, hi, _), ovr) in &overlaps {
            match ovr.contained_idx() {
                Some(0) => contained[*lo] = true,
                Some(_) => contained[*hi] = true,
                None => {}
            }
        }
        for (entry, substring) in entries.iter().zip(contained) {
            asqg.vertices.push(VertexRecord {
                id: entry.id.clone(),
                seq: String::from_utf8_lossy(&entry.seq).to_string(),
                substring,
            });
        }
        asqg.overlaps = overlaps.into_iter().map(|(_, ovr)| ovr).collect();
        debug!(
            "Found {} overlaps, {} contained reads",
            asqg.overlaps.len(),
            asqg.vertices.iter().filter(|v| v.substring).count()
        );

        if params.irreducible_only {
            let mut graph = StringGraph::from_asqg(&asqg)?;
            let removed = transitive_reduction(&mut graph);
            debug!("Removed {} transitive overlaps", removed);
            return Ok(graph.to_asqg(true, false));
        }
        Ok(asqg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(min_overlap: usize) -> AssemblyParams {
        AssemblyParams {
            min_overlap,
            seed_length: 8,
            seed_stride: 4,
            ..AssemblyParams::default()
        }
    }

    fn table(seqs: &[&[u8]], min_overlap: usize) -> ReadTable {
        let mut table = ReadTable::new(min_overlap);
        for s in seqs {
            assert!(table.push(s.to_vec()));
        }
        table
    }

    const GENOME: &[u8] = b"ACGTTGCAAGGCTTACCGATGGCATCAGTTCGAACTGGTACCATGCGTAGCTAACGGTCAT";

    #[test]
    fn test_seed_positions_include_last() {
        assert_eq!(seed_positions(20, 8, 5), vec![0, 5, 10, 12]);
        assert_eq!(seed_positions(16, 8, 4), vec![0, 4, 8]);
        assert!(seed_positions(5, 8, 4).is_empty());
    }

    #[test]
    fn test_forward_dovetail() {
        let t = table(&[&GENOME[0..40], &GENOME[20..60]], 12);
        let asqg = SuffixArrayOverlapper.compute(&t, &params(12)).unwrap();
        assert_eq!(asqg.vertices.len(), 2);
        assert_eq!(asqg.overlaps.len(), 1);
        let ovr = &asqg.overlaps[0];
        assert_eq!(ovr.ids, ["1".to_string(), "2".to_string()]);
        assert_eq!(ovr.coords[0], SeqCoord::new(20, 39, 40));
        assert_eq!(ovr.coords[1], SeqCoord::new(0, 19, 40));
        assert!(!ovr.is_reverse);
        assert!(ovr.is_dovetail());
    }

    #[test]
    fn test_reverse_dovetail() {
        let rc = dna::revcomp(&GENOME[20..60]);
        let t = table(&[&GENOME[0..40], &rc], 12);
        let asqg = SuffixArrayOverlapper.compute(&t, &params(12)).unwrap();
        assert_eq!(asqg.overlaps.len(), 1);
        let ovr = &asqg.overlaps[0];
        assert!(ovr.is_reverse);
        assert_eq!(ovr.coords[0], SeqCoord::new(20, 39, 40));
        assert_eq!(ovr.coords[1], SeqCoord::new(20, 39, 40));
        assert!(ovr.is_dovetail());
    }

    #[test]
    fn test_containment_and_duplicates() {
        let t = table(&[&GENOME[0..50], &GENOME[10..30], &GENOME[0..50]], 12);
        let asqg = SuffixArrayOverlapper.compute(&t, &params(12)).unwrap();
        let flags: Vec<bool> = asqg.vertices.iter().map(|v| v.substring).collect();
        assert_eq!(flags, vec![false, true, true]);
        assert!(asqg.overlaps.iter().all(|o| o.is_containment()));
    }

    #[test]
    fn test_short_overlaps_rejected() {
        let t = table(&[&GENOME[0..40], &GENOME[30..60]], 12);
        let asqg = SuffixArrayOverlapper.compute(&t, &params(12)).unwrap();
        assert!(asqg.overlaps.is_empty());
    }

    #[test]
    fn test_mismatch_needs_error_budget() {
        let mut b = GENOME[20..60].to_vec();
        b[5] = if b[5] == b'A' { b'C' } else { b'A' };
        let t = table(&[&GENOME[0..40], &b], 12);

        let exact = SuffixArrayOverlapper.compute(&t, &params(12)).unwrap();
        assert!(exact.overlaps.is_empty());

        let mut loose = params(12);
        loose.error_rate = 0.05;
        let asqg = SuffixArrayOverlapper.compute(&t, &loose).unwrap();
        assert_eq!(asqg.overlaps.len(), 1);
        assert_eq!(asqg.overlaps[0].num_diff, 1);
    }

    #[test]
    fn test_irreducible_only_drops_transitive_edge() {
        let t = table(&[&GENOME[0..30], &GENOME[10..40], &GENOME[16..46]], 12);
        let full = SuffixArrayOverlapper.compute(&t, &params(12)).unwrap();
        assert_eq!(full.overlaps.len(), 3);
        assert!(full.header.transitive);

        let mut p = params(12);
        p.irreducible_only = true;
        let reduced = SuffixArrayOverlapper.compute(&t, &p).unwrap();
        assert_eq!(reduced.overlaps.len(), 2);
        assert!(!reduced.header.transitive);
    }

    #[test]
    fn test_empty_table() {
        let asqg = SuffixArrayOverlapper
            .compute(&ReadTable::new(12), &params(12))
            .unwrap();
        assert!(asqg.vertices.is_empty());
        assert!(asqg.overlaps.is_empty());
    }
}
