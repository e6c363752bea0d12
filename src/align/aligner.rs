use bio::alphabets::dna;
use log::debug;
use rustc_hash::FxHashSet;

use super::chain::{chain_anchors, collect_anchors, Chain};
use super::extend::align_banded;
use super::hit::AlignmentHit;
use super::minimizer::MinimizerIndex;
use crate::assembly::Window;
use crate::fileformat::{NamedSequence, Read, ReferenceGenome};
use crate::runtime::{AlignerParams, Result};

const MAX_MAPQ: f64 = 60.0;
// extra band around the chain's own diagonal drift
const BAND_SLACK: usize = 16;

///////////////////////////////
/// Minimizer index over one or more targets, aligning queries with chaining and banded
/// extension. Owns its targets and index; hits are returned by value
#[derive(Clone, Debug)]
pub struct SequenceAligner {
    targets: Vec<NamedSequence>,
    index: MinimizerIndex,
    params: AlignerParams,
}

impl SequenceAligner {
    /// Fails with `Error::AlignmentIndex` when there are no targets or one is empty
    pub fn build_index(targets: Vec<NamedSequence>, params: &AlignerParams) -> Result<Self> {
        let targets: Vec<NamedSequence> = targets
            .into_iter()
            .map(|t| NamedSequence::new(t.name, t.seq.to_ascii_uppercase()))
            .collect();
        let index = MinimizerIndex::build(&targets, params)?;
        debug!(
            "Indexed {} minimizers over {} targets",
            index.len(),
            targets.len()
        );
        Ok(SequenceAligner {
            targets,
            index,
            params: params.clone(),
        })
    }

    pub fn single_target(target: NamedSequence, params: &AlignerParams) -> Result<Self> {
        Self::build_index(vec![target], params)
    }

    /// Index the reference bases under `window`, named `contig_start_end`
    pub fn from_reference_region(
        genome: &ReferenceGenome,
        window: &Window,
        params: &AlignerParams,
    ) -> Result<Self> {
        let target = genome.fetch_window(&window.contig, window.start, window.end)?;
        Self::single_target(target, params)
    }

    pub fn targets(&self) -> &[NamedSequence] {
        &self.targets
    }

    pub fn params(&self) -> &AlignerParams {
        &self.params
    }

    /// All hits of all queries. A query repeated with the same name and sequence is
    /// aligned once
    pub fn align(&self, queries: &[NamedSequence]) -> Vec<AlignmentHit> {
        let mut seen: FxHashSet<&NamedSequence> = FxHashSet::default();
        let mut hits = Vec::new();
        for query in queries {
            if seen.insert(query) {
                hits.extend(self.align_query(query));
            }
        }
        hits
    }

    /// Align every read by query name. Repeated reads are kept, each with its own hits
    pub fn align_reads(&self, reads: &[Read]) -> Vec<AlignmentHit> {
        reads
            .iter()
            .flat_map(|r| self.align_query(&NamedSequence::new(r.qname.clone(), r.seq.clone())))
            .collect()
    }

    /// Hits of one query, best first
    pub fn align_query(&self, query: &NamedSequence) -> Vec<AlignmentHit> {
        if query.is_empty() {
            return Vec::new();
        }
        let fwd = query.seq.to_ascii_uppercase();
        let rc = dna::revcomp(&fwd);

        let minimizers = self.index.sketch(&fwd);
        let anchors = collect_anchors(&self.index, &minimizers, fwd.len());
        let chains = chain_anchors(&anchors, &self.params);

        let mut hits: Vec<AlignmentHit> = chains
            .iter()
            .filter_map(|chain| {
                let seq = if chain.rev { &rc } else { &fwd };
                self.extend_chain(&query.name, seq, chain)
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.target_name.cmp(&b.target_name))
                .then_with(|| a.target_start.cmp(&b.target_start))
                .then_with(|| a.query_start.cmp(&b.query_start))
        });
        // chains that extend to the same alignment report it once
        hits.dedup_by(|b, a| {
            a.target_name == b.target_name
                && a.reverse == b.reverse
                && (a.target_start, a.target_end) == (b.target_start, b.target_end)
                && (a.query_start, a.query_end) == (b.query_start, b.query_end)
        });

        let best = hits.first().map(|h| h.score);
        let second = hits.get(1).map(|h| h.score);
        for (rank, hit) in hits.iter_mut().enumerate() {
            hit.rank = rank;
            hit.mapq = if rank == 0 { mapq(best, second) } else { 0 };
        }
        hits
    }

    fn extend_chain(&self, query_name: &str, seq: &[u8], chain: &Chain) -> Option<AlignmentHit> {
        let (first, last) = (chain.anchors.first()?, chain.anchors.last()?);
        let target = &self.targets[chain.target as usize];
        let (qlen, tlen) = (seq.len() as i64, target.len() as i64);

        let base_diag = first.t - first.q;
        let drift = chain
            .anchors
            .iter()
            .map(|a| ((a.t - a.q) - base_diag).unsigned_abs() as usize)
            .max()
            .unwrap_or(0);
        let band = self.params.bandwidth.max(drift + BAND_SLACK);

        // the query's unanchored ends may still align, plus room for indels
        let win_start = (first.t - first.q - band as i64).max(0);
        let win_end = (last.t + last.span + (qlen - last.q - last.span) + band as i64).min(tlen);
        if win_end <= win_start {
            return None;
        }
        let window = &target.seq[win_start as usize..win_end as usize];
        let diag = base_diag - win_start;

        let zdrop = if chain.rev {
            self.params.zdrop_inv
        } else {
            self.params.zdrop
        };
        let ext = align_banded(seq, window, diag, band, &self.params, zdrop)?;

        let (query_start, query_end) = if chain.rev {
            (seq.len() - ext.q_end, seq.len() - ext.q_start)
        } else {
            (ext.q_start, ext.q_end)
        };
        Some(AlignmentHit {
            query_name: query_name.to_string(),
            query_len: seq.len(),
            query_start,
            query_end,
            target_name: target.name.clone(),
            target_len: target.len(),
            target_start: win_start as usize + ext.t_start,
            target_end: win_start as usize + ext.t_end,
            rank: 0,
            reverse: chain.rev,
            cigar: ext.cigar,
            score: ext.score,
            mapq: 0,
        })
    }
}

/// 60 for a unique hit, scaled down as the runner-up closes in on the best
fn mapq(best: Option<i32>, second: Option<i32>) -> u8 {
    match (best, second) {
        (Some(b), _) if b <= 0 => 0,
        (Some(_), None) => MAX_MAPQ as u8,
        (Some(b), Some(s)) => {
            let frac = 1.0 - (s.max(0) as f64 / b as f64);
            (MAX_MAPQ * frac).round().clamp(0.0, MAX_MAPQ) as u8
        }
        (None, _) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Error;

    const REFERENCE: &[u8] = b"GATTACAGGCTTAACCGTAGCATCGGATCCATGCAATGGCTAGCTAGGTCAACGTTAGCCGATCGATTGCAGTCCATGGATCCGTAGACTGACTTGCAAGCTTAGCGCATGCCTAGGACTCCGTAAGTCGACGTAGCTGATCCGATGCTAGTTCAGGCATCAGTAACGGTACCGTTAGCAGTCGATCGGTAC";

    #[test]
    fn test_empty_target_set_is_rejected() {
        let params = AlignerParams::default();
        assert!(matches!(
            SequenceAligner::build_index(Vec::new(), &params),
            Err(Error::AlignmentIndex { .. })
        ));
    }

    #[test]
    fn test_mapq() {
        assert_eq!(mapq(Some(100), None), 60);
        assert_eq!(mapq(Some(100), Some(100)), 0);
        assert_eq!(mapq(Some(100), Some(50)), 30);
        assert_eq!(mapq(None, None), 0);
    }

    #[test]
    fn test_forward_and_reverse_queries() {
        let params = AlignerParams::default();
        let aligner =
            SequenceAligner::single_target(NamedSequence::new("ref", REFERENCE.to_vec()), &params)
                .unwrap();

        let fwd = NamedSequence::new("fwd", REFERENCE[40..140].to_vec());
        let rev = NamedSequence::new("rev", dna::revcomp(&REFERENCE[40..140]));
        let hits = aligner.align(&[fwd.clone(), rev, fwd]);
        assert_eq!(hits.len(), 2);

        let f = &hits[0];
        assert_eq!(f.query_name, "fwd");
        assert_eq!((f.target_start, f.target_end), (40, 140));
        assert_eq!((f.query_start, f.query_end), (0, 100));
        assert_eq!(f.cigar.to_string(), "100M");
        assert_eq!((f.rank, f.mapq, f.strand()), (0, 60, '+'));

        let r = &hits[1];
        assert_eq!(r.query_name, "rev");
        assert_eq!((r.target_start, r.target_end), (40, 140));
        assert_eq!((r.query_start, r.query_end), (0, 100));
        assert_eq!(r.strand(), '-');
    }

    #[test]
    fn test_unrelated_query_has_no_hits() {
        let params = AlignerParams::default();
        let aligner =
            SequenceAligner::single_target(NamedSequence::new("ref", REFERENCE.to_vec()), &params)
                .unwrap();
        let polya = NamedSequence::new("polya", vec![b'A'; 80]);
        assert!(aligner.align(&[polya]).is_empty());
    }
}
