//! (w,k)-minimizer sketches and the bucketed minimizer index

use crate::fileformat::NamedSequence;
use crate::runtime::{AlignerParams, Error, Result};

/// 2-bit code of a base, `None` for anything ambiguous
#[inline(always)]
fn base_code(b: u8) -> Option<u64> {
    match b {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

/// Invertible integer hash over the low bits selected by `mask`
#[inline(always)]
pub fn hash64(key: u64, mask: u64) -> u64 {
    let mut key = (!key).wrapping_add(key << 21) & mask;
    key ^= key >> 24;
    key = key.wrapping_add(key << 3).wrapping_add(key << 8) & mask;
    key ^= key >> 14;
    key = key.wrapping_add(key << 2).wrapping_add(key << 4) & mask;
    key ^= key >> 28;
    key = key.wrapping_add(key << 31) & mask;
    key
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Minimizer {
    pub hash: u64,
    /// Start of the k-mer in the uncompressed sequence
    pub pos: u32,
    /// Uncompressed bases covered by the k-mer
    pub span: u32,
    /// The canonical k-mer is the reverse complement of the sequence
    pub rev: bool,
}

#[derive(Clone, Copy)]
struct Kmer {
    hash: u64,
    pos: u32,
    span: u32,
    rev: bool,
}

/// Canonical minimizers of `seq`. Ambiguous bases reset the k-mer; palindromic k-mers
/// are skipped. With `hpc`, runs of one base count as a single base
pub fn sketch(seq: &[u8], k: usize, w: usize, hpc: bool) -> Vec<Minimizer> {
    let mask = if k >= 32 { u64::MAX } else { (1u64 << (2 * k)) - 1 };
    let shift = 2 * (k as u64 - 1);
    let mut out = Vec::new();

    let mut segment: Vec<Kmer> = Vec::new();
    // uncompressed start of each of the last k compressed bases
    let mut starts: std::collections::VecDeque<usize> = std::collections::VecDeque::with_capacity(k + 1);
    let (mut fwd, mut rev) = (0u64, 0u64);
    let mut prev: Option<u64> = None;

    for (i, &b) in seq.iter().enumerate() {
        let Some(c) = base_code(b) else {
            select_minimizers(&segment, w, &mut out);
            segment.clear();
            starts.clear();
            prev = None;
            continue;
        };
        if hpc && prev == Some(c) {
            continue;
        }
        prev = Some(c);

        fwd = ((fwd << 2) | c) & mask;
        rev = (rev >> 2) | ((3 - c) << shift);
        starts.push_back(i);
        if starts.len() > k {
            starts.pop_front();
        }
        if starts.len() < k {
            continue;
        }
        if fwd == rev {
            continue;
        }
        let start = starts[0];
        // span runs to the end of the current homopolymer run when compressing
        let mut end = i + 1;
        if hpc {
            while end < seq.len() && base_code(seq[end]) == Some(c) {
                end += 1;
            }
        }
        let (code, is_rev) = if fwd < rev { (fwd, false) } else { (rev, true) };
        segment.push(Kmer {
            hash: hash64(code, mask),
            pos: start as u32,
            span: (end - start) as u32,
            rev: is_rev,
        });
    }
    select_minimizers(&segment, w, &mut out);
    out
}

/// Smallest hash of every window of `w` consecutive k-mers, ties included. A segment
/// shorter than one window contributes its overall minimum
fn select_minimizers(kmers: &[Kmer], w: usize, out: &mut Vec<Minimizer>) {
    if kmers.is_empty() {
        return;
    }
    let w = w.clamp(1, kmers.len());
    let mut last_pushed: Option<usize> = None;
    for start in 0..=(kmers.len() - w) {
        let window = &kmers[start..start + w];
        let Some(min) = window.iter().map(|km| km.hash).min() else {
            continue;
        };
        for (offset, km) in window.iter().enumerate() {
            let idx = start + offset;
            if km.hash == min && last_pushed.map_or(true, |p| idx > p) {
                out.push(Minimizer {
                    hash: km.hash,
                    pos: km.pos,
                    span: km.span,
                    rev: km.rev,
                });
                last_pushed = Some(idx);
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub hash: u64,
    pub target: u32,
    pub pos: u32,
    pub span: u32,
    pub rev: bool,
}

///////////////////////////////
/// Minimizers of all targets, split over `2^bucket_bits` buckets by the low bits of the
/// hash and sorted by hash within a bucket
#[derive(Clone, Debug)]
pub struct MinimizerIndex {
    buckets: Vec<Vec<IndexEntry>>,
    bucket_mask: u64,
    k: usize,
    w: usize,
    hpc: bool,
}

impl MinimizerIndex {
    pub fn build(targets: &[NamedSequence], params: &AlignerParams) -> Result<Self> {
        if targets.is_empty() {
            return Err(Error::alignment_index(Some("no target sequences")));
        }
        if let Some(empty) = targets.iter().find(|t| t.is_empty()) {
            return Err(Error::alignment_index(Some(format!(
                "target {} is empty",
                empty.name
            ))));
        }
        if params.bucket_bits == 0 || params.bucket_bits > 20 {
            return Err(Error::alignment_index(Some(format!(
                "bucket bits {} out of range",
                params.bucket_bits
            ))));
        }

        let n_buckets = 1usize << params.bucket_bits;
        let bucket_mask = (n_buckets - 1) as u64;
        let mut buckets: Vec<Vec<IndexEntry>> = vec![Vec::new(); n_buckets];
        for (tid, target) in targets.iter().enumerate() {
            let minimizers = sketch(
                &target.seq,
                params.minimizer_k,
                params.minimizer_w,
                params.homopolymer_compressed,
            );
            for m in minimizers {
                buckets[(m.hash & bucket_mask) as usize].push(IndexEntry {
                    hash: m.hash,
                    target: tid as u32,
                    pos: m.pos,
                    span: m.span,
                    rev: m.rev,
                });
            }
        }
        for bucket in &mut buckets {
            bucket.sort_unstable_by_key(|e| (e.hash, e.target, e.pos));
        }

        Ok(MinimizerIndex {
            buckets,
            bucket_mask,
            k: params.minimizer_k,
            w: params.minimizer_w,
            hpc: params.homopolymer_compressed,
        })
    }

    pub fn lookup(&self, hash: u64) -> &[IndexEntry] {
        let bucket = &self.buckets[(hash & self.bucket_mask) as usize];
        let lo = bucket.partition_point(|e| e.hash < hash);
        let hi = bucket.partition_point(|e| e.hash <= hash);
        &bucket[lo..hi]
    }

    pub fn sketch(&self, seq: &[u8]) -> Vec<Minimizer> {
        sketch(seq, self.k, self.w, self.hpc)
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bio::alphabets::dna;

    #[test]
    fn test_hash_is_invertible_on_small_domain() {
        let mask = (1u64 << 8) - 1;
        let mut seen = std::collections::HashSet::new();
        for key in 0..=mask {
            assert!(seen.insert(hash64(key, mask)));
        }
    }

    #[test]
    fn test_sketch_is_strand_symmetric() {
        let seq = b"ACGTTGCAAGGCTTACCGATGGCATCAGTTCGAACTGGTACCATGCGTAGC";
        let rc = dna::revcomp(seq);
        let mut a: Vec<u64> = sketch(seq, 11, 5, false).iter().map(|m| m.hash).collect();
        let mut b: Vec<u64> = sketch(&rc, 11, 5, false).iter().map(|m| m.hash).collect();
        a.sort_unstable();
        b.sort_unstable();
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn test_ambiguous_base_breaks_kmers() {
        let seq = b"ACGTTGCAAGNGCTTACCGAT";
        for m in sketch(seq, 5, 1, false) {
            let kmer = &seq[m.pos as usize..(m.pos + m.span) as usize];
            assert!(!kmer.contains(&b'N'));
        }
    }

    #[test]
    fn test_homopolymer_compression_spans() {
        let seq = b"AAAACCCGTTTTTGCA";
        let minimizers = sketch(seq, 4, 1, true);
        assert!(!minimizers.is_empty());
        assert!(minimizers.iter().any(|m| m.span > 4));
    }

    #[test]
    fn test_index_rejects_empty_targets() {
        let params = AlignerParams::default();
        assert!(MinimizerIndex::build(&[], &params).is_err());
        let targets = vec![NamedSequence::new("t", Vec::new())];
        assert!(matches!(
            MinimizerIndex::build(&targets, &params),
            Err(Error::AlignmentIndex { .. })
        ));
    }

    #[test]
    fn test_lookup_finds_indexed_minimizers() {
        let params = AlignerParams::default();
        let seq = b"ACGTTGCAAGGCTTACCGATGGCATCAGTTCGAACTGGTACCATGCGTAGCTAACGGTCAT".to_vec();
        let index = MinimizerIndex::build(&[NamedSequence::new("t", seq.clone())], &params).unwrap();
        assert!(!index.is_empty());
        for m in index.sketch(&seq) {
            assert!(index.lookup(m.hash).iter().any(|e| e.pos == m.pos));
        }
    }
}
