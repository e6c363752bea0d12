use std::path::Path;

use log::debug;

use super::{Barcode, BarcodeCounts};
use crate::fileformat::{AlignmentStore, HtsAlignmentStore, Read};
use crate::runtime::{Result, StoreParams};

///////////////////////////////
/// Reads looked up by molecular barcode. The wrapped store is sorted by barcode with
/// one reference block per barcode, so a barcode query is a single block fetch
pub struct BarcodeReadStore<S: AlignmentStore> {
    store: S,
    params: StoreParams,
}

impl BarcodeReadStore<HtsAlignmentStore> {
    /// Open a barcode-sorted, indexed BAM/CRAM. Failure here is fatal for the caller
    pub fn open<P: AsRef<Path>>(path: P, params: &StoreParams) -> Result<Self> {
        let store = HtsAlignmentStore::open(path)?;
        Ok(Self::new(store, params))
    }
}

impl<S: AlignmentStore> BarcodeReadStore<S> {
    pub fn new(store: S, params: &StoreParams) -> Self {
        BarcodeReadStore {
            store,
            params: params.clone(),
        }
    }

    pub fn params(&self) -> &StoreParams {
        &self.params
    }

    /// Unmapped, mate missing or unmapped, or aligned with poor mapping quality
    pub fn is_weird(&self, read: &Read) -> bool {
        is_weird(read, self.params.poor_alignment_max_mapq)
    }

    /// Whether the store's index has a block for the barcode
    pub fn contains(&self, barcode: &Barcode) -> bool {
        self.store.has_block(barcode.as_str())
    }

    /// All reads of the barcode's block. An unknown barcode gives an empty list
    pub fn fetch_by_barcode(&mut self, barcode: &Barcode) -> Result<Vec<Read>> {
        if !self.contains(barcode) {
            debug!("Barcode {} not present in store", barcode);
            return Ok(Vec::new());
        }

        let weird_only = self.params.weird_reads_only;
        let max_mapq = self.params.poor_alignment_max_mapq;
        let reads = self
            .store
            .fetch_block(barcode.as_str(), |read| !weird_only || is_weird(read, max_mapq))?
            .unwrap_or_default();
        debug!("Barcode {}: {} reads", barcode, reads.len());
        Ok(reads)
    }

    /// Blocks of every barcode, concatenated in iteration order. A read stored under
    /// two of the barcodes appears twice
    pub fn fetch_by_barcodes<'a, I>(&mut self, barcodes: I) -> Result<Vec<Read>>
    where
        I: IntoIterator<Item = &'a Barcode>,
    {
        let mut reads = Vec::new();
        for barcode in barcodes {
            reads.extend(self.fetch_by_barcode(barcode)?);
        }
        Ok(reads)
    }
}

pub fn is_weird(read: &Read, poor_alignment_max_mapq: u8) -> bool {
    !read.is_mapped() || !read.is_mate_mapped() || read.mapq <= poor_alignment_max_mapq
}

/// Tally the `BX` tags of a read collection. Untagged reads are skipped
pub fn collect_barcodes<'a, I>(reads: I) -> BarcodeCounts
where
    I: IntoIterator<Item = &'a Read>,
{
    reads.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fileformat::{InMemoryStore, FLAG_MATE_UNMAPPED, FLAG_PAIRED, FLAG_UNMAPPED};

    fn store() -> BarcodeReadStore<InMemoryStore> {
        let mut mem = InMemoryStore::new();
        mem.push("AAAA_1", Read::new("a1", b"ACGT").with_barcode("AAAA-1").with_mapq(0));
        mem.push("AAAA_1", Read::new("a2", b"ACGT").with_barcode("AAAA-1").with_mapq(60));
        mem.push("CCCC_1", Read::new("c1", b"ACGT").with_barcode("CCCC-1").with_mapq(3));
        let params = StoreParams {
            weird_reads_only: false,
            ..StoreParams::default()
        };
        BarcodeReadStore::new(mem, &params)
    }

    #[test]
    fn test_weird_threshold_is_inclusive() {
        let read = Read::new("r", b"ACGT").with_mapq(10);
        assert!(is_weird(&read, 10));
        assert!(!is_weird(&read.clone().with_mapq(11), 10));
        assert!(is_weird(&read.clone().with_mapq(60).with_flags(FLAG_PAIRED | FLAG_UNMAPPED), 10));
        assert!(is_weird(
            &read.clone().with_mapq(60).with_flags(FLAG_PAIRED | FLAG_MATE_UNMAPPED),
            10
        ));
        assert!(is_weird(&read.with_mapq(60).with_flags(0), 10));
    }

    #[test]
    fn test_unknown_barcode_is_empty() {
        let mut store = store();
        assert!(!store.contains(&Barcode::new("GGGG-1")));
        assert!(store.fetch_by_barcode(&Barcode::new("GGGG-1")).unwrap().is_empty());
    }

    #[test]
    fn test_presence_follows_block_index() {
        let mut store = store();
        store.params.weird_reads_only = true;
        assert!(store.contains(&Barcode::new("AAAA-1")));
        assert!(store.contains(&Barcode::new("CCCC_1")));

        let mut mem = InMemoryStore::new();
        mem.push("TTTT_1", Read::new("t1", b"ACGT").with_mapq(60));
        let mut healthy_only = BarcodeReadStore::new(mem, &StoreParams::default());
        assert!(healthy_only.contains(&Barcode::new("TTTT-1")));
        assert!(healthy_only.fetch_by_barcode(&Barcode::new("TTTT-1")).unwrap().is_empty());
    }

    #[test]
    fn test_fetch_is_idempotent_and_normalized() {
        let mut store = store();
        let first = store.fetch_by_barcode(&Barcode::new("AAAA-1")).unwrap();
        let again = store.fetch_by_barcode(&Barcode::new("AAAA_1")).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first, again);
    }

    #[test]
    fn test_weird_only_filter() {
        let mut store = store();
        store.params.weird_reads_only = true;
        let reads = store.fetch_by_barcode(&Barcode::new("AAAA_1")).unwrap();
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].qname, "a1");
    }

    #[test]
    fn test_fetch_many_keeps_duplicates() {
        let mut store = store();
        let a = Barcode::new("AAAA_1");
        let c = Barcode::new("CCCC_1");
        let reads = store.fetch_by_barcodes([&c, &a, &c]).unwrap();
        let names: Vec<&str> = reads.iter().map(|r| r.qname.as_str()).collect();
        assert_eq!(names, vec!["c1", "a1", "a2", "c1"]);
    }

    #[test]
    fn test_collect_is_order_independent() {
        let reads = vec![
            Read::new("a", b"A").with_barcode("X"),
            Read::new("b", b"A").with_barcode("Y"),
            Read::new("c", b"A").with_barcode("X"),
        ];
        let forward = collect_barcodes(&reads);
        let backward = collect_barcodes(reads.iter().rev());
        assert_eq!(forward, backward);
    }
}
