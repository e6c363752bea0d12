use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use rust_htslib::bam::{self, FetchDefinition, Read as HtsRead};

use super::Read;
use crate::runtime::{Error, Result};

///////////////////////////////
/// An indexed alignment file. One cursor per instance: every query repositions it,
/// so a store must not be shared between concurrently running windows
pub trait AlignmentStore {
    /// All reads overlapping the 1-based inclusive region `contig:start-end`.
    /// An unknown contig gives an empty result
    fn fetch_region(&mut self, contig: &str, start: u64, end: u64) -> Result<Vec<Read>>;

    /// Every read of the contiguous block stored under `name`, in file order, that
    /// passes `keep`. `None` when the index has no such block
    fn fetch_block<F>(&mut self, name: &str, keep: F) -> Result<Option<Vec<Read>>>
    where
        F: FnMut(&Read) -> bool;

    fn has_block(&self, name: &str) -> bool;
}

///////////////////////////////
/// htslib-backed store over a BAM/CRAM file with its index
pub struct HtsAlignmentStore {
    reader: bam::IndexedReader,
    path: PathBuf,
}

impl HtsAlignmentStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = bam::IndexedReader::from_path(path)
            .map_err(|e| Error::store_open(path, Some(e.to_string())))?;
        debug!(
            "Opened alignment store {:?} with {} reference blocks",
            path,
            reader.header().target_count()
        );
        Ok(HtsAlignmentStore {
            reader,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tid(&self, name: &str) -> Option<u32> {
        self.reader.header().tid(name.as_bytes())
    }

    /// Drain the current fetch. A fresh record per read, so every pushed Read owns its data
    fn drain_fetch<F>(&mut self, mut keep: F) -> Result<Vec<Read>>
    where
        F: FnMut(&Read) -> bool,
    {
        let mut reads = Vec::new();
        let mut record = bam::Record::new();
        while let Some(result) = self.reader.read(&mut record) {
            result?;
            let read = Read::from_record(&record);
            if keep(&read) {
                reads.push(read);
            }
        }
        Ok(reads)
    }
}

impl AlignmentStore for HtsAlignmentStore {
    fn fetch_region(&mut self, contig: &str, start: u64, end: u64) -> Result<Vec<Read>> {
        let Some(tid) = self.tid(contig) else {
            debug!("Contig {} not present in {:?}", contig, self.path);
            return Ok(Vec::new());
        };
        let begin = start.saturating_sub(1) as i64;
        self.reader
            .fetch(FetchDefinition::Region(tid as i32, begin, end as i64))?;
        self.drain_fetch(|_| true)
    }

    fn fetch_block<F>(&mut self, name: &str, keep: F) -> Result<Option<Vec<Read>>>
    where
        F: FnMut(&Read) -> bool,
    {
        let Some(tid) = self.tid(name) else {
            return Ok(None);
        };
        self.reader.fetch(FetchDefinition::CompleteTid(tid as i32))?;
        self.drain_fetch(keep).map(Some)
    }

    fn has_block(&self, name: &str) -> bool {
        self.tid(name).is_some()
    }
}

///////////////////////////////
/// Store kept entirely in memory, keyed by contig (or barcode block) name.
/// Useful for callers that already hold their reads, and for tests
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    blocks: BTreeMap<String, Vec<Read>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<N: Into<String>>(&mut self, name: N, read: Read) {
        self.blocks.entry(name.into()).or_default().push(read);
    }

    pub fn len(&self) -> usize {
        self.blocks.values().map(|reads| reads.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlignmentStore for InMemoryStore {
    fn fetch_region(&mut self, contig: &str, start: u64, end: u64) -> Result<Vec<Read>> {
        let begin = start.saturating_sub(1) as i64;
        let end = end as i64;
        Ok(self
            .blocks
            .get(contig)
            .map(|reads| {
                reads
                    .iter()
                    .filter(|r| r.overlaps(begin, end))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn fetch_block<F>(&mut self, name: &str, mut keep: F) -> Result<Option<Vec<Read>>>
    where
        F: FnMut(&Read) -> bool,
    {
        Ok(self
            .blocks
            .get(name)
            .map(|reads| reads.iter().filter(|r| keep(r)).cloned().collect()))
    }

    fn has_block(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_store_fails() {
        let result = HtsAlignmentStore::open("/nonexistent/store.bam");
        assert!(matches!(result, Err(Error::StoreOpen { .. })));
    }

    #[test]
    fn test_memory_region_query() {
        let mut store = InMemoryStore::new();
        store.push("chr1", Read::new("a", b"ACGTACGTAC").placed_at(99));
        store.push("chr1", Read::new("b", b"ACGTACGTAC").placed_at(500));
        store.push("chr2", Read::new("c", b"ACGTACGTAC").placed_at(99));

        let reads = store.fetch_region("chr1", 100, 200).unwrap();
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].qname, "a");
        assert!(store.fetch_region("chrX", 1, 1000).unwrap().is_empty());
    }

    #[test]
    fn test_memory_block_filter() {
        let mut store = InMemoryStore::new();
        store.push("AAAA_1", Read::new("a", b"ACGT").with_mapq(0));
        store.push("AAAA_1", Read::new("b", b"ACGT").with_mapq(60));

        let low = store.fetch_block("AAAA_1", |r| r.mapq < 10).unwrap().unwrap();
        assert_eq!(low.len(), 1);
        assert!(store.fetch_block("CCCC_1", |_| true).unwrap().is_none());
        assert!(store.has_block("AAAA_1"));
    }
}
