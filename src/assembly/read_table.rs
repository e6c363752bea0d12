use bio::alphabets::dna;

use crate::fileformat::Read;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadTableEntry {
    pub id: String,
    pub seq: Vec<u8>,
}

impl ReadTableEntry {
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

///////////////////////////////
/// Sequences handed to the overlap engine. Every entry is pure ACGT and at least
/// `min_overlap` long; ids are 1, 2, ... in insertion order
#[derive(Clone, Debug, Default)]
pub struct ReadTable {
    entries: Vec<ReadTableEntry>,
    min_overlap: usize,
}

impl ReadTable {
    pub fn new(min_overlap: usize) -> Self {
        ReadTable {
            entries: Vec::new(),
            min_overlap,
        }
    }

    /// Reads that are unmapped with a reverse-strand mate are stored reverse complemented
    pub fn from_reads(reads: &[Read], min_overlap: usize) -> Self {
        let mut table = ReadTable::new(min_overlap);
        for read in reads {
            let mut seq = read.seq.to_ascii_uppercase();
            if !read.is_mapped() && read.is_mate_reverse() {
                seq = dna::revcomp(&seq);
            }
            table.push(seq);
        }
        table
    }

    /// Append a sequence if it is usable. Returns false, and assigns no id, otherwise
    pub fn push(&mut self, seq: Vec<u8>) -> bool {
        let usable = seq.len() >= self.min_overlap
            && !seq.is_empty()
            && seq.iter().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T'));
        if usable {
            let id = (self.entries.len() + 1).to_string();
            self.entries.push(ReadTableEntry { id, seq });
        }
        usable
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ReadTableEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReadTableEntry> {
        self.entries.iter()
    }
}
