use rust_htslib::bam::record::{Aux, Record as BamRecord};

/// Auxiliary tag carrying the molecular barcode
pub const BARCODE_TAG: &[u8; 2] = b"BX";

pub const FLAG_PAIRED: u16 = 0x1;
pub const FLAG_UNMAPPED: u16 = 0x4;
pub const FLAG_MATE_UNMAPPED: u16 = 0x8;
pub const FLAG_REVERSE: u16 = 0x10;
pub const FLAG_MATE_REVERSE: u16 = 0x20;

///////////////////////////////
/// One sequencing read, copied out of the alignment store. Nothing in here points
/// back into htslib memory, so reads can outlive the reader that produced them
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Read {
    pub qname: String,
    pub seq: Vec<u8>,
    pub flags: u16,
    pub mapq: u8,
    /// 0-based leftmost position, -1 when unplaced
    pub pos: i64,
    /// 0-based exclusive end of the aligned span
    pub end: i64,
    pub barcode: Option<String>,
}

impl Read {
    pub fn new<N: Into<String>, S: AsRef<[u8]>>(qname: N, seq: S) -> Self {
        Read {
            qname: qname.into(),
            seq: seq.as_ref().to_vec(),
            flags: FLAG_PAIRED,
            mapq: 60,
            pos: -1,
            end: -1,
            barcode: None,
        }
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_mapq(mut self, mapq: u8) -> Self {
        self.mapq = mapq;
        self
    }

    pub fn with_barcode<B: Into<String>>(mut self, barcode: B) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    /// Place the read at a 0-based position, spanning its own length
    pub fn placed_at(mut self, pos: i64) -> Self {
        self.pos = pos;
        self.end = pos + self.seq.len() as i64;
        self
    }

    /// Deep copy of an htslib record
    pub fn from_record(record: &BamRecord) -> Self {
        let barcode = match record.aux(BARCODE_TAG) {
            Ok(Aux::String(bx)) => Some(bx.to_string()),
            _ => None,
        };
        let pos = record.pos();
        let end = if record.is_unmapped() || pos < 0 {
            pos
        } else {
            record.cigar().end_pos()
        };

        Read {
            qname: String::from_utf8_lossy(record.qname()).to_string(),
            seq: record.seq().as_bytes(),
            flags: record.flags(),
            mapq: record.mapq(),
            pos,
            end,
            barcode,
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn is_paired(&self) -> bool {
        self.flags & FLAG_PAIRED != 0
    }

    pub fn is_mapped(&self) -> bool {
        self.flags & FLAG_UNMAPPED == 0
    }

    pub fn is_mate_mapped(&self) -> bool {
        self.is_paired() && self.flags & FLAG_MATE_UNMAPPED == 0
    }

    pub fn is_reverse(&self) -> bool {
        self.flags & FLAG_REVERSE != 0
    }

    pub fn is_mate_reverse(&self) -> bool {
        self.flags & FLAG_MATE_REVERSE != 0
    }

    /// Does the aligned span touch the 0-based half-open interval [start, end)
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        self.pos >= 0 && self.pos < end && self.end.max(self.pos + 1) > start
    }
}
