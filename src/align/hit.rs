use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rust_htslib::bam::record::CigarString;

use crate::runtime::Result;

///////////////////////////////
/// One local alignment of a query against a target. Coordinates are 0-based half-open,
/// query coordinates on the query's own strand; the cigar reads along the target
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlignmentHit {
    pub query_name: String,
    pub query_len: usize,
    pub query_start: usize,
    pub query_end: usize,
    pub target_name: String,
    pub target_len: usize,
    pub target_start: usize,
    pub target_end: usize,
    /// 0 for the best hit of its query
    pub rank: usize,
    pub reverse: bool,
    pub cigar: CigarString,
    pub score: i32,
    pub mapq: u8,
}

impl AlignmentHit {
    pub fn strand(&self) -> char {
        if self.reverse {
            '-'
        } else {
            '+'
        }
    }

    /// `tname tlen tstart tend qname qlen qstart qend rank strand cigar`
    pub fn summary_line(&self) -> String {
        format!(
            "{} {} {} {} {} {} {} {} {} {} {}",
            self.target_name,
            self.target_len,
            self.target_start,
            self.target_end,
            self.query_name,
            self.query_len,
            self.query_start,
            self.query_end,
            self.rank,
            self.strand(),
            self.cigar
        )
    }
}

pub fn write_summary<W: Write>(mut out: W, hits: &[AlignmentHit]) -> Result<()> {
    for hit in hits {
        writeln!(out, "{}", hit.summary_line())?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_summary_to_path<P: AsRef<Path>>(path: P, hits: &[AlignmentHit]) -> Result<()> {
    let file = File::create(path)?;
    write_summary(BufWriter::new(file), hits)
}
