use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use bio::io::fasta;
use rust_htslib::faidx;

use crate::runtime::{Error, Result};

///////////////////////////////
/// A sequence together with its name. Equality and hashing cover both fields, so two
/// records with the same name but different bases are distinct
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamedSequence {
    pub name: String,
    pub seq: Vec<u8>,
}

impl NamedSequence {
    pub fn new<N: Into<String>, S: Into<Vec<u8>>>(name: N, seq: S) -> Self {
        NamedSequence {
            name: name.into(),
            seq: seq.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// Load every record of a FASTA file. Descriptions are dropped
pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<NamedSequence>> {
    let path = path.as_ref();
    let reader = fasta::Reader::from_file(path).map_err(|e| {
        Error::parse_error(format!("FASTA file {:?}", path), Some(e.to_string()))
    })?;

    let mut out = Vec::new();
    for record in reader.records() {
        let record = record?;
        record.check().map_err(|e| {
            Error::parse_error(format!("FASTA record in {:?}", path), Some(e))
        })?;
        out.push(NamedSequence::new(record.id(), record.seq().to_ascii_uppercase()));
    }
    Ok(out)
}

/// Write records with an optional description per record
pub fn write_fasta<'a, W, I>(out: W, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = (&'a NamedSequence, Option<&'a str>)>,
{
    let mut writer = fasta::Writer::new(out);
    for (record, desc) in records {
        writer.write(&record.name, desc, &record.seq)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_fasta_to_path<'a, P, I>(path: P, records: I) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = (&'a NamedSequence, Option<&'a str>)>,
{
    let file = File::create(path)?;
    write_fasta(BufWriter::new(file), records)
}

///////////////////////////////
/// faidx-indexed reference, used to cut out the window a set of contigs is aligned to
pub struct ReferenceGenome {
    reader: faidx::Reader,
    path: PathBuf,
}

impl ReferenceGenome {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = faidx::Reader::from_path(path)
            .map_err(|e| Error::store_open(path, Some(e.to_string())))?;
        Ok(ReferenceGenome {
            reader,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bases of the 1-based inclusive interval `contig:start-end`, named `contig_start_end`
    pub fn fetch_window(&self, contig: &str, start: u64, end: u64) -> Result<NamedSequence> {
        if start == 0 || end < start {
            return Err(Error::parse_error(
                "reference window",
                Some(format!("invalid interval {}:{}-{}", contig, start, end)),
            ));
        }
        let seq = self
            .reader
            .fetch_seq_string(contig, (start - 1) as usize, (end - 1) as usize)?;
        if seq.is_empty() {
            return Err(Error::parse_error(
                "reference window",
                Some(format!("{}:{}-{} not present in {:?}", contig, start, end, self.path)),
            ));
        }
        Ok(NamedSequence::new(
            format!("{}_{}_{}", contig, start, end),
            seq.to_ascii_uppercase().into_bytes(),
        ))
    }
}
