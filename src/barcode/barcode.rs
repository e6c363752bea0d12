use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

use crate::fileformat::Read;
use crate::runtime::Result;

///////////////////////////////
/// Molecular barcode. Stored normalized: `-` is rewritten to `_`, so that
/// `AAAA-1` and `AAAA_1` compare equal and name the same store block
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Barcode(String);

impl Barcode {
    pub fn new<S: AsRef<str>>(raw: S) -> Self {
        Barcode(raw.as_ref().replace('-', "_"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Barcode {
    fn from(raw: &str) -> Self {
        Barcode::new(raw)
    }
}

impl From<String> for Barcode {
    fn from(raw: String) -> Self {
        Barcode::new(raw)
    }
}

///////////////////////////////
/// Number of reads per barcode. Sorted by barcode, so iteration does not depend on
/// the order the reads were tallied in
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BarcodeCounts {
    counts: BTreeMap<Barcode, usize>,
}

impl BarcodeCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, barcode: Barcode) {
        *self.counts.entry(barcode).or_insert(0) += 1;
    }

    pub fn get(&self, barcode: &Barcode) -> usize {
        self.counts.get(barcode).copied().unwrap_or(0)
    }

    /// Number of distinct barcodes
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn barcodes(&self) -> impl Iterator<Item = &Barcode> {
        self.counts.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Barcode, usize)> {
        self.counts.iter().map(|(bc, n)| (bc, *n))
    }

    /// Tab separated `barcode count` rows with a header line
    pub fn write_tsv<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(out);
        writer
            .write_record(["barcode", "count"])
            .map_err(csv_error)?;
        for (barcode, count) in self.iter() {
            writer
                .write_record([barcode.as_str(), count.to_string().as_str()])
                .map_err(csv_error)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> crate::runtime::Error {
    crate::runtime::Error::parse_error("barcode table", Some(e.to_string()))
}

impl<'a> FromIterator<&'a Read> for BarcodeCounts {
    fn from_iter<T: IntoIterator<Item = &'a Read>>(iter: T) -> Self {
        let mut counts = BarcodeCounts::new();
        for read in iter {
            if let Some(bx) = &read.barcode {
                counts.add(Barcode::new(bx));
            }
        }
        counts
    }
}
