//! Line-oriented overlap graph exchange format (ASQG).
//!
//! ```text
//! HT  VN:i:1  ER:f:0  OL:i:35  CN:i:1  TE:i:1
//! VT  <id>  <sequence>  SS:i:<0|1>
//! ED  <id1> <id2> <s1> <e1> <l1> <s2> <e2> <l2> <rc> <nd>
//! ```
//! Fields are tab separated; the edge payload is a single space separated field.
//! Edge coordinates are 0-based and inclusive.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::runtime::{Error, Result};

pub const ASQG_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq)]
pub struct AsqgHeader {
    pub version: u32,
    pub error_rate: f64,
    pub min_overlap: usize,
    /// Graph may still hold containment relations
    pub containment: bool,
    /// Graph may still hold transitive edges
    pub transitive: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexRecord {
    pub id: String,
    pub seq: String,
    /// Sequence is a substring of another vertex
    pub substring: bool,
}

/// Matched interval on one sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeqCoord {
    pub start: usize,
    pub end: usize,
    pub seq_len: usize,
}

impl SeqCoord {
    pub fn new(start: usize, end: usize, seq_len: usize) -> Self {
        SeqCoord { start, end, seq_len }
    }

    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn is_left_extreme(&self) -> bool {
        self.start == 0
    }

    pub fn is_right_extreme(&self) -> bool {
        self.end + 1 == self.seq_len
    }

    pub fn is_contained(&self) -> bool {
        self.is_left_extreme() && self.is_right_extreme()
    }

    /// Same interval seen on the reverse complement of the sequence
    pub fn flipped(&self) -> Self {
        SeqCoord {
            start: self.seq_len - 1 - self.end,
            end: self.seq_len - 1 - self.start,
            seq_len: self.seq_len,
        }
    }
}

/// Canonical description of one overlap between two sequences. Coordinates on the
/// second sequence are in its own forward orientation
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Overlap {
    pub ids: [String; 2],
    pub coords: [SeqCoord; 2],
    pub is_reverse: bool,
    pub num_diff: usize,
}

impl Overlap {
    pub fn is_containment(&self) -> bool {
        self.coords[0].is_contained() || self.coords[1].is_contained()
    }

    /// Index of the contained sequence. When both span their whole sequence
    /// (identical reads), the second one is considered contained
    pub fn contained_idx(&self) -> Option<usize> {
        if self.coords[1].is_contained() {
            Some(1)
        } else if self.coords[0].is_contained() {
            Some(0)
        } else {
            None
        }
    }

    /// A proper dovetail: each side touches exactly one end of its sequence, and the
    /// ends are compatible with the relative orientation
    pub fn is_dovetail(&self) -> bool {
        if self.is_containment() {
            return false;
        }
        let [a, b] = &self.coords;
        let a_ext = a.is_left_extreme() != a.is_right_extreme();
        let b_ext = b.is_left_extreme() != b.is_right_extreme();
        if !a_ext || !b_ext {
            return false;
        }
        if self.is_reverse {
            a.is_right_extreme() == b.is_right_extreme()
        } else {
            a.is_right_extreme() != b.is_right_extreme()
        }
    }

    fn write_payload<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let [a, b] = &self.coords;
        write!(
            out,
            "{} {} {} {} {} {} {} {} {} {}",
            self.ids[0],
            self.ids[1],
            a.start,
            a.end,
            a.seq_len,
            b.start,
            b.end,
            b.seq_len,
            self.is_reverse as u8,
            self.num_diff
        )
    }

    fn parse_payload(payload: &str) -> Result<Self> {
        let fields: Vec<&str> = payload.split_whitespace().collect();
        if fields.len() != 10 {
            return Err(Error::parse_error(
                "ASQG edge",
                Some(format!("expected 10 fields, found {}", fields.len())),
            ));
        }
        let num = |i: usize| -> Result<usize> {
            fields[i].parse::<usize>().map_err(|e| {
                Error::parse_error("ASQG edge", Some(format!("field '{}': {}", fields[i], e)))
            })
        };
        let coords = [
            SeqCoord::new(num(2)?, num(3)?, num(4)?),
            SeqCoord::new(num(5)?, num(6)?, num(7)?),
        ];
        for c in &coords {
            if c.is_empty() || c.end >= c.seq_len {
                return Err(Error::parse_error(
                    "ASQG edge",
                    Some(format!("coordinates {:?} out of bounds", c)),
                ));
            }
        }
        let is_reverse = match fields[8] {
            "0" => false,
            "1" => true,
            other => {
                return Err(Error::parse_error(
                    "ASQG edge",
                    Some(format!("bad orientation flag '{}'", other)),
                ))
            }
        };
        Ok(Overlap {
            ids: [fields[0].to_string(), fields[1].to_string()],
            coords,
            is_reverse,
            num_diff: num(9)?,
        })
    }
}

///////////////////////////////
/// A whole graph in exchange form
#[derive(Clone, Debug, PartialEq)]
pub struct AsqgGraph {
    pub header: AsqgHeader,
    pub vertices: Vec<VertexRecord>,
    pub overlaps: Vec<Overlap>,
}

impl AsqgGraph {
    pub fn new(header: AsqgHeader) -> Self {
        AsqgGraph {
            header,
            vertices: Vec::new(),
            overlaps: Vec::new(),
        }
    }

    pub fn write<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let h = &self.header;
        writeln!(
            out,
            "HT\tVN:i:{}\tER:f:{}\tOL:i:{}\tCN:i:{}\tTE:i:{}",
            h.version, h.error_rate, h.min_overlap, h.containment as u8, h.transitive as u8
        )?;
        for v in &self.vertices {
            writeln!(out, "VT\t{}\t{}\tSS:i:{}", v.id, v.seq, v.substring as u8)?;
        }
        for ovr in &self.overlaps {
            write!(out, "ED\t")?;
            ovr.write_payload(out)?;
            writeln!(out)?;
        }
        Ok(())
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read<R: BufRead>(input: R) -> Result<Self> {
        let mut header: Option<AsqgHeader> = None;
        let mut vertices = Vec::new();
        let mut overlaps = Vec::new();

        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            match fields.next() {
                Some("HT") => header = Some(parse_header(fields)?),
                Some("VT") => {
                    let id = fields.next();
                    let seq = fields.next();
                    let (Some(id), Some(seq)) = (id, seq) else {
                        return Err(Error::parse_error(
                            "ASQG vertex",
                            Some(format!("truncated line '{}'", line)),
                        ));
                    };
                    let mut substring = false;
                    for tag in fields {
                        if let Some(value) = tag.strip_prefix("SS:i:") {
                            substring = parse_flag(value, "SS")?;
                        }
                    }
                    vertices.push(VertexRecord {
                        id: id.to_string(),
                        seq: seq.to_string(),
                        substring,
                    });
                }
                Some("ED") => {
                    let payload = fields.next().unwrap_or_default();
                    overlaps.push(Overlap::parse_payload(payload)?);
                }
                Some(other) => {
                    return Err(Error::parse_error(
                        "ASQG",
                        Some(format!("unknown record type '{}'", other)),
                    ))
                }
                None => {}
            }
        }

        let header = header.ok_or_else(|| Error::parse_error("ASQG", Some("missing HT header")))?;
        Ok(AsqgGraph {
            header,
            vertices,
            overlaps,
        })
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }
}

fn parse_flag(value: &str, tag: &str) -> Result<bool> {
    match value {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(Error::parse_error(
            format!("ASQG tag {}", tag),
            Some(format!("expected 0 or 1, found '{}'", other)),
        )),
    }
}

fn parse_header<'a, I: Iterator<Item = &'a str>>(tags: I) -> Result<AsqgHeader> {
    let mut header = AsqgHeader {
        version: ASQG_VERSION,
        error_rate: 0.0,
        min_overlap: 0,
        containment: false,
        transitive: false,
    };
    let bad = |tag: &str, e: String| Error::parse_error(format!("ASQG header tag {}", tag), Some(e));
    for tag in tags {
        if let Some(v) = tag.strip_prefix("VN:i:") {
            header.version = v.parse().map_err(|e| bad(tag, format!("{}", e)))?;
        } else if let Some(v) = tag.strip_prefix("ER:f:") {
            header.error_rate = v.parse().map_err(|e| bad(tag, format!("{}", e)))?;
        } else if let Some(v) = tag.strip_prefix("OL:i:") {
            header.min_overlap = v.parse().map_err(|e| bad(tag, format!("{}", e)))?;
        } else if let Some(v) = tag.strip_prefix("CN:i:") {
            header.containment = parse_flag(v, "CN")?;
        } else if let Some(v) = tag.strip_prefix("TE:i:") {
            header.transitive = parse_flag(v, "TE")?;
        }
    }
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> AsqgHeader {
        AsqgHeader {
            version: 1,
            error_rate: 0.02,
            min_overlap: 35,
            containment: true,
            transitive: true,
        }
    }

    #[test]
    fn test_empty_graph_is_header_only() {
        let graph = AsqgGraph::new(header());
        let mut out = Vec::new();
        graph.write(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "HT\tVN:i:1\tER:f:0.02\tOL:i:35\tCN:i:1\tTE:i:1\n");
    }

    #[test]
    fn test_edge_line_layout() {
        let mut graph = AsqgGraph::new(header());
        graph.overlaps.push(Overlap {
            ids: ["1".to_string(), "2".to_string()],
            coords: [SeqCoord::new(60, 99, 100), SeqCoord::new(0, 39, 100)],
            is_reverse: false,
            num_diff: 0,
        });
        let mut out = Vec::new();
        graph.write(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("ED\t1 2 60 99 100 0 39 100 0 0\n"));
    }

    #[test]
    fn test_dovetail_classification() {
        let fwd = Overlap {
            ids: ["a".into(), "b".into()],
            coords: [SeqCoord::new(60, 99, 100), SeqCoord::new(0, 39, 100)],
            is_reverse: false,
            num_diff: 0,
        };
        assert!(fwd.is_dovetail());

        let rc = Overlap {
            coords: [SeqCoord::new(60, 99, 100), SeqCoord::new(60, 99, 100)],
            is_reverse: true,
            ..fwd.clone()
        };
        assert!(rc.is_dovetail());

        let inconsistent = Overlap {
            is_reverse: true,
            ..fwd.clone()
        };
        assert!(!inconsistent.is_dovetail());

        let contained = Overlap {
            coords: [SeqCoord::new(10, 49, 100), SeqCoord::new(0, 39, 40)],
            ..fwd
        };
        assert!(contained.is_containment());
        assert_eq!(contained.contained_idx(), Some(1));
        assert!(!contained.is_dovetail());
    }

    #[test]
    fn test_unknown_record_rejected() {
        let text = "HT\tVN:i:1\nXX\tfoo\n";
        assert!(AsqgGraph::read(text.as_bytes()).is_err());
        assert!(AsqgGraph::read("VT\t1\tACGT\tSS:i:0\n".as_bytes()).is_err());
    }
}
