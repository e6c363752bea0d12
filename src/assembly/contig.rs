use std::path::Path;

use log::debug;

use super::graph::StringGraph;
use super::simplify::{connected_components, merge_unbranched};
use crate::fileformat::fasta::write_fasta_to_path;
use crate::fileformat::NamedSequence;
use crate::runtime::Result;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contig {
    pub name: String,
    pub seq: Vec<u8>,
    /// Reads merged into the contig
    pub sources: usize,
    pub component: Option<usize>,
}

impl Contig {
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// FASTA description line
    pub fn description(&self) -> String {
        match self.component {
            Some(c) => format!("sources={} component={}", self.sources, c),
            None => format!("sources={}", self.sources),
        }
    }

    pub fn to_named(&self) -> NamedSequence {
        NamedSequence::new(self.name.clone(), self.seq.clone())
    }
}

/// Prefix every vertex with the window's namespace, collapse whatever unbranched runs
/// the trimming left behind, and emit one contig per remaining vertex
pub fn extract_contigs(
    graph: &mut StringGraph,
    prefix: &str,
    report_components: bool,
) -> Result<Vec<Contig>> {
    graph.rename_vertices(prefix);
    let merges = merge_unbranched(graph)?;
    if merges > 0 {
        debug!("{}: {} merges after trimming", prefix, merges);
    }

    let components = if report_components {
        Some(connected_components(graph))
    } else {
        None
    };

    let contigs = graph
        .vertices()
        .map(|v| Contig {
            name: v.id.clone(),
            seq: v.seq.clone(),
            sources: v.sources,
            component: components.as_ref().and_then(|c| c.get(&v.id).copied()),
        })
        .collect();
    Ok(contigs)
}

pub fn write_contigs<P: AsRef<Path>>(path: P, contigs: &[Contig]) -> Result<()> {
    let named: Vec<(NamedSequence, String)> = contigs
        .iter()
        .map(|c| (c.to_named(), c.description()))
        .collect();
    write_fasta_to_path(path, named.iter().map(|(n, d)| (n, Some(d.as_str()))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::graph::Vertex;
    use crate::fileformat::{Overlap, SeqCoord};

    #[test]
    fn test_contigs_are_prefixed_and_maximal() {
        let mut graph = StringGraph::new(0.0, 4);
        graph.add_vertex(Vertex::new("1", b"AAAACCCCGG".to_vec()));
        graph.add_vertex(Vertex::new("2", b"CCCCGGTTTT".to_vec()));
        graph.add_vertex(Vertex::new("5", b"GGGGGGGGGG".to_vec()));
        graph
            .add_overlap(&Overlap {
                ids: ["1".to_string(), "2".to_string()],
                coords: [SeqCoord::new(4, 9, 10), SeqCoord::new(0, 5, 10)],
                is_reverse: false,
                num_diff: 0,
            })
            .unwrap();

        let contigs = extract_contigs(&mut graph, "chr1_100_200_", true).unwrap();
        assert_eq!(contigs.len(), 2);
        assert_eq!(contigs[0].name, "chr1_100_200_1");
        assert_eq!(contigs[0].seq, b"AAAACCCCGGTTTT".to_vec());
        assert_eq!(contigs[0].description(), "sources=2 component=0");
        assert_eq!(contigs[1].name, "chr1_100_200_5");
        assert_eq!(contigs[1].component, Some(1));
    }

    #[test]
    fn test_write_contigs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contigs.fa");
        let contigs = vec![Contig {
            name: "w_1".to_string(),
            seq: b"ACGT".to_vec(),
            sources: 4,
            component: None,
        }];
        write_contigs(&path, &contigs).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), ">w_1 sources=4\nACGT\n");
    }
}
