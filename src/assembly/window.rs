use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info};

use super::contig::{extract_contigs, Contig};
use super::graph::StringGraph;
use super::overlap::{OverlapEngine, SuffixArrayOverlapper};
use super::read_table::ReadTable;
use super::simplify::{simplify, GraphStats, SimplifyReport};
use crate::barcode::{collect_barcodes, BarcodeCounts, BarcodeReadStore};
use crate::fileformat::{AlignmentStore, Read};
use crate::runtime::{Config, Error, Result};

///////////////////////////////
/// Reference interval, 1-based and inclusive on both ends
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Window {
    pub contig: String,
    pub start: u64,
    pub end: u64,
}

impl Window {
    pub fn new<C: Into<String>>(contig: C, start: u64, end: u64) -> Result<Self> {
        let contig = contig.into();
        if contig.is_empty() || start == 0 || end < start {
            return Err(Error::parse_error(
                "window",
                Some(format!("invalid interval {}:{}-{}", contig, start, end)),
            ));
        }
        Ok(Window { contig, start, end })
    }

    /// Namespace for every artifact of this window: `<contig>_<start>_<end>_`
    pub fn prefix(&self) -> String {
        format!("{}_{}_{}_", self.contig, self.start, self.end)
    }

    /// Number of reference bases covered
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.contig, self.start, self.end)
    }
}

/// Parses `contig:start-end`; thousands separators are accepted
impl FromStr for Window {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::parse_error("window", Some(format!("expected contig:start-end, got '{}'", s)));
        let (contig, range) = s.rsplit_once(':').ok_or_else(bad)?;
        let (start, end) = range.split_once('-').ok_or_else(bad)?;
        let start: u64 = start.replace(',', "").parse().map_err(|_| bad())?;
        let end: u64 = end.replace(',', "").parse().map_err(|_| bad())?;
        Window::new(contig, start, end)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Init,
    CollectLocalBarcodes,
    FetchGenomewideReads,
    BuildReadTable,
    BuildOverlapGraph,
    SimplifyGraph,
    ExtractContigs,
    Done,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowStats {
    pub local_reads: usize,
    pub barcodes: usize,
    pub fetched_reads: usize,
    pub table_entries: usize,
    pub graph: GraphStats,
    pub simplify: SimplifyReport,
    pub contigs: usize,
}

///////////////////////////////
/// Everything a finished window hands back. Outlives the window and its stores
#[derive(Clone, Debug)]
pub struct WindowAssembly {
    pub window: Window,
    pub prefix: String,
    pub contigs: Vec<Contig>,
    /// All reads pooled from the window's barcodes, as fetched
    pub reads: Vec<Read>,
    pub barcodes: BarcodeCounts,
    pub stats: WindowStats,
    pub graph_path: PathBuf,
    pub pruned_graph_path: PathBuf,
}

///////////////////////////////
/// Local reassembly of one window. The window borrows its stores for the whole run
/// and is consumed by `assemble`, so it runs at most once
pub struct AssemblyWindow<'a, R: AlignmentStore, B: AlignmentStore> {
    window: Window,
    prefix: String,
    region_store: &'a mut R,
    barcode_store: &'a mut BarcodeReadStore<B>,
    config: &'a Config,
    outdir: PathBuf,
    phase: Phase,
}

impl<'a, R: AlignmentStore, B: AlignmentStore> AssemblyWindow<'a, R, B> {
    pub fn new<P: AsRef<Path>>(
        window: Window,
        region_store: &'a mut R,
        barcode_store: &'a mut BarcodeReadStore<B>,
        config: &'a Config,
        outdir: P,
    ) -> Self {
        let prefix = window.prefix();
        AssemblyWindow {
            window,
            prefix,
            region_store,
            barcode_store,
            config,
            outdir: outdir.as_ref().to_path_buf(),
            phase: Phase::Init,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        debug_assert!(phase > self.phase, "window phases run forward only");
        self.phase = phase;
        debug!("{} entering {:?}", self.prefix, phase);
    }

    pub fn assemble(self) -> Result<WindowAssembly> {
        self.assemble_with(&SuffixArrayOverlapper)
    }

    pub fn assemble_with<E: OverlapEngine>(mut self, engine: &E) -> Result<WindowAssembly> {
        let mut stats = WindowStats::default();
        info!("Assembling window {} ({} bp)", self.window, self.window.length());

        self.enter(Phase::CollectLocalBarcodes);
        let local = self.region_store.fetch_region(
            &self.window.contig,
            self.window.start,
            self.window.end,
        )?;
        let barcodes = collect_barcodes(&local);
        stats.local_reads = local.len();
        stats.barcodes = barcodes.len();
        for (barcode, count) in barcodes.iter() {
            debug!("{} barcode {} seen {} times", self.prefix, barcode, count);
        }
        drop(local);

        self.enter(Phase::FetchGenomewideReads);
        let reads = self.barcode_store.fetch_by_barcodes(barcodes.barcodes())?;
        stats.fetched_reads = reads.len();
        info!(
            "{} pooled {} reads from {} barcodes",
            self.prefix,
            reads.len(),
            barcodes.len()
        );

        self.enter(Phase::BuildReadTable);
        let table = ReadTable::from_reads(&reads, self.config.assembly.min_overlap);
        stats.table_entries = table.len();
        debug!(
            "{} read table holds {} of {} reads",
            self.prefix,
            table.len(),
            reads.len()
        );

        self.enter(Phase::BuildOverlapGraph);
        fs::create_dir_all(&self.outdir)?;
        let asqg = engine
            .compute(&table, &self.config.assembly)
            .map_err(|e| match e {
                Error::GraphBuild { .. } => e,
                other => Error::graph_build(Some(other.to_string())),
            })?;
        let graph_path = self.outdir.join(format!("{}graph.asqg", self.prefix));
        asqg.write_to_path(&graph_path)?;

        self.enter(Phase::SimplifyGraph);
        let mut graph = StringGraph::from_asqg(&asqg)?;
        drop(asqg);
        let report = simplify(&mut graph, &self.config.assembly)?;

        self.enter(Phase::ExtractContigs);
        let contigs = extract_contigs(
            &mut graph,
            &self.prefix,
            self.config.assembly.report_components,
        )?;
        stats.graph = GraphStats::of(&graph);
        stats.simplify = report;
        stats.contigs = contigs.len();
        let pruned_graph_path = self.outdir.join(format!("{}pruned_graph.asqg", self.prefix));
        graph
            .to_asqg(false, !self.config.assembly.perform_transitive_reduction)
            .write_to_path(&pruned_graph_path)?;

        self.enter(Phase::Done);
        info!(
            "{} produced {} contigs from {} reads",
            self.prefix,
            contigs.len(),
            stats.table_entries
        );

        Ok(WindowAssembly {
            window: self.window,
            prefix: self.prefix,
            contigs,
            reads,
            barcodes,
            stats,
            graph_path,
            pruned_graph_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window() {
        let w: Window = "chr1:1,000-2,000".parse().unwrap();
        assert_eq!(w, Window::new("chr1", 1000, 2000).unwrap());
        assert_eq!(w.prefix(), "chr1_1000_2000_");
        assert_eq!(w.to_string(), "chr1:1000-2000");
        assert_eq!(w.length(), 1001);

        let hla: Window = "HLA-A*01:01:01:01:5-10".parse().unwrap();
        assert_eq!(hla.contig, "HLA-A*01:01:01:01");
    }

    #[test]
    fn test_reject_bad_windows() {
        assert!("chr1".parse::<Window>().is_err());
        assert!("chr1:0-10".parse::<Window>().is_err());
        assert!("chr1:20-10".parse::<Window>().is_err());
        assert!("chr1:a-b".parse::<Window>().is_err());
    }
}
