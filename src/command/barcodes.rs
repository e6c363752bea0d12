use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use log::info;

use crate::assembly::Window;
use crate::barcode::collect_barcodes;
use crate::fileformat::{AlignmentStore, HtsAlignmentStore};

#[derive(Args)]
pub struct BarcodesCMD {
    #[arg(short = 'i', value_parser)]
    /// Coordinate-sorted, indexed BAM with BX tags
    pub path_in: PathBuf,

    #[arg(short = 'r', long = "region")]
    /// Window to tally, as contig:start-end
    pub window: Window,

    #[arg(short = 'o', value_parser)]
    /// TSV file with one barcode and its read count per line
    pub path_out: PathBuf,
}

impl BarcodesCMD {
    /// Run the commandline option
    pub fn try_execute(&mut self) -> Result<()> {
        let mut store = HtsAlignmentStore::open(&self.path_in)?;
        let reads = store.fetch_region(&self.window.contig, self.window.start, self.window.end)?;
        let counts = collect_barcodes(&reads);
        info!(
            "Window {}: {} reads, {} barcodes, {} tagged reads",
            self.window,
            reads.len(),
            counts.len(),
            counts.total()
        );

        let file = File::create(&self.path_out)
            .with_context(|| format!("Could not create {:?}", self.path_out))?;
        counts.write_tsv(BufWriter::new(file))?;
        Ok(())
    }
}
