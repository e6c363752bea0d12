use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use itertools::Itertools;
use log::{error, info};
use rayon::prelude::*;

use super::config_args::{build_config, AlignerArgs, AssemblyArgs, StoreArgs};
use super::threadcount::{determine_thread_count, threads_for_jobs};
use crate::align::{write_summary_to_path, SequenceAligner};
use crate::assembly::{write_contigs, AssemblyWindow, Contig, Window, WindowAssembly};
use crate::barcode::BarcodeReadStore;
use crate::fileformat::{HtsAlignmentStore, NamedSequence, ReferenceGenome};
use crate::runtime::Config;

pub const DEFAULT_PATH_OUT: &str = "linkasm_out";

#[derive(Args)]
pub struct AssembleCMD {
    #[arg(short = 'i', value_parser)]
    /// Coordinate-sorted, indexed BAM with BX tags
    pub path_in: PathBuf,

    #[arg(long = "bx-bam", value_parser)]
    /// The same reads sorted into one indexed block per barcode
    pub path_bx: PathBuf,

    #[arg(short = 'r', long = "region", required = true, num_args = 1..)]
    /// Windows to reassemble, as contig:start-end (1-based, inclusive)
    pub windows: Vec<Window>,

    #[arg(short = 'o', value_parser, default_value = DEFAULT_PATH_OUT)]
    /// Directory for contigs, graphs and alignments
    pub path_out: PathBuf,

    #[arg(long = "reference", value_parser)]
    /// faidx-indexed reference; contigs are aligned back to their window
    pub path_reference: Option<PathBuf>,

    #[arg(long = "align-reads")]
    /// Align the pooled reads of each window against its contigs
    pub align_reads: bool,

    #[arg(short = '@', value_parser = clap::value_parser!(usize))]
    num_threads_total: Option<usize>,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub assembly: AssemblyArgs,

    #[command(flatten)]
    pub aligner: AlignerArgs,
}

impl AssembleCMD {
    /// Run the commandline option
    pub fn try_execute(&mut self) -> Result<()> {
        let num_threads = determine_thread_count(self.num_threads_total)?;
        let config = build_config(Some(&self.store), Some(&self.assembly), Some(&self.aligner))?;

        Assemble {
            path_in: self.path_in.clone(),
            path_bx: self.path_bx.clone(),
            windows: self.windows.clone(),
            path_out: self.path_out.clone(),
            path_reference: self.path_reference.clone(),
            align_reads: self.align_reads,
            num_threads,
            config,
        }
        .run()?;

        info!("Assemble has finished successfully");
        Ok(())
    }
}

pub struct Assemble {
    pub path_in: PathBuf,
    pub path_bx: PathBuf,
    pub windows: Vec<Window>,
    pub path_out: PathBuf,
    pub path_reference: Option<PathBuf>,
    pub align_reads: bool,
    pub num_threads: usize,
    pub config: Config,
}

impl Assemble {
    /// Windows run in parallel, each on its own store handles. A failed window does not
    /// stop the others, but fails the run
    pub fn run(&self) -> Result<()> {
        fs::create_dir_all(&self.path_out)
            .with_context(|| format!("Could not create output directory {:?}", self.path_out))?;

        let threads = threads_for_jobs(self.num_threads, self.windows.len());
        info!(
            "Assembling {} windows using {} threads",
            self.windows.len(),
            threads
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?;

        let outcomes: Vec<(&Window, Result<usize>)> = pool.install(|| {
            self.windows
                .par_iter()
                .map(|window| (window, self.run_window(window)))
                .collect()
        });

        let mut failed = Vec::new();
        for (window, outcome) in &outcomes {
            match outcome {
                Ok(n) => info!("Window {}: {} contigs", window, n),
                Err(e) => {
                    error!("Window {} failed: {:#}", window, e);
                    failed.push(*window);
                }
            }
        }
        if !failed.is_empty() {
            bail!(
                "{} of {} windows failed: {}",
                failed.len(),
                outcomes.len(),
                failed.iter().join(", ")
            );
        }
        Ok(())
    }

    fn run_window(&self, window: &Window) -> Result<usize> {
        let mut region_store = HtsAlignmentStore::open(&self.path_in)?;
        let mut barcode_store = BarcodeReadStore::open(&self.path_bx, &self.config.store)?;

        let assembly = AssemblyWindow::new(
            window.clone(),
            &mut region_store,
            &mut barcode_store,
            &self.config,
            &self.path_out,
        )
        .assemble()?;

        let contigs_path = self.output_path(&assembly, "contigs.fa");
        write_contigs(&contigs_path, &assembly.contigs)?;

        if let Some(reference) = &self.path_reference {
            self.align_contigs(reference, &assembly)?;
        }
        if self.align_reads {
            self.align_pooled_reads(&assembly)?;
        }
        Ok(assembly.contigs.len())
    }

    fn output_path(&self, assembly: &WindowAssembly, name: &str) -> PathBuf {
        self.path_out.join(format!("{}{}", assembly.prefix, name))
    }

    /// Contigs against the reference bases of their window
    fn align_contigs(&self, reference: &Path, assembly: &WindowAssembly) -> Result<()> {
        let genome = ReferenceGenome::open(reference)?;
        let aligner =
            SequenceAligner::from_reference_region(&genome, &assembly.window, &self.config.aligner)?;
        let queries: Vec<NamedSequence> = assembly.contigs.iter().map(Contig::to_named).collect();
        let hits = aligner.align(&queries);
        write_summary_to_path(self.output_path(assembly, "alignments.txt"), &hits)?;
        Ok(())
    }

    /// Pooled reads against the window's contigs. Without contigs there is nothing to
    /// index and the summary stays empty
    fn align_pooled_reads(&self, assembly: &WindowAssembly) -> Result<()> {
        let path = self.output_path(assembly, "read_alignments.txt");
        if assembly.contigs.is_empty() {
            write_summary_to_path(path, &[])?;
            return Ok(());
        }
        let targets: Vec<NamedSequence> = assembly.contigs.iter().map(Contig::to_named).collect();
        let aligner = SequenceAligner::build_index(targets, &self.config.aligner)?;
        let hits = aligner.align_reads(&assembly.reads);
        write_summary_to_path(path, &hits)?;
        Ok(())
    }
}
