use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use log::info;

use super::config_args::{build_config, AlignerArgs};
use crate::align::{write_summary_to_path, SequenceAligner};
use crate::assembly::Window;
use crate::fileformat::fasta::read_fasta;
use crate::fileformat::ReferenceGenome;

#[derive(Args)]
pub struct AlignCMD {
    #[arg(short = 'q', long = "query", value_parser)]
    /// FASTA with the sequences to align
    pub path_query: PathBuf,

    #[arg(short = 't', long = "target", value_parser, conflicts_with = "path_reference")]
    /// FASTA with the sequences to index
    pub path_target: Option<PathBuf>,

    #[arg(long = "reference", value_parser, requires = "window")]
    /// faidx-indexed reference to cut the target window from
    pub path_reference: Option<PathBuf>,

    #[arg(short = 'r', long = "region")]
    /// Reference window to align against, as contig:start-end
    pub window: Option<Window>,

    #[arg(short = 'o', value_parser)]
    /// Alignment summary, one hit per line
    pub path_out: PathBuf,

    #[command(flatten)]
    pub aligner: AlignerArgs,
}

impl AlignCMD {
    /// Run the commandline option
    pub fn try_execute(&mut self) -> Result<()> {
        let config = build_config(None, None, Some(&self.aligner))?;

        let aligner = match (&self.path_target, &self.path_reference, &self.window) {
            (Some(target), _, _) => SequenceAligner::build_index(read_fasta(target)?, &config.aligner)?,
            (None, Some(reference), Some(window)) => {
                let genome = ReferenceGenome::open(reference)?;
                SequenceAligner::from_reference_region(&genome, window, &config.aligner)?
            }
            _ => bail!("Either --target or --reference with --region is required"),
        };

        let queries = read_fasta(&self.path_query)?;
        let hits = aligner.align(&queries);
        info!(
            "Aligned {} queries against {} targets: {} hits",
            queries.len(),
            aligner.targets().len(),
            hits.len()
        );
        write_summary_to_path(&self.path_out, &hits)?;
        Ok(())
    }
}
