use clap::Args;

use crate::runtime::{
    AlignerParams, AssemblyParams, Config, StoreParams, DEFAULT_BUCKET_BITS, DEFAULT_ERROR_RATE,
    DEFAULT_MAX_CONTAINMENT_ROUNDS, DEFAULT_MINIMIZER_K, DEFAULT_MINIMIZER_W, DEFAULT_MIN_OVERLAP,
    DEFAULT_POOR_ALIGNMENT_MAX_MAPQ, DEFAULT_SEED_LENGTH, DEFAULT_SEED_STRIDE,
    DEFAULT_TRIM_LENGTH_THRESHOLD, DEFAULT_TRIM_ROUNDS,
};

///////////////////////////////
/// Read retrieval flags
#[derive(Args, Clone, Debug)]
pub struct StoreArgs {
    #[arg(long = "all-reads")]
    /// Pool every read of a barcode, not only unmapped, mate-unmapped or low MAPQ ones
    pub all_reads: bool,

    #[arg(long = "max-mapq", default_value_t = DEFAULT_POOR_ALIGNMENT_MAX_MAPQ)]
    /// Reads with MAPQ at or below this count as poorly aligned
    pub poor_alignment_max_mapq: u8,
}

impl StoreArgs {
    pub fn to_params(&self) -> StoreParams {
        StoreParams {
            weird_reads_only: !self.all_reads,
            poor_alignment_max_mapq: self.poor_alignment_max_mapq,
        }
    }
}

///////////////////////////////
/// Overlap and graph simplification flags
#[derive(Args, Clone, Debug)]
pub struct AssemblyArgs {
    #[arg(short = 'm', long = "min-overlap", default_value_t = DEFAULT_MIN_OVERLAP)]
    pub min_overlap: usize,

    #[arg(short = 'e', long = "error-rate", default_value_t = DEFAULT_ERROR_RATE)]
    /// Maximum mismatch rate within an overlap; below 0.0001 overlaps must be exact
    pub error_rate: f64,

    #[arg(long = "seed-length", default_value_t = DEFAULT_SEED_LENGTH)]
    pub seed_length: usize,

    #[arg(long = "seed-stride", default_value_t = DEFAULT_SEED_STRIDE)]
    pub seed_stride: usize,

    #[arg(long = "irreducible-only")]
    /// Drop transitive edges while computing overlaps
    pub irreducible_only: bool,

    #[arg(long = "trim-length", default_value_t = DEFAULT_TRIM_LENGTH_THRESHOLD)]
    /// Dead-end vertices shorter than this are trimmed
    pub trim_length_threshold: usize,

    #[arg(long = "trim-rounds", default_value_t = DEFAULT_TRIM_ROUNDS)]
    pub trim_rounds: usize,

    #[arg(long = "no-transitive-reduction")]
    pub no_transitive_reduction: bool,

    #[arg(long = "validate")]
    /// Check the simplified graph for missing twin edges and inconsistent overlaps
    pub validate_structure: bool,

    #[arg(long = "report-components")]
    pub report_components: bool,

    #[arg(long = "max-containment-rounds", default_value_t = DEFAULT_MAX_CONTAINMENT_ROUNDS)]
    pub max_containment_rounds: usize,
}

impl AssemblyArgs {
    pub fn to_params(&self) -> AssemblyParams {
        AssemblyParams {
            min_overlap: self.min_overlap,
            error_rate: self.error_rate,
            seed_length: self.seed_length,
            seed_stride: self.seed_stride,
            irreducible_only: self.irreducible_only,
            trim_length_threshold: self.trim_length_threshold,
            trim_rounds: self.trim_rounds,
            perform_transitive_reduction: !self.no_transitive_reduction,
            validate_structure: self.validate_structure,
            report_components: self.report_components,
            max_containment_rounds: self.max_containment_rounds,
        }
    }
}

///////////////////////////////
/// Minimizer index and alignment scoring flags. Unset scoring flags keep the defaults
#[derive(Args, Clone, Debug)]
pub struct AlignerArgs {
    #[arg(short = 'k', long = "minimizer-k", default_value_t = DEFAULT_MINIMIZER_K)]
    pub minimizer_k: usize,

    #[arg(short = 'w', long = "minimizer-w", default_value_t = DEFAULT_MINIMIZER_W)]
    pub minimizer_w: usize,

    #[arg(long = "bucket-bits", default_value_t = DEFAULT_BUCKET_BITS)]
    pub bucket_bits: u32,

    #[arg(long = "hpc")]
    /// Homopolymer-compressed minimizers
    pub homopolymer_compressed: bool,

    #[arg(long = "match-score")]
    pub match_score: Option<i32>,
    #[arg(long = "mismatch-penalty")]
    pub mismatch_penalty: Option<i32>,
    #[arg(long = "gap-open")]
    pub gap_open: Option<i32>,
    #[arg(long = "gap-extend")]
    pub gap_extend: Option<i32>,
    #[arg(long = "gap-open-long")]
    pub gap_open_long: Option<i32>,
    #[arg(long = "gap-extend-long")]
    pub gap_extend_long: Option<i32>,
    #[arg(long = "end-bonus")]
    pub end_bonus: Option<i32>,
    #[arg(long = "zdrop")]
    pub zdrop: Option<i32>,
    #[arg(long = "zdrop-inv")]
    /// Z-drop applied to reverse-strand hits
    pub zdrop_inv: Option<i32>,

    #[arg(long = "max-gap")]
    pub max_gap: Option<usize>,
    #[arg(long = "bandwidth")]
    pub bandwidth: Option<usize>,
    #[arg(long = "min-chain-score")]
    pub min_chain_score: Option<i32>,
    #[arg(long = "max-chain-skip")]
    pub max_chain_skip: Option<usize>,
    #[arg(long = "max-chain-iter")]
    pub max_chain_iter: Option<usize>,
}

impl AlignerArgs {
    pub fn to_params(&self) -> AlignerParams {
        let d = AlignerParams::default();
        AlignerParams {
            minimizer_k: self.minimizer_k,
            minimizer_w: self.minimizer_w,
            bucket_bits: self.bucket_bits,
            homopolymer_compressed: self.homopolymer_compressed,
            match_score: self.match_score.unwrap_or(d.match_score),
            mismatch_penalty: self.mismatch_penalty.unwrap_or(d.mismatch_penalty),
            gap_open: self.gap_open.unwrap_or(d.gap_open),
            gap_extend: self.gap_extend.unwrap_or(d.gap_extend),
            gap_open_long: self.gap_open_long.unwrap_or(d.gap_open_long),
            gap_extend_long: self.gap_extend_long.unwrap_or(d.gap_extend_long),
            end_bonus: self.end_bonus.unwrap_or(d.end_bonus),
            zdrop: self.zdrop.unwrap_or(d.zdrop),
            zdrop_inv: self.zdrop_inv.unwrap_or(d.zdrop_inv),
            max_gap: self.max_gap.unwrap_or(d.max_gap),
            bandwidth: self.bandwidth.unwrap_or(d.bandwidth),
            min_chain_score: self.min_chain_score.unwrap_or(d.min_chain_score),
            max_chain_skip: self.max_chain_skip.unwrap_or(d.max_chain_skip),
            max_chain_iter: self.max_chain_iter.unwrap_or(d.max_chain_iter),
        }
    }
}

/// Validated run configuration from the flag groups a subcommand carries
pub fn build_config(
    store: Option<&StoreArgs>,
    assembly: Option<&AssemblyArgs>,
    aligner: Option<&AlignerArgs>,
) -> crate::runtime::Result<Config> {
    let config = Config {
        store: store.map(StoreArgs::to_params).unwrap_or_default(),
        assembly: assembly.map(AssemblyArgs::to_params).unwrap_or_default(),
        aligner: aligner.map(AlignerArgs::to_params).unwrap_or_default(),
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        assembly: AssemblyArgs,
        #[command(flatten)]
        aligner: AlignerArgs,
    }

    #[test]
    fn test_defaults_match_config_defaults() {
        let cli = TestCli::parse_from(["linkasm"]);
        let config = build_config(Some(&cli.store), Some(&cli.assembly), Some(&cli.aligner)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_negative_flags() {
        let cli = TestCli::parse_from([
            "linkasm",
            "--all-reads",
            "--no-transitive-reduction",
            "--zdrop",
            "100",
            "-e",
            "0.02",
        ]);
        let config = build_config(Some(&cli.store), Some(&cli.assembly), Some(&cli.aligner)).unwrap();
        assert!(!config.store.weird_reads_only);
        assert!(!config.assembly.perform_transitive_reduction);
        assert!(!config.assembly.exact_mode());
        assert_eq!(config.aligner.zdrop, 100);
        assert_eq!(config.aligner.zdrop_inv, AlignerParams::default().zdrop_inv);
    }

    #[test]
    fn test_invalid_flags_rejected() {
        let cli = TestCli::parse_from(["linkasm", "--seed-length", "50", "-m", "30"]);
        assert!(build_config(Some(&cli.store), Some(&cli.assembly), Some(&cli.aligner)).is_err());
    }
}
