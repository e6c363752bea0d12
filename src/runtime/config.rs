use crate::runtime::{Error, Result};

pub const DEFAULT_WEIRD_READS_ONLY: bool = true;
pub const DEFAULT_POOR_ALIGNMENT_MAX_MAPQ: u8 = 10;

pub const DEFAULT_MIN_OVERLAP: usize = 35;
pub const DEFAULT_ERROR_RATE: f64 = 0.0;
pub const DEFAULT_SEED_LENGTH: usize = 20;
pub const DEFAULT_SEED_STRIDE: usize = 10;
pub const DEFAULT_IRREDUCIBLE_ONLY: bool = false;
pub const DEFAULT_TRIM_LENGTH_THRESHOLD: usize = 100;
pub const DEFAULT_TRIM_ROUNDS: usize = 2;
pub const DEFAULT_PERFORM_TRANSITIVE_REDUCTION: bool = true;
pub const DEFAULT_VALIDATE_STRUCTURE: bool = false;
pub const DEFAULT_REPORT_COMPONENTS: bool = false;
pub const DEFAULT_MAX_CONTAINMENT_ROUNDS: usize = 32;

/// Error rates below this are treated as exact overlap search
pub const EXACT_MODE_MAX_ERROR_RATE: f64 = 0.0001;

/// Mismatches tolerated over an overlap of `len` bases at `error_rate`
pub fn max_overlap_diff(error_rate: f64, len: usize) -> usize {
    if error_rate < EXACT_MODE_MAX_ERROR_RATE {
        0
    } else {
        (error_rate * len as f64).floor() as usize
    }
}

pub const DEFAULT_MINIMIZER_K: usize = 15;
pub const DEFAULT_MINIMIZER_W: usize = 10;
pub const DEFAULT_BUCKET_BITS: u32 = 14;
pub const DEFAULT_HOMOPOLYMER_COMPRESSED: bool = false;

///////////////////////////////
/// Retrieval and triage of reads from the barcode-indexed store
#[derive(Clone, Debug, PartialEq)]
pub struct StoreParams {
    pub weird_reads_only: bool,
    pub poor_alignment_max_mapq: u8,
}

impl Default for StoreParams {
    fn default() -> Self {
        StoreParams {
            weird_reads_only: DEFAULT_WEIRD_READS_ONLY,
            poor_alignment_max_mapq: DEFAULT_POOR_ALIGNMENT_MAX_MAPQ,
        }
    }
}

///////////////////////////////
/// Overlap computation and graph simplification policy
#[derive(Clone, Debug, PartialEq)]
pub struct AssemblyParams {
    pub min_overlap: usize,
    pub error_rate: f64,
    pub seed_length: usize,
    pub seed_stride: usize,
    pub irreducible_only: bool,
    pub trim_length_threshold: usize,
    pub trim_rounds: usize,
    pub perform_transitive_reduction: bool,
    pub validate_structure: bool,
    pub report_components: bool,
    pub max_containment_rounds: usize,
}

impl AssemblyParams {
    pub fn exact_mode(&self) -> bool {
        self.error_rate < EXACT_MODE_MAX_ERROR_RATE
    }

    pub fn max_diff(&self, len: usize) -> usize {
        max_overlap_diff(self.error_rate, len)
    }
}

impl Default for AssemblyParams {
    fn default() -> Self {
        AssemblyParams {
            min_overlap: DEFAULT_MIN_OVERLAP,
            error_rate: DEFAULT_ERROR_RATE,
            seed_length: DEFAULT_SEED_LENGTH,
            seed_stride: DEFAULT_SEED_STRIDE,
            irreducible_only: DEFAULT_IRREDUCIBLE_ONLY,
            trim_length_threshold: DEFAULT_TRIM_LENGTH_THRESHOLD,
            trim_rounds: DEFAULT_TRIM_ROUNDS,
            perform_transitive_reduction: DEFAULT_PERFORM_TRANSITIVE_REDUCTION,
            validate_structure: DEFAULT_VALIDATE_STRUCTURE,
            report_components: DEFAULT_REPORT_COMPONENTS,
            max_containment_rounds: DEFAULT_MAX_CONTAINMENT_ROUNDS,
        }
    }
}

///////////////////////////////
/// Minimizer index and local alignment scoring. Gap tiers: a gap of length l costs
/// min(gap_open + l*gap_extend, gap_open_long + l*gap_extend_long)
#[derive(Clone, Debug, PartialEq)]
pub struct AlignerParams {
    pub minimizer_k: usize,
    pub minimizer_w: usize,
    pub bucket_bits: u32,
    pub homopolymer_compressed: bool,

    pub match_score: i32,
    pub mismatch_penalty: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
    pub gap_open_long: i32,
    pub gap_extend_long: i32,
    pub end_bonus: i32,
    pub zdrop: i32,
    pub zdrop_inv: i32,

    pub max_gap: usize,
    pub bandwidth: usize,
    pub min_chain_score: i32,
    pub max_chain_skip: usize,
    pub max_chain_iter: usize,
}

impl Default for AlignerParams {
    fn default() -> Self {
        AlignerParams {
            minimizer_k: DEFAULT_MINIMIZER_K,
            minimizer_w: DEFAULT_MINIMIZER_W,
            bucket_bits: DEFAULT_BUCKET_BITS,
            homopolymer_compressed: DEFAULT_HOMOPOLYMER_COMPRESSED,
            match_score: 2,
            mismatch_penalty: 4,
            gap_open: 4,
            gap_extend: 2,
            gap_open_long: 24,
            gap_extend_long: 1,
            end_bonus: 5,
            zdrop: 400,
            zdrop_inv: 200,
            max_gap: 5000,
            bandwidth: 500,
            min_chain_score: 40,
            max_chain_skip: 25,
            max_chain_iter: 5000,
        }
    }
}

///////////////////////////////
/// Complete tuning for one run. Built once, then shared by reference
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    pub store: StoreParams,
    pub assembly: AssemblyParams,
    pub aligner: AlignerParams,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let asm = &self.assembly;
        if asm.min_overlap == 0 {
            return Err(Error::invalid_config("minimum overlap must be positive"));
        }
        if asm.seed_length == 0 || asm.seed_length > asm.min_overlap {
            return Err(Error::invalid_config(format!(
                "seed length {} must be in 1..={} (the minimum overlap)",
                asm.seed_length, asm.min_overlap
            )));
        }
        if asm.seed_stride == 0 {
            return Err(Error::invalid_config("seed stride must be positive"));
        }
        if !(0.0..1.0).contains(&asm.error_rate) {
            return Err(Error::invalid_config(format!(
                "error rate {} must be in [0, 1)",
                asm.error_rate
            )));
        }
        if asm.max_containment_rounds == 0 {
            return Err(Error::invalid_config(
                "at least one containment removal round is required",
            ));
        }

        let aln = &self.aligner;
        if aln.minimizer_k == 0 || aln.minimizer_k > 28 {
            return Err(Error::invalid_config(format!(
                "minimizer k {} must be in 1..=28",
                aln.minimizer_k
            )));
        }
        if aln.minimizer_w == 0 {
            return Err(Error::invalid_config("minimizer window must be positive"));
        }
        if aln.bucket_bits == 0 || aln.bucket_bits > 20 {
            return Err(Error::invalid_config(format!(
                "bucket bits {} must be in 1..=20",
                aln.bucket_bits
            )));
        }
        if aln.match_score <= 0 {
            return Err(Error::invalid_config("match score must be positive"));
        }
        if aln.mismatch_penalty < 0
            || aln.gap_open < 0
            || aln.gap_extend <= 0
            || aln.gap_open_long < 0
            || aln.gap_extend_long <= 0
        {
            return Err(Error::invalid_config(
                "mismatch and gap penalties must be non-negative (extensions positive)",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert!(config.assembly.exact_mode());
        assert_eq!(config.store.poor_alignment_max_mapq, 10);
    }

    #[test]
    fn test_seed_longer_than_overlap_rejected() {
        let mut config = Config::default();
        config.assembly.seed_length = config.assembly.min_overlap + 1;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_max_diff_follows_error_rate() {
        let mut params = AssemblyParams::default();
        assert_eq!(params.max_diff(100), 0);
        params.error_rate = 0.04;
        assert!(!params.exact_mode());
        assert_eq!(params.max_diff(100), 4);
        assert_eq!(params.max_diff(24), 0);
    }
}
