//! Minimizer-based local alignment of contigs and reads against reference windows

mod aligner;
pub mod chain;
pub mod extend;
mod hit;
pub mod minimizer;

pub use aligner::SequenceAligner;
pub use hit::{write_summary, write_summary_to_path, AlignmentHit};
