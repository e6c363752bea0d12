pub mod asqg;
pub mod bam;
pub mod fasta;
mod read;

pub use read::Read;
pub use read::BARCODE_TAG;
pub use read::{FLAG_MATE_REVERSE, FLAG_MATE_UNMAPPED, FLAG_PAIRED, FLAG_REVERSE, FLAG_UNMAPPED};

pub use asqg::AsqgGraph;
pub use asqg::AsqgHeader;
pub use asqg::Overlap;
pub use asqg::SeqCoord;
pub use asqg::VertexRecord;

pub use bam::AlignmentStore;
pub use bam::HtsAlignmentStore;
pub use bam::InMemoryStore;

pub use fasta::NamedSequence;
pub use fasta::ReferenceGenome;
