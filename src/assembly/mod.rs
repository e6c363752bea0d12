pub mod contig;
pub mod graph;
pub mod overlap;
pub mod read_table;
pub mod simplify;
mod window;

pub use contig::write_contigs;
pub use contig::Contig;

pub use graph::StringGraph;

pub use overlap::OverlapEngine;
pub use overlap::SuffixArrayOverlapper;

pub use read_table::ReadTable;
pub use read_table::ReadTableEntry;

pub use simplify::GraphStats;
pub use simplify::SimplifyReport;

pub use window::AssemblyWindow;
pub use window::Phase;
pub use window::Window;
pub use window::WindowAssembly;
pub use window::WindowStats;
