pub mod align;
pub mod assemble;
pub mod barcodes;
pub mod config_args;
pub mod threadcount;

pub use align::AlignCMD;
pub use assemble::{Assemble, AssembleCMD};
pub use barcodes::BarcodesCMD;
pub use config_args::{build_config, AlignerArgs, AssemblyArgs, StoreArgs};
pub use threadcount::determine_thread_count;
