//! Local reassembly of genomic windows from linked reads

pub mod align;
pub mod assembly;
pub mod barcode;
pub mod command;
pub mod fileformat;
pub mod runtime;
