#[allow(clippy::module_inception)]
mod barcode;
mod store;

pub use barcode::Barcode;
pub use barcode::BarcodeCounts;

pub use store::collect_barcodes;
pub use store::is_weird;
pub use store::BarcodeReadStore;
