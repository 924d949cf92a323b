pub mod executor;

pub use executor::{export_collection, ExportCsv};
