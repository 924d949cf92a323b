pub mod executor;

pub use executor::{seed_if_empty, SeedSampleData};
