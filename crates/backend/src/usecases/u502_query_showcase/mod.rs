pub mod executor;
pub mod queries;

pub use executor::{run_advanced, run_basic, QueryShowcase};
