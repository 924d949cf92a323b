pub mod aggregate;

pub use aggregate::{SalePeriod, SalesRecord};
