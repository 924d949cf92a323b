pub mod executor;

pub use executor::{find_revenue_drift, run, DiscountCategory};
