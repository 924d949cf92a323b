pub mod common;
pub mod u503_discount_category;
