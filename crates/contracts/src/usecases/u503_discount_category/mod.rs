pub mod request;
pub mod response;

pub use request::DiscountRequest;
pub use response::DiscountReport;
