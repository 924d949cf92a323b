pub mod category;
pub mod region;

pub use category::Category;
pub use region::Region;
