pub mod types;
pub mod filter;
pub mod filter_order;
pub mod error;

pub use types::*;
pub use filter::ListFilter;
pub use error::FilterError;
