pub mod financials;
pub mod job;
pub mod market;
pub mod price;
pub mod watchlist;

pub use financials::*;
pub use job::*;
pub use market::*;
pub use price::*;
pub use watchlist::*;
