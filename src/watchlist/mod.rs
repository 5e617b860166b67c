pub mod funnel;
pub mod refresh;
pub mod status;
pub mod store;

pub use funnel::WatchlistFunnel;
pub use refresh::{RefreshSummary, WatchlistRefreshEngine};
pub use status::derive_status;
pub use store::WatchlistStore;
