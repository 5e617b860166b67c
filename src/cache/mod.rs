pub mod cache_covers;
pub mod delisted;
pub mod rate_limiter;
pub mod store;
pub mod trading_calendar;

pub use cache_covers::{cache_covers_request, CacheCoversRequest};
pub use delisted::DelistedRegistry;
pub use rate_limiter::RateLimiter;
pub use store::{CacheKind, CacheStore};
