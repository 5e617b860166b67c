pub mod checks;
pub mod contraction;

pub use checks::{footprint, is_pivot_good, pattern_age_days, pivot_price, run_vcp_screening, stop_loss};
pub use contraction::{find_one_contraction, find_pattern, Contraction};
