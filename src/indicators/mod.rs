// =============================================================================
// Technical indicators
// =============================================================================
//
// Pure, side-effect-free implementations. Every public function returns
// `Option<T>` so callers are forced to handle insufficient-data cases.

pub mod sma;
