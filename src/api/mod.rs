pub mod rest;
pub mod sse;

pub use rest::router;
