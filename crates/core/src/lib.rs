// crates/core/src/lib.rs
pub mod enhance;
pub mod error;

pub use enhance::*;
pub use error::*;
