//! Typed columns and condition operators.

pub mod column;
pub mod ops;

pub use column::Col;
