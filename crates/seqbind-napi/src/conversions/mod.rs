//! Rust ↔ JS conversions and error mapping.

pub mod error_codes;
pub mod types;
