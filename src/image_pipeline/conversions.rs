//! Pipeline conversions module
//!
//! This module contains the orchestration of decode, fit and encode.

mod flat_field;

#[cfg(test)]
mod tests;

pub use flat_field::FlatFieldPipeline;
