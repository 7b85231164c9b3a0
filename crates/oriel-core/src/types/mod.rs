//! Core types for window evaluation.

mod cmp;
mod value;

pub use cmp::compare_values;
pub use value::Value;
