//! Oriel Core
//!
//! This crate provides the value model shared by the Oriel window
//! evaluation engine:
//!
//! - [`Value`] - the scalar value type flowing through evaluation
//! - [`compare_values`] - SQL ordering with explicit null placement
//! - [`CoreError`] - error type for value operations
//!
//! # Example
//!
//! ```
//! use oriel_core::Value;
//!
//! let v: Value = 42i64.into();
//! assert_eq!(v.as_int(), Some(42));
//! ```

pub mod error;
pub mod types;

pub use error::CoreError;
pub use types::{compare_values, Value};
