#![forbid(unsafe_code)]
//! Builders and renderers for flat and nested table layouts.
//!
//! Builders are pure reducers: each action takes the current layout and
//! returns the next one without touching the input.

mod error;
pub mod flat;
mod key;
pub mod nested;
pub mod text;

pub use error::{LayoutError, LayoutErrorCode};
pub use key::{CellKey, FieldErrors, InputCell, RawValue, ValueMap};

pub const CRATE_NAME: &str = "commtest-layout";
