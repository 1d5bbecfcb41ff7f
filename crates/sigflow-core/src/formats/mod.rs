//! # Formats Module
//!
//! Binary plan format and plan checksums.
//!
//! File I/O operations are in the app layer; this module only converts
//! between plans and bytes.

mod persistence;

pub use persistence::*;
