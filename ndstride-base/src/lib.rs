//! Common utilities used by other ndstride crates.
//!
//! This is an internal crate which contains iteration helpers that don't
//! depend on array layouts.

pub mod iter;
