#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

mod clock;
pub use clock::*;

mod common;
pub use common::*;

mod error;
pub use error::*;

mod options;
pub use options::*;

mod reclaim;

mod runtime;

mod tracker;
pub use tracker::Tracker;

#[cfg(test)]
mod tests;
