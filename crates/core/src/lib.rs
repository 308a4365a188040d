//! Shared building blocks for the solver operator crates.
//!
//! - [`Error`] / [`Result`]: typed errors for file and config handling
//! - [`ResultExt`]: logging combinators that never panic
//! - [`config`]: TOML/JSON file loading into any `serde` type

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod error;
pub mod result;

pub use error::Error;
pub use result::{Result, ResultExt};
