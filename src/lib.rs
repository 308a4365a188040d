#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # Solver operator
//!
//! Watches Solver resources and runs each one as a Job until the
//! dependency resolution it describes has succeeded.
//!
//! This library holds the binary's CLI, configuration and process wiring.

pub mod cli;
pub mod config;
pub mod operator;

pub use config::{ConfigError, OperatorConfig, Overrides};
pub use operator::Operator;
