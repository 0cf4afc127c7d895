//! swarmbench: adaptive load generator for trading-exchange benchmarks
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod random;
pub mod ledger;
pub mod client;
pub mod investor;
pub mod engine;
