//! Core engine: identity prefetch, investor registry, score tracking,
//! the run controller, and the executor for the work it produces.

pub mod controller;
pub mod executor;
pub mod prefetch;
pub mod registry;
pub mod report;
pub mod run;
pub mod task;
pub mod tracker;
