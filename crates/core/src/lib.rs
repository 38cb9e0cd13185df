//! Domain types and pure rules shared by the coordinator and the workers.
//!
//! Nothing in this crate performs I/O.

pub mod error;
pub mod job;
pub mod recognition;
pub mod stats;
pub mod types;
pub mod upload;
pub mod worker_pool;
