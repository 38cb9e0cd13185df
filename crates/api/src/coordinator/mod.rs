//! Coordinator operations behind the HTTP handlers.
//!
//! The coordinator enqueues jobs and reads the job state tracker, the ledger
//! and the worker heartbeats. It never mutates job state or ledger records
//! during normal operation; bulk clear and targeted delete are the only
//! writers here.

pub mod census;
pub mod faces;
pub mod files;
pub mod results;
pub mod stats;
pub mod status;
pub mod submit;

pub use submit::Upload;
