//! Worker runtime: pulls jobs from the shared queue and executes them one
//! at a time, reporting progress and writing each outcome to the ledger.

pub mod config;
pub mod context;
pub mod error;
pub mod execute;
pub mod heartbeat;
pub mod registry;
pub mod runtime;

pub use config::WorkerConfig;
pub use context::WorkerContext;
pub use error::WorkerError;
