//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&SqlitePool` as the first argument.

pub mod job_state_repo;
pub mod known_face_repo;
pub mod ledger_repo;
pub mod queue_repo;
pub mod worker_repo;

pub use job_state_repo::JobStateRepo;
pub use known_face_repo::KnownFaceRepo;
pub use ledger_repo::LedgerRepo;
pub use queue_repo::QueueRepo;
pub use worker_repo::WorkerRepo;
