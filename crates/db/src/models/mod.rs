//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching its table plus
//! any input or aggregate DTOs its repository accepts or returns.

pub mod job_state;
pub mod known_face;
pub mod ledger;
pub mod queue;
pub mod worker;
