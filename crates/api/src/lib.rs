//! Visage coordinator library.
//!
//! Exposes the building blocks of the HTTP service (config, state, error
//! handling, coordinator operations, routes, background tasks) so that
//! integration tests and the binary entrypoint share them.

pub mod background;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
