//! # StillOnTime Gateway
//!
//! Axum HTTP API in front of the store, the schedule services, the
//! weather client and the notification outbox. `/api/...` routes sit
//! behind an API-key check and a per-client rate limit; every error
//! leaves as a uniform JSON envelope.

pub mod error;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, build_router, start};
