//! # StillOnTime Core
//!
//! Shared foundation for the StillOnTime backend: configuration loading,
//! the crate-wide error type, and the domain model (schedules, route plans,
//! weather, summaries, notifications).

pub mod config;
pub mod error;
pub mod types;

pub use config::StillOnTimeConfig;
pub use error::{Result, StillOnTimeError};
