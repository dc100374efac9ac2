//! # StillOnTime Store
//!
//! One SQLite database behind one repository type. Every persisted entity
//! (schedules, route plans, weather, summaries, calendar events, users,
//! notification outbox, processed emails) gets a method group on
//! [`ScheduleDb`].

pub mod db;

pub use db::ScheduleDb;
