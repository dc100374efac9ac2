//! # StillOnTime Notify
//!
//! Persist-first notification delivery. Every notification is written to
//! the outbox as `pending`, then a background sweep claims due rows and
//! dispatches them over the user's opted-in channels (SMTP email, Twilio
//! SMS, FCM push). Failed rows are retried up to a configured budget.

pub mod dispatch;
pub mod outbox;
pub mod templates;

pub use outbox::{Outbox, spawn_outbox_sweeps};
pub use templates::{NotifyContext, RenderedMessage, render};
