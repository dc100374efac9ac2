//! # StillOnTime Ingest
//!
//! Watches an IMAP mailbox for call-sheet emails. Each email with a PDF
//! attachment is deduplicated (message id OR PDF hash), its schedule
//! fields extracted from the subject and body, and the resulting
//! schedule persisted and announced to the crew.

pub mod extract;
pub mod imap;
pub mod processor;

pub use extract::{ExtractedSchedule, extract_schedule_fields, pdf_hash};
pub use imap::{FetchedEmail, fetch_unread};
pub use processor::{Ingestor, spawn_ingest_loop};
