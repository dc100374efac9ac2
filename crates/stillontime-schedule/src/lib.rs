//! # StillOnTime Schedule
//!
//! The computational slice of the backend: deriving wake-up, departure and
//! arrival times from a call time plus named buffers, validating the result
//! against early-wake and travel thresholds, and assembling the bilingual
//! daily summary (plain text + HTML) from schedule, route and weather data.
//!
//! Everything in this crate is deterministic and side-effect-free;
//! persistence happens in `stillontime-store`.

pub mod html;
pub mod summary;
pub mod templates;
pub mod text;
pub mod time_calc;
pub mod timeline;
pub mod warnings;

pub use summary::{SummaryOptions, SummaryOutput, generate_summary};
pub use templates::Templates;
pub use time_calc::{
    BufferOptimization, OptimizeContext, Severity, TimeSchedule, ValidationIssue,
    calculate_time_schedule, generate_optimized_buffers, validate_time_schedule,
};
pub use timeline::build_timeline;
pub use warnings::collect_warnings;
