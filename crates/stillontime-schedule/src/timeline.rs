//! Timeline generation — the ordered list of named events for one
//! shooting day, from wake-up through estimated wrap.

use chrono::Duration;

use stillontime_core::Result;
use stillontime_core::types::{
    Language, RoutePlan, ScheduleData, TimelineEntry, TimelineKind,
};

use crate::templates::Templates;

/// Hours between call time and the estimated wrap.
const WRAP_HOURS: i64 = 10;

/// Build the day's timeline from a schedule and its route plan.
/// Entries are always sorted ascending by time.
pub fn build_timeline(
    schedule: &ScheduleData,
    route_plan: Option<&RoutePlan>,
    language: Language,
) -> Result<Vec<TimelineEntry>> {
    let t = Templates::for_language(language);
    let call = schedule.call_datetime()?;
    let mut entries = Vec::new();

    if let Some(plan) = route_plan {
        entries.push(TimelineEntry {
            time: plan.wake_up_time,
            event: t.wake_up.to_string(),
            kind: TimelineKind::WakeUp,
            location: None,
        });
        entries.push(TimelineEntry {
            time: plan.departure_time,
            event: t.departure.to_string(),
            kind: TimelineKind::Departure,
            location: None,
        });
        entries.push(TimelineEntry {
            time: plan.arrival_time,
            event: t.arrival.to_string(),
            kind: TimelineKind::Arrival,
            location: Some(schedule.location.clone()),
        });
    }

    entries.push(TimelineEntry {
        time: call,
        event: t.call_time.to_string(),
        kind: TimelineKind::CallTime,
        location: Some(schedule.location.clone()),
    });
    entries.push(TimelineEntry {
        time: call + Duration::hours(WRAP_HOURS),
        event: t.estimated_wrap.to_string(),
        kind: TimelineKind::EstimatedWrap,
        location: None,
    });

    entries.sort_by_key(|e| e.time);
    Ok(entries)
}
