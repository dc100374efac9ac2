//! Time schedule calculation — wake-up/departure/arrival arithmetic plus
//! rule-based validation and buffer optimization.
//!
//! All timestamps are anchored on the shooting date so that subtraction
//! crosses midnight correctly (a 05:00 call with 6h of travel+buffers puts
//! the wake-up on the previous day).

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use stillontime_core::types::{TimeBuffers, parse_call_time};
use stillontime_core::{Result, StillOnTimeError};

/// Upper bound on travel minutes and on the buffer total (24h). Both come
/// straight from API payloads.
const MAX_MINUTES: u32 = 24 * 60;

/// Result of a time schedule calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSchedule {
    pub wake_up_time: DateTime<Utc>,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    /// Travel plus the sum of all buffers, in minutes.
    pub total_travel_minutes: u32,
    pub buffer_breakdown: TimeBuffers,
    pub recommendations: Vec<String>,
    pub warnings: Vec<String>,
}

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// One validation finding, machine-readable code plus human message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

/// Derive the full time schedule for one shooting day.
///
/// Arithmetic: arrival = call time; departure = call − travel;
/// total = travel + sum(buffers); wake-up = call − total.
pub fn calculate_time_schedule(
    shooting_date: NaiveDate,
    call_time: &str,
    travel_minutes: u32,
    buffers: &TimeBuffers,
) -> Result<TimeSchedule> {
    let call = Utc.from_utc_datetime(&shooting_date.and_time(parse_call_time(call_time)?));

    if travel_minutes > MAX_MINUTES {
        return Err(StillOnTimeError::Validation(format!(
            "Travel time of {travel_minutes} min exceeds 24h"
        )));
    }
    let buffer_sum = buffers.sum();
    if buffer_sum > MAX_MINUTES {
        return Err(StillOnTimeError::Validation(format!(
            "Buffer total of {buffer_sum} min exceeds 24h"
        )));
    }

    let total_travel_minutes = travel_minutes + buffer_sum;
    let arrival_time = call;
    let departure_time = call - Duration::minutes(i64::from(travel_minutes));
    let wake_up_time = call - Duration::minutes(i64::from(total_travel_minutes));

    let mut schedule = TimeSchedule {
        wake_up_time,
        departure_time,
        arrival_time,
        total_travel_minutes,
        buffer_breakdown: *buffers,
        recommendations: Vec::new(),
        warnings: Vec::new(),
    };

    schedule.recommendations = build_recommendations(&schedule, travel_minutes);
    schedule.warnings = validate_time_schedule(&schedule)
        .into_iter()
        .map(|issue| issue.message)
        .collect();

    Ok(schedule)
}

/// Static recommendation rules keyed off thresholds.
fn build_recommendations(schedule: &TimeSchedule, travel_minutes: u32) -> Vec<String> {
    let mut recs = Vec::new();

    if schedule.wake_up_time.hour() < 4 {
        recs.push(
            "Wake-up is before 04:00 — prepare equipment and clothes the night before".to_string(),
        );
    }
    if schedule.buffer_breakdown.traffic < 30 && travel_minutes > 60 {
        recs.push(format!(
            "Traffic buffer is only {} min for a {} min drive — consider increasing it to 30 min",
            schedule.buffer_breakdown.traffic, travel_minutes
        ));
    }
    if schedule.total_travel_minutes > 180 {
        recs.push(
            "Total morning commitment exceeds 3h — consider accommodation closer to set"
                .to_string(),
        );
    }

    recs
}

/// Classify a computed schedule into validation findings.
///
/// Pure and deterministic. Decreasing the wake-up hour never reduces the
/// reported severity: before 03:00 is an error, before 04:00 a warning.
pub fn validate_time_schedule(schedule: &TimeSchedule) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let wake_minutes = schedule.wake_up_time.hour() * 60 + schedule.wake_up_time.minute();
    if wake_minutes < 3 * 60 {
        issues.push(ValidationIssue {
            severity: Severity::Error,
            code: "early_wake_up".into(),
            message: format!(
                "Wake-up at {} is before 03:00 — schedule is not sustainable",
                schedule.wake_up_time.format("%H:%M")
            ),
        });
    } else if wake_minutes < 4 * 60 {
        issues.push(ValidationIssue {
            severity: Severity::Warning,
            code: "early_wake_up".into(),
            message: format!(
                "Wake-up at {} is before 04:00",
                schedule.wake_up_time.format("%H:%M")
            ),
        });
    }

    if schedule.total_travel_minutes > 240 {
        issues.push(ValidationIssue {
            severity: Severity::Warning,
            code: "excessive_total_travel".into(),
            message: format!(
                "Total travel time of {} min exceeds 4h",
                schedule.total_travel_minutes
            ),
        });
    }

    let travel_minutes = schedule
        .total_travel_minutes
        .saturating_sub(schedule.buffer_breakdown.sum());
    if travel_minutes > 60 && schedule.buffer_breakdown.traffic < travel_minutes / 4 {
        issues.push(ValidationIssue {
            severity: Severity::Warning,
            code: "insufficient_traffic_buffer".into(),
            message: format!(
                "Traffic buffer of {} min is under a quarter of the {} min travel time",
                schedule.buffer_breakdown.traffic, travel_minutes
            ),
        });
    }

    issues
}

/// Conditions feeding buffer optimization.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OptimizeContext {
    pub travel_minutes: u32,
    #[serde(default)]
    pub fog: bool,
    #[serde(default)]
    pub bad_weather: bool,
}

/// Optimized buffers plus the reasoning behind each adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferOptimization {
    pub buffers: TimeBuffers,
    pub reasoning: Vec<String>,
}

/// Additive buffer adjustments from a static rule table.
/// Never decreases a buffer; returns the inputs untouched when no rule fires.
pub fn generate_optimized_buffers(
    buffers: &TimeBuffers,
    context: &OptimizeContext,
) -> BufferOptimization {
    let mut out = *buffers;
    let mut reasoning = Vec::new();

    if context.travel_minutes > 90 {
        out.traffic = out.traffic.saturating_add(15);
        reasoning.push(format!(
            "Travel over 90 min — traffic buffer raised by 15 min to {}",
            out.traffic
        ));
    }
    if context.fog {
        out.traffic = out.traffic.saturating_add(20);
        reasoning.push(format!(
            "Fog forecast — traffic buffer raised by 20 min to {}",
            out.traffic
        ));
    }
    if context.bad_weather {
        out.morning_routine = out.morning_routine.saturating_add(10);
        reasoning.push(format!(
            "Bad weather — morning routine raised by 10 min to {}",
            out.morning_routine
        ));
    }

    BufferOptimization {
        buffers: out,
        reasoning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn buffers() -> TimeBuffers {
        TimeBuffers {
            car_change: 15,
            parking: 10,
            entry: 10,
            traffic: 20,
            morning_routine: 45,
        }
    }

    #[test]
    fn test_worked_example() {
        // call 08:00, travel 45, buffers {15,10,10,20,45}
        let s = calculate_time_schedule(date(), "08:00", 45, &buffers()).unwrap();
        assert_eq!(s.arrival_time.format("%H:%M").to_string(), "08:00");
        assert_eq!(s.departure_time.format("%H:%M").to_string(), "07:15");
        assert_eq!(s.total_travel_minutes, 145);
        assert_eq!(s.wake_up_time.format("%H:%M").to_string(), "05:35");
    }

    #[test]
    fn test_total_is_travel_plus_buffer_sum() {
        for travel in [0u32, 30, 95, 240] {
            let s = calculate_time_schedule(date(), "10:30", travel, &buffers()).unwrap();
            assert_eq!(s.total_travel_minutes, travel + buffers().sum());
            let wake_offset = s.arrival_time - s.wake_up_time;
            assert_eq!(wake_offset.num_minutes(), i64::from(s.total_travel_minutes));
        }
    }

    #[test]
    fn test_wake_up_crosses_midnight() {
        // 05:00 call with 6h of commitments lands on the previous day
        let b = TimeBuffers {
            car_change: 0,
            parking: 0,
            entry: 0,
            traffic: 60,
            morning_routine: 60,
        };
        let s = calculate_time_schedule(date(), "05:00", 240, &b).unwrap();
        assert_eq!(s.wake_up_time.date_naive(), date().pred_opt().unwrap());
        assert_eq!(s.wake_up_time.format("%H:%M").to_string(), "23:00");
    }

    #[test]
    fn test_validation_severity_bands() {
        let mk = |wake_hour: u32| {
            let call_minutes = wake_hour * 60 + 300; // wake + 5h = call
            let call = format!("{:02}:{:02}", call_minutes / 60 % 24, call_minutes % 60);
            calculate_time_schedule(date(), &call, 200, &buffers()).unwrap()
        };

        let errors = validate_time_schedule(&mk(2));
        assert!(
            errors
                .iter()
                .any(|i| i.code == "early_wake_up" && i.severity == Severity::Error)
        );

        let warnings = validate_time_schedule(&mk(3));
        assert!(
            warnings
                .iter()
                .any(|i| i.code == "early_wake_up" && i.severity == Severity::Warning)
        );

        let clean = validate_time_schedule(&mk(5));
        assert!(clean.iter().all(|i| i.code != "early_wake_up"));
    }

    #[test]
    fn test_validation_monotonic_in_wake_hour() {
        // Decreasing wake-up hour never reduces severity
        let severity_at = |hour: u32| {
            let call_minutes = (hour * 60 + 300) % (24 * 60);
            let call = format!("{:02}:{:02}", call_minutes / 60, call_minutes % 60);
            let s = calculate_time_schedule(date(), &call, 200, &buffers()).unwrap();
            validate_time_schedule(&s)
                .into_iter()
                .filter(|i| i.code == "early_wake_up")
                .map(|i| match i.severity {
                    Severity::Warning => 1,
                    Severity::Error => 2,
                })
                .max()
                .unwrap_or(0)
        };

        let mut prev = severity_at(0);
        for hour in 1..8 {
            let next = severity_at(hour);
            assert!(next <= prev, "severity increased from hour {} to {}", hour - 1, hour);
            prev = next;
        }
    }

    #[test]
    fn test_excessive_travel_and_traffic_buffer() {
        let b = TimeBuffers {
            car_change: 0,
            parking: 0,
            entry: 0,
            traffic: 10,
            morning_routine: 30,
        };
        let s = calculate_time_schedule(date(), "12:00", 220, &b).unwrap();
        let issues = validate_time_schedule(&s);
        assert!(issues.iter().any(|i| i.code == "excessive_total_travel"));
        assert!(issues.iter().any(|i| i.code == "insufficient_traffic_buffer"));
    }

    #[test]
    fn test_recommendations() {
        // early wake-up + short traffic buffer on a long drive
        let b = TimeBuffers {
            car_change: 10,
            parking: 10,
            entry: 10,
            traffic: 15,
            morning_routine: 45,
        };
        let s = calculate_time_schedule(date(), "06:00", 90, &b).unwrap();
        assert!(s.recommendations.iter().any(|r| r.contains("night before")));
        assert!(s.recommendations.iter().any(|r| r.contains("Traffic buffer")));
    }

    #[test]
    fn test_oversized_inputs_are_rejected() {
        assert!(calculate_time_schedule(date(), "08:00", u32::MAX, &buffers()).is_err());

        let huge = TimeBuffers {
            morning_routine: u32::MAX,
            ..buffers()
        };
        assert!(calculate_time_schedule(date(), "08:00", 45, &huge).is_err());

        // 24h exactly is still accepted
        assert!(calculate_time_schedule(date(), "08:00", 24 * 60, &buffers()).is_ok());
    }

    #[test]
    fn test_optimizer_saturates_at_extremes() {
        let b = TimeBuffers {
            traffic: u32::MAX,
            ..TimeBuffers::default()
        };
        let ctx = OptimizeContext {
            travel_minutes: 120,
            fog: true,
            bad_weather: true,
        };
        let opt = generate_optimized_buffers(&b, &ctx);
        assert_eq!(opt.buffers.traffic, u32::MAX);
        assert_eq!(
            opt.buffers.morning_routine,
            TimeBuffers::default().morning_routine + 10
        );
        // the oversized result still fails calculation cleanly
        assert!(calculate_time_schedule(date(), "08:00", 45, &opt.buffers).is_err());
    }

    #[test]
    fn test_optimized_buffers_additive() {
        let base = buffers();
        let ctx = OptimizeContext {
            travel_minutes: 120,
            fog: true,
            bad_weather: true,
        };
        let opt = generate_optimized_buffers(&base, &ctx);
        assert_eq!(opt.buffers.traffic, base.traffic + 15 + 20);
        assert_eq!(opt.buffers.morning_routine, base.morning_routine + 10);
        assert_eq!(opt.reasoning.len(), 3);

        // no rule fires → untouched, no reasoning
        let noop = generate_optimized_buffers(&base, &OptimizeContext::default());
        assert_eq!(noop.buffers, base);
        assert!(noop.reasoning.is_empty());
    }
}
