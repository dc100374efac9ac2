//! Domain model — the data shapes shared by the store, the schedule
//! services, the notification outbox, and the gateway.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StillOnTimeError};

/// Named minute offsets reserved before a call time.
/// All values are non-negative minutes; a calculation call never mutates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBuffers {
    #[serde(default)]
    pub car_change: u32,
    #[serde(default)]
    pub parking: u32,
    #[serde(default)]
    pub entry: u32,
    #[serde(default)]
    pub traffic: u32,
    #[serde(default)]
    pub morning_routine: u32,
}

impl TimeBuffers {
    /// Total buffer minutes. Saturates rather than wrapping — the fields
    /// arrive unvalidated from API payloads.
    pub fn sum(&self) -> u32 {
        self.car_change
            .saturating_add(self.parking)
            .saturating_add(self.entry)
            .saturating_add(self.traffic)
            .saturating_add(self.morning_routine)
    }
}

impl Default for TimeBuffers {
    fn default() -> Self {
        Self {
            car_change: 10,
            parking: 10,
            entry: 10,
            traffic: 20,
            morning_routine: 45,
        }
    }
}

/// Interior or exterior shoot — EXT scenes get weather warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneType {
    Int,
    Ext,
}

/// One shooting day's metadata, as extracted from a call sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleData {
    pub id: String,
    pub shooting_date: NaiveDate,
    /// "HH:MM", validated by [`parse_call_time`].
    pub call_time: String,
    pub location: String,
    pub scene_type: SceneType,
    #[serde(default)]
    pub scenes: Vec<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub contacts: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleData {
    /// The call time anchored on the shooting date, in UTC.
    pub fn call_datetime(&self) -> Result<DateTime<Utc>> {
        let time = parse_call_time(&self.call_time)?;
        Ok(Utc.from_utc_datetime(&self.shooting_date.and_time(time)))
    }

    /// Whether the shoot is today or later.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.shooting_date >= now.date_naive()
    }
}

/// Parse a "HH:MM" call time string.
pub fn parse_call_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| StillOnTimeError::Validation(format!("invalid call time '{s}', expected HH:MM")))
}

/// One leg of the route to set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    /// "drive", "walk", "transit", ...
    pub mode: String,
    pub description: String,
    pub minutes: u32,
}

/// Derived wake-up/departure/arrival plan for one schedule.
/// Exactly one per [`ScheduleData`] (UNIQUE schedule_id in the store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePlan {
    pub schedule_id: String,
    pub wake_up_time: DateTime<Utc>,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    /// Travel plus all buffers, in minutes.
    pub total_travel_minutes: u32,
    #[serde(default)]
    pub route_segments: Vec<RouteSegment>,
    pub buffers: TimeBuffers,
    pub computed_at: DateTime<Utc>,
}

impl RoutePlan {
    /// A plan for an upcoming shoot goes stale 24h after it was computed.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.computed_at > chrono::Duration::hours(24)
    }
}

/// Forecast snapshot for a schedule's shooting date and location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherData {
    pub schedule_id: String,
    pub forecast_date: NaiveDate,
    pub temperature_c: f64,
    pub wind_speed_kmh: f64,
    pub precipitation_mm: f64,
    pub humidity_pct: f64,
    pub condition: String,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherData {
    /// Forecasts are refreshed every 6 hours while the shoot is upcoming.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at > chrono::Duration::hours(6)
    }
}

/// Summary language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Pl,
    En,
}

impl Default for Language {
    fn default() -> Self {
        Self::Pl
    }
}

/// What a timeline entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineKind {
    WakeUp,
    Departure,
    Arrival,
    CallTime,
    EstimatedWrap,
}

/// One row of the daily timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub time: DateTime<Utc>,
    pub event: String,
    pub kind: TimelineKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Generated daily summary, cached per schedule (upsert by schedule_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub schedule_id: String,
    pub content: String,
    pub html_content: String,
    pub timeline: Vec<TimelineEntry>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub language: Language,
    pub generated_at: DateTime<Utc>,
}

/// Delivery channel for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
    Push,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Push => "push",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email" => Some(Self::Email),
            "sms" => Some(Self::Sms),
            "push" => Some(Self::Push),
            _ => None,
        }
    }
}

/// Outbox row status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sending,
    Sent,
    Failed,
    Cancelled,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "sending" => Self::Sending,
            "sent" => Self::Sent,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

/// A notification outbox row — persisted first, dispatched after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub channel: NotificationChannel,
    /// Template name this row was rendered from.
    pub template: String,
    pub subject: String,
    pub body: String,
    pub status: NotificationStatus,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

/// A crew member receiving notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub push_token: String,
    #[serde(default)]
    pub language: Language,
    /// Channels this user has opted into.
    #[serde(default)]
    pub channels: Vec<NotificationChannel>,
}

/// Record of an already-ingested call-sheet email.
/// Duplicate detection matches on message_id OR pdf_hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedEmail {
    pub message_id: String,
    pub pdf_hash: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_id: Option<String>,
    pub processed_at: DateTime<Utc>,
}

/// Calendar event mirror for a schedule. Only the data we exchange with
/// the calendar provider is modeled; the provider API lives outside this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub schedule_id: String,
    /// Event id on the provider side, empty until first sync.
    #[serde(default)]
    pub external_id: String,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call_time() {
        assert_eq!(
            parse_call_time("08:00").unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap()
        );
        assert_eq!(
            parse_call_time(" 23:45 ").unwrap(),
            NaiveTime::from_hms_opt(23, 45, 0).unwrap()
        );
        assert!(parse_call_time("8am").is_err());
        assert!(parse_call_time("25:00").is_err());
    }

    #[test]
    fn test_buffer_sum() {
        let b = TimeBuffers {
            car_change: 15,
            parking: 10,
            entry: 10,
            traffic: 20,
            morning_routine: 45,
        };
        assert_eq!(b.sum(), 100);
    }

    #[test]
    fn test_route_plan_staleness() {
        let now = Utc::now();
        let plan = RoutePlan {
            schedule_id: "s1".into(),
            wake_up_time: now,
            departure_time: now,
            arrival_time: now,
            total_travel_minutes: 60,
            route_segments: vec![],
            buffers: TimeBuffers::default(),
            computed_at: now - chrono::Duration::hours(25),
        };
        assert!(plan.is_stale(now));
    }
}
