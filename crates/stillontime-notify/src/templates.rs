//! Per-template, per-language notification content.
//!
//! Email gets the long body; SMS and push get the short one-liner.

use stillontime_core::types::{
    Language, NotificationChannel, RoutePlan, ScheduleData, WeatherData,
};
use stillontime_core::{Result, StillOnTimeError};

/// Template names accepted by [`render`].
pub const TEMPLATE_SCHEDULE_CREATED: &str = "schedule_created";
pub const TEMPLATE_SCHEDULE_UPDATED: &str = "schedule_updated";
pub const TEMPLATE_WAKE_UP_REMINDER: &str = "wake_up_reminder";
pub const TEMPLATE_WEATHER_ALERT: &str = "weather_alert";

/// Everything a template may reference.
#[derive(Debug, Clone, Copy)]
pub struct NotifyContext<'a> {
    pub schedule: &'a ScheduleData,
    pub route_plan: Option<&'a RoutePlan>,
    pub weather: Option<&'a WeatherData>,
}

/// Rendered subject and body for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

struct Strings {
    new_schedule: &'static str,
    updated_schedule: &'static str,
    wake_up_reminder: &'static str,
    weather_alert: &'static str,
    date: &'static str,
    call_time: &'static str,
    location: &'static str,
    wake_up: &'static str,
    departure: &'static str,
    tomorrow: &'static str,
}

const PL: Strings = Strings {
    new_schedule: "Nowy plan zdjęciowy",
    updated_schedule: "Zmiana planu zdjęciowego",
    wake_up_reminder: "Przypomnienie o pobudce",
    weather_alert: "Ostrzeżenie pogodowe",
    date: "Data",
    call_time: "Czas zbiórki",
    location: "Lokacja",
    wake_up: "Pobudka",
    departure: "Wyjazd",
    tomorrow: "jutro",
};

const EN: Strings = Strings {
    new_schedule: "New shooting schedule",
    updated_schedule: "Shooting schedule changed",
    wake_up_reminder: "Wake-up reminder",
    weather_alert: "Weather alert",
    date: "Date",
    call_time: "Call time",
    location: "Location",
    wake_up: "Wake up",
    departure: "Departure",
    tomorrow: "tomorrow",
};

fn strings(language: Language) -> &'static Strings {
    match language {
        Language::Pl => &PL,
        Language::En => &EN,
    }
}

fn is_short(channel: NotificationChannel) -> bool {
    matches!(
        channel,
        NotificationChannel::Sms | NotificationChannel::Push
    )
}

/// Render one template for one channel and language.
pub fn render(
    template: &str,
    channel: NotificationChannel,
    language: Language,
    ctx: &NotifyContext<'_>,
) -> Result<RenderedMessage> {
    let s = strings(language);
    let schedule = ctx.schedule;
    let date = schedule.shooting_date.format("%Y-%m-%d");

    let rendered = match template {
        TEMPLATE_SCHEDULE_CREATED | TEMPLATE_SCHEDULE_UPDATED => {
            let title = if template == TEMPLATE_SCHEDULE_CREATED {
                s.new_schedule
            } else {
                s.updated_schedule
            };
            let subject = format!("{title} — {date}");
            let body = if is_short(channel) {
                format!(
                    "{title} {date}: {} {}, {}",
                    s.call_time, schedule.call_time, schedule.location
                )
            } else {
                let mut body = format!(
                    "{title}\n\n{}: {date}\n{}: {}\n{}: {}\n",
                    s.date, s.call_time, schedule.call_time, s.location, schedule.location
                );
                if let Some(plan) = ctx.route_plan {
                    body.push_str(&format!(
                        "{}: {}\n{}: {}\n",
                        s.wake_up,
                        plan.wake_up_time.format("%H:%M"),
                        s.departure,
                        plan.departure_time.format("%H:%M")
                    ));
                }
                body
            };
            RenderedMessage { subject, body }
        }
        TEMPLATE_WAKE_UP_REMINDER => {
            let plan = ctx.route_plan.ok_or_else(|| {
                StillOnTimeError::Validation(
                    "wake_up_reminder needs a computed route plan".into(),
                )
            })?;
            let subject = format!("{} — {date}", s.wake_up_reminder);
            let line = format!(
                "{} {}: {} {}, {} {}",
                s.wake_up_reminder,
                s.tomorrow,
                s.wake_up,
                plan.wake_up_time.format("%H:%M"),
                s.departure,
                plan.departure_time.format("%H:%M")
            );
            let body = if is_short(channel) {
                line
            } else {
                format!(
                    "{line}\n\n{}: {} ({})\n",
                    s.call_time, schedule.call_time, schedule.location
                )
            };
            RenderedMessage { subject, body }
        }
        TEMPLATE_WEATHER_ALERT => {
            let weather = ctx.weather.ok_or_else(|| {
                StillOnTimeError::Validation("weather_alert needs weather data".into())
            })?;
            let subject = format!("{} — {date}", s.weather_alert);
            let body = if is_short(channel) {
                format!("{}: {}", s.weather_alert, weather.warnings.join("; "))
            } else {
                let mut body = format!(
                    "{}\n\n{}: {}, {:.0}°C\n\n",
                    s.weather_alert, s.location, schedule.location, weather.temperature_c
                );
                for w in &weather.warnings {
                    body.push_str(&format!("⚠ {w}\n"));
                }
                body
            };
            RenderedMessage { subject, body }
        }
        other => {
            return Err(StillOnTimeError::Validation(format!(
                "unknown notification template '{other}'"
            )));
        }
    };
    Ok(rendered)
}
