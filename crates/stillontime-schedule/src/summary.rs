//! Summary service — composes the timeline, warnings, and text/HTML
//! generators into one daily summary per schedule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stillontime_core::Result;
use stillontime_core::types::{
    Language, RoutePlan, ScheduleData, Summary, TimelineEntry, WeatherData,
};

use crate::templates::Templates;
use crate::{html, text, timeline, warnings};

/// Which optional blocks the generated summary includes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SummaryOptions {
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_true")]
    pub include_route: bool,
    #[serde(default = "default_true")]
    pub include_contacts: bool,
    #[serde(default = "default_true")]
    pub include_equipment: bool,
    #[serde(default)]
    pub include_safety_notes: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            language: Language::default(),
            include_route: true,
            include_contacts: true,
            include_equipment: true,
            include_safety_notes: false,
        }
    }
}

/// Generation metadata. `generated_at` is the only non-deterministic field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryMetadata {
    pub schedule_id: String,
    pub language: Language,
    pub generated_at: DateTime<Utc>,
}

/// A fully generated summary, ready to persist or send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub content: String,
    pub html_content: String,
    pub timeline: Vec<TimelineEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_summary: Option<String>,
    pub warnings: Vec<String>,
    pub metadata: SummaryMetadata,
}

impl SummaryOutput {
    /// Convert into the persistable record (upserted by schedule_id).
    pub fn into_summary(self) -> Summary {
        Summary {
            schedule_id: self.metadata.schedule_id,
            content: self.content,
            html_content: self.html_content,
            timeline: self.timeline,
            warnings: self.warnings,
            language: self.metadata.language,
            generated_at: self.metadata.generated_at,
        }
    }
}

/// Generate the daily summary for one schedule.
///
/// Deterministic for identical inputs — re-running with the same schedule,
/// route and weather data yields identical content and timeline (only
/// `metadata.generated_at` differs).
pub fn generate_summary(
    schedule: &ScheduleData,
    route_plan: Option<&RoutePlan>,
    weather: Option<&WeatherData>,
    options: &SummaryOptions,
) -> Result<SummaryOutput> {
    let t = Templates::for_language(options.language);

    let timeline = timeline::build_timeline(schedule, route_plan, options.language)?;
    let warnings = warnings::collect_warnings(schedule, route_plan, weather, options.language);

    let content = text::render_text(
        schedule, route_plan, weather, &timeline, &warnings, options, t,
    );
    let html_content = html::render_html(
        schedule, route_plan, weather, &timeline, &warnings, options, t,
    );

    let weather_summary = weather.map(|w| {
        format!(
            "{}: {}, {:.0}°C, {:.0} km/h, {:.1} mm",
            t.weather, w.condition, w.temperature_c, w.wind_speed_kmh, w.precipitation_mm
        )
    });

    tracing::debug!(
        "📝 Summary generated for schedule {} ({} timeline entries, {} warnings)",
        schedule.id,
        timeline.len(),
        warnings.len()
    );

    Ok(SummaryOutput {
        content,
        html_content,
        timeline,
        weather_summary,
        warnings,
        metadata: SummaryMetadata {
            schedule_id: schedule.id.clone(),
            language: options.language,
            generated_at: Utc::now(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use stillontime_core::types::{SceneType, TimeBuffers};

    fn fixture() -> (ScheduleData, RoutePlan, WeatherData) {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 13, 18, 0, 0).unwrap();
        let at = |h, m| Utc.from_utc_datetime(&date.and_hms_opt(h, m, 0).unwrap());

        let schedule = ScheduleData {
            id: "s1".into(),
            shooting_date: date,
            call_time: "08:00".into(),
            location: "Stage 4, Alvernia Studios".into(),
            scene_type: SceneType::Ext,
            scenes: vec!["12A".into(), "12B".into()],
            equipment: vec!["Steadicam".into()],
            contacts: vec!["1st AD: +48 600 000 000".into()],
            created_at: now,
            updated_at: now,
        };
        let plan = RoutePlan {
            schedule_id: "s1".into(),
            wake_up_time: at(5, 35),
            departure_time: at(7, 15),
            arrival_time: at(8, 0),
            total_travel_minutes: 145,
            route_segments: vec![],
            buffers: TimeBuffers {
                car_change: 15,
                parking: 10,
                entry: 10,
                traffic: 20,
                morning_routine: 45,
            },
            computed_at: now,
        };
        let weather = WeatherData {
            schedule_id: "s1".into(),
            forecast_date: date,
            temperature_c: -2.0,
            wind_speed_kmh: 18.0,
            precipitation_mm: 0.4,
            humidity_pct: 80.0,
            condition: "overcast".into(),
            warnings: vec!["Black ice possible".into()],
            fetched_at: now,
        };
        (schedule, plan, weather)
    }

    #[test]
    fn test_generate_full_summary() {
        let (schedule, plan, weather) = fixture();
        let opts = SummaryOptions {
            language: Language::En,
            include_safety_notes: true,
            ..SummaryOptions::default()
        };
        let out = generate_summary(&schedule, Some(&plan), Some(&weather), &opts).unwrap();

        assert!(out.content.contains("Shooting day summary"));
        assert!(out.content.contains("08:00"));
        assert!(out.content.contains("Steadicam"));
        assert!(out.content.contains("1st AD"));
        assert!(out.content.contains("Black ice possible"));
        // EXT shoot at -2°C
        assert!(out.content.contains("below 0"));
        assert!(out.html_content.contains("<h1>"));
        assert!(out.html_content.contains("Safety notes"));
        assert_eq!(out.timeline.len(), 5);
        assert!(out.weather_summary.unwrap().contains("overcast"));
    }

    #[test]
    fn test_option_gates() {
        let (schedule, plan, weather) = fixture();
        let opts = SummaryOptions {
            language: Language::En,
            include_route: false,
            include_contacts: false,
            include_equipment: false,
            include_safety_notes: false,
        };
        let out = generate_summary(&schedule, Some(&plan), Some(&weather), &opts).unwrap();
        assert!(!out.content.contains("Total travel time"));
        assert!(!out.content.contains("1st AD"));
        assert!(!out.content.contains("Steadicam"));
        assert!(!out.html_content.contains("Safety notes"));
    }

    #[test]
    fn test_idempotent_for_unchanged_inputs() {
        let (schedule, plan, weather) = fixture();
        let opts = SummaryOptions::default();
        let a = generate_summary(&schedule, Some(&plan), Some(&weather), &opts).unwrap();
        let b = generate_summary(&schedule, Some(&plan), Some(&weather), &opts).unwrap();
        assert_eq!(a.content, b.content);
        assert_eq!(a.html_content, b.html_content);
        assert_eq!(a.timeline, b.timeline);
        assert_eq!(a.warnings, b.warnings);
    }

    #[test]
    fn test_polish_templates() {
        let (schedule, plan, _) = fixture();
        let opts = SummaryOptions {
            language: Language::Pl,
            ..SummaryOptions::default()
        };
        let out = generate_summary(&schedule, Some(&plan), None, &opts).unwrap();
        assert!(out.content.contains("Plan dnia zdjęciowego"));
        assert!(out.content.contains("Pobudka"));
        assert!(out.weather_summary.is_none());
    }
}
