//! Warnings collector — weather-supplied warning strings concatenated with
//! static threshold warnings (early wake-up, long travel, EXT temperature
//! extremes).

use chrono::Timelike;

use stillontime_core::types::{Language, RoutePlan, SceneType, ScheduleData, WeatherData};

use crate::templates::Templates;

const COLD_EXT_LIMIT_C: f64 = 0.0;
const HEAT_EXT_LIMIT_C: f64 = 30.0;
const LONG_TRAVEL_LIMIT_MIN: u32 = 120;

/// Gather all warnings for one shooting day, in a stable order:
/// weather-provided first, then threshold checks.
pub fn collect_warnings(
    schedule: &ScheduleData,
    route_plan: Option<&RoutePlan>,
    weather: Option<&WeatherData>,
    language: Language,
) -> Vec<String> {
    let t = Templates::for_language(language);
    let mut warnings = Vec::new();

    if let Some(w) = weather {
        warnings.extend(w.warnings.iter().cloned());
    }

    if let Some(plan) = route_plan {
        if plan.wake_up_time.hour() < 4 {
            warnings.push(t.early_wake_warning.to_string());
        }
        let travel = plan
            .total_travel_minutes
            .saturating_sub(plan.buffers.sum());
        if travel > LONG_TRAVEL_LIMIT_MIN {
            warnings.push(t.long_travel_warning.to_string());
        }
    }

    if schedule.scene_type == SceneType::Ext {
        if let Some(w) = weather {
            if w.temperature_c <= COLD_EXT_LIMIT_C {
                warnings.push(t.cold_ext_warning.to_string());
            } else if w.temperature_c >= HEAT_EXT_LIMIT_C {
                warnings.push(t.heat_ext_warning.to_string());
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use stillontime_core::types::TimeBuffers;

    fn schedule(scene_type: SceneType) -> ScheduleData {
        let now = Utc::now();
        ScheduleData {
            id: "s1".into(),
            shooting_date: NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
            call_time: "07:00".into(),
            location: "Forest clearing, Kampinos".into(),
            scene_type,
            scenes: vec![],
            equipment: vec![],
            contacts: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn plan(wake_hour: u32, travel: u32) -> RoutePlan {
        let date = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();
        let at = |h: u32| Utc.from_utc_datetime(&date.and_hms_opt(h, 0, 0).unwrap());
        let buffers = TimeBuffers {
            car_change: 0,
            parking: 0,
            entry: 0,
            traffic: 0,
            morning_routine: 0,
        };
        RoutePlan {
            schedule_id: "s1".into(),
            wake_up_time: at(wake_hour),
            departure_time: at(6),
            arrival_time: at(7),
            total_travel_minutes: travel,
            route_segments: vec![],
            buffers,
            computed_at: Utc::now(),
        }
    }

    fn weather(temperature_c: f64, warnings: Vec<String>) -> WeatherData {
        WeatherData {
            schedule_id: "s1".into(),
            forecast_date: NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
            temperature_c,
            wind_speed_kmh: 10.0,
            precipitation_mm: 0.0,
            humidity_pct: 60.0,
            condition: "clear".into(),
            warnings,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_weather_warnings_carried_through_first() {
        let w = weather(15.0, vec!["Gale warning issued".into()]);
        let warnings = collect_warnings(&schedule(SceneType::Int), None, Some(&w), Language::En);
        assert_eq!(warnings, vec!["Gale warning issued".to_string()]);
    }

    #[test]
    fn test_threshold_warnings() {
        let warnings = collect_warnings(
            &schedule(SceneType::Int),
            Some(&plan(3, 150)),
            None,
            Language::En,
        );
        assert!(warnings.iter().any(|w| w.contains("before 04:00")));
        assert!(warnings.iter().any(|w| w.contains("2 hours")));
    }

    #[test]
    fn test_ext_temperature_extremes() {
        let cold = collect_warnings(
            &schedule(SceneType::Ext),
            None,
            Some(&weather(-5.0, vec![])),
            Language::En,
        );
        assert!(cold.iter().any(|w| w.contains("below 0")));

        // interior scene — no temperature warning
        let int = collect_warnings(
            &schedule(SceneType::Int),
            None,
            Some(&weather(-5.0, vec![])),
            Language::En,
        );
        assert!(int.is_empty());

        let hot = collect_warnings(
            &schedule(SceneType::Ext),
            None,
            Some(&weather(33.0, vec![])),
            Language::Pl,
        );
        assert!(hot.iter().any(|w| w.contains("powyżej 30")));
    }
}
