//! Plain-text summary content — template-fill from the per-language table,
//! with conditional blocks gated by the summary options.

use stillontime_core::types::{
    RoutePlan, SceneType, ScheduleData, TimelineEntry, WeatherData,
};

use crate::summary::SummaryOptions;
use crate::templates::Templates;

/// Render the plain-text body of the daily summary.
pub fn render_text(
    schedule: &ScheduleData,
    route_plan: Option<&RoutePlan>,
    weather: Option<&WeatherData>,
    timeline: &[TimelineEntry],
    warnings: &[String],
    options: &SummaryOptions,
    t: &Templates,
) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{} — {}\n",
        t.title,
        schedule.shooting_date.format("%Y-%m-%d")
    ));
    out.push_str(&format!("{}: {}\n", t.call_time, schedule.call_time));
    let scene = match schedule.scene_type {
        SceneType::Int => t.scene_int,
        SceneType::Ext => t.scene_ext,
    };
    out.push_str(&format!("{}: {} ({})\n", t.location, schedule.location, scene));
    if !schedule.scenes.is_empty() {
        out.push_str(&format!("{}: {}\n", t.scenes, schedule.scenes.join(", ")));
    }

    out.push_str(&format!("\n{}:\n", t.timeline));
    for entry in timeline {
        match &entry.location {
            Some(loc) => out.push_str(&format!(
                "  {} — {} ({})\n",
                entry.time.format("%H:%M"),
                entry.event,
                loc
            )),
            None => out.push_str(&format!(
                "  {} — {}\n",
                entry.time.format("%H:%M"),
                entry.event
            )),
        }
    }

    if options.include_route {
        if let Some(plan) = route_plan {
            out.push_str(&format!(
                "\n{}: {} {}\n",
                t.total_travel, plan.total_travel_minutes, t.minutes
            ));
            if !plan.route_segments.is_empty() {
                out.push_str(&format!("{}:\n", t.route));
                for seg in &plan.route_segments {
                    out.push_str(&format!(
                        "  - {} ({} {}, {})\n",
                        seg.description, seg.minutes, t.minutes, seg.mode
                    ));
                }
            }
        }
    }

    if let Some(w) = weather {
        out.push_str(&format!(
            "\n{}: {}, {:.0}°C, {:.0} km/h\n",
            t.weather, w.condition, w.temperature_c, w.wind_speed_kmh
        ));
    }

    if options.include_contacts && !schedule.contacts.is_empty() {
        out.push_str(&format!("\n{}:\n", t.contacts));
        for c in &schedule.contacts {
            out.push_str(&format!("  - {c}\n"));
        }
    }

    if options.include_equipment && !schedule.equipment.is_empty() {
        out.push_str(&format!("\n{}:\n", t.equipment));
        for e in &schedule.equipment {
            out.push_str(&format!("  - {e}\n"));
        }
    }

    if options.include_safety_notes {
        out.push_str(&format!("\n{}: {}\n", t.safety_notes, t.safety_notes_body));
    }

    if !warnings.is_empty() {
        out.push_str(&format!("\n{}:\n", t.warnings));
        for w in warnings {
            out.push_str(&format!("  ! {w}\n"));
        }
    }

    out
}
