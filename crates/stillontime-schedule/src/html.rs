//! HTML summary content — the same template-fill as the text generator,
//! wrapped in minimal markup suitable for an email body.

use stillontime_core::types::{
    RoutePlan, SceneType, ScheduleData, TimelineEntry, WeatherData,
};

use crate::summary::SummaryOptions;
use crate::templates::Templates;

/// Escape the five HTML-significant characters.
fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Render the HTML body of the daily summary.
pub fn render_html(
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
        "<h1>{} — {}</h1>\n",
        escape(t.title),
        schedule.shooting_date.format("%Y-%m-%d")
    ));
    let scene = match schedule.scene_type {
        SceneType::Int => t.scene_int,
        SceneType::Ext => t.scene_ext,
    };
    out.push_str(&format!(
        "<p><strong>{}:</strong> {}<br><strong>{}:</strong> {} ({})</p>\n",
        escape(t.call_time),
        escape(&schedule.call_time),
        escape(t.location),
        escape(&schedule.location),
        escape(scene)
    ));
    if !schedule.scenes.is_empty() {
        out.push_str(&format!(
            "<p><strong>{}:</strong> {}</p>\n",
            escape(t.scenes),
            escape(&schedule.scenes.join(", "))
        ));
    }

    out.push_str(&format!("<h2>{}</h2>\n<ul>\n", escape(t.timeline)));
    for entry in timeline {
        let suffix = entry
            .location
            .as_deref()
            .map(|loc| format!(" ({})", escape(loc)))
            .unwrap_or_default();
        out.push_str(&format!(
            "<li><strong>{}</strong> — {}{}</li>\n",
            entry.time.format("%H:%M"),
            escape(&entry.event),
            suffix
        ));
    }
    out.push_str("</ul>\n");

    if options.include_route {
        if let Some(plan) = route_plan {
            out.push_str(&format!(
                "<p><strong>{}:</strong> {} {}</p>\n",
                escape(t.total_travel),
                plan.total_travel_minutes,
                escape(t.minutes)
            ));
            if !plan.route_segments.is_empty() {
                out.push_str(&format!("<h2>{}</h2>\n<ol>\n", escape(t.route)));
                for seg in &plan.route_segments {
                    out.push_str(&format!(
                        "<li>{} ({} {}, {})</li>\n",
                        escape(&seg.description),
                        seg.minutes,
                        escape(t.minutes),
                        escape(&seg.mode)
                    ));
                }
                out.push_str("</ol>\n");
            }
        }
    }

    if let Some(w) = weather {
        out.push_str(&format!(
            "<p><strong>{}:</strong> {}, {:.0}°C, {:.0} km/h</p>\n",
            escape(t.weather),
            escape(&w.condition),
            w.temperature_c,
            w.wind_speed_kmh
        ));
    }

    if options.include_contacts && !schedule.contacts.is_empty() {
        out.push_str(&format!("<h2>{}</h2>\n<ul>\n", escape(t.contacts)));
        for c in &schedule.contacts {
            out.push_str(&format!("<li>{}</li>\n", escape(c)));
        }
        out.push_str("</ul>\n");
    }

    if options.include_equipment && !schedule.equipment.is_empty() {
        out.push_str(&format!("<h2>{}</h2>\n<ul>\n", escape(t.equipment)));
        for e in &schedule.equipment {
            out.push_str(&format!("<li>{}</li>\n", escape(e)));
        }
        out.push_str("</ul>\n");
    }

    if options.include_safety_notes {
        out.push_str(&format!(
            "<p><strong>{}:</strong> {}</p>\n",
            escape(t.safety_notes),
            escape(t.safety_notes_body)
        ));
    }

    if !warnings.is_empty() {
        out.push_str(&format!("<h2>{}</h2>\n<ul>\n", escape(t.warnings)));
        for w in warnings {
            out.push_str(&format!("<li>⚠ {}</li>\n", escape(w)));
        }
        out.push_str("</ul>\n");
    }

    out
}
