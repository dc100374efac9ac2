//! Warning thresholds applied to a shoot-day forecast.

use crate::client::ForecastDay;

/// Frost risk at or below this temperature.
pub const FROST_LIMIT_C: f64 = 0.0;
/// Heat warning at or above this temperature.
pub const HEAT_LIMIT_C: f64 = 30.0;
/// Strong wind at or above this speed.
pub const WIND_LIMIT_KMH: f64 = 40.0;
/// Heavy precipitation at or above this daily total.
pub const PRECIPITATION_LIMIT_MM: f64 = 10.0;
/// Fog likely at or above this relative humidity.
pub const FOG_HUMIDITY_PCT: f64 = 95.0;

/// Derive the warning list for one forecast day.
///
/// Every threshold is checked independently, so a cold, windy, wet day
/// yields all three warnings.
pub fn derive_warnings(f: &ForecastDay) -> Vec<String> {
    let mut out = Vec::new();
    if f.temperature_c <= FROST_LIMIT_C {
        out.push(format!(
            "Frost risk: {:.0}°C — allow extra time for de-icing",
            f.temperature_c
        ));
    }
    if f.temperature_c >= HEAT_LIMIT_C {
        out.push(format!(
            "Heat warning: {:.0}°C — plan shade and water on set",
            f.temperature_c
        ));
    }
    if f.wind_speed_kmh >= WIND_LIMIT_KMH {
        out.push(format!(
            "Strong wind: {:.0} km/h — secure rigs and lightweight set pieces",
            f.wind_speed_kmh
        ));
    }
    if f.precipitation_mm >= PRECIPITATION_LIMIT_MM {
        out.push(format!(
            "Heavy precipitation: {:.1} mm expected",
            f.precipitation_mm
        ));
    }
    if f.humidity_pct >= FOG_HUMIDITY_PCT {
        out.push("Fog likely — reduced visibility on the road".to_string());
    }
    out
}

/// Whether the forecast indicates fog (used by the buffer optimizer).
pub fn indicates_fog(f: &ForecastDay) -> bool {
    f.humidity_pct >= FOG_HUMIDITY_PCT
}

/// Whether the forecast counts as bad weather for buffer purposes.
pub fn indicates_bad_weather(f: &ForecastDay) -> bool {
    f.temperature_c <= FROST_LIMIT_C
        || f.wind_speed_kmh >= WIND_LIMIT_KMH
        || f.precipitation_mm >= PRECIPITATION_LIMIT_MM
}
