//! Background forecast refresh for upcoming shoots.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use stillontime_core::Result;
use stillontime_store::ScheduleDb;

use crate::client::WeatherClient;

/// Open-Meteo forecasts reach roughly this far ahead.
const FORECAST_HORIZON_DAYS: i64 = 16;

/// Fetch forecasts for every upcoming schedule whose weather record is
/// missing or stale. Returns how many records were refreshed.
pub async fn refresh_stale(
    db: &ScheduleDb,
    client: &WeatherClient,
    now: DateTime<Utc>,
) -> Result<usize> {
    let today = now.date_naive();
    let horizon = today + Duration::days(FORECAST_HORIZON_DAYS);
    let upcoming = db.schedules_in_range(today, horizon)?;

    let mut refreshed = 0;
    for schedule in &upcoming {
        if schedule.location.is_empty() {
            tracing::debug!("Schedule {} has no location, skipping forecast", schedule.id);
            continue;
        }
        let needs_fetch = match db.get_weather(&schedule.id)? {
            Some(existing) => existing.is_stale(now),
            None => true,
        };
        if !needs_fetch {
            continue;
        }
        match client.fetch_for_schedule(schedule).await {
            Ok(weather) => {
                db.upsert_weather(&weather)?;
                refreshed += 1;
            }
            Err(e) => tracing::warn!("Forecast for schedule {} failed: {e}", schedule.id),
        }
    }
    Ok(refreshed)
}

/// Spawn the forecast refresh loop as a background tokio task.
pub async fn spawn_weather_loop(db: Arc<ScheduleDb>, client: Arc<WeatherClient>, every_secs: u64) {
    tracing::info!("🌤️ Weather refresh started (every {every_secs}s)");

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(every_secs));
    loop {
        interval.tick().await;
        match refresh_stale(&db, &client, Utc::now()).await {
            Ok(n) if n > 0 => tracing::info!("🌤️ Refreshed {n} forecast(s)"),
            Ok(_) => {}
            Err(e) => tracing::error!("Weather refresh: {e}"),
        }
    }
}
