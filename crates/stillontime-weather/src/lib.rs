//! # StillOnTime Weather
//!
//! Open-Meteo client plus the warning thresholds applied to each
//! shoot-day forecast. Forecasts are cached in the store and refreshed
//! by a background sweep while the shoot is upcoming.

pub mod client;
pub mod refresh;
pub mod warnings;

pub use client::{ForecastDay, WeatherClient};
pub use refresh::{refresh_stale, spawn_weather_loop};
pub use warnings::derive_warnings;
