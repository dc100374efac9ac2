//! HTTP server implementation using Axum.

use axum::{
    Router,
    extract::{ConnectInfo, State},
    routing::{get, post, put},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use stillontime_core::config::StillOnTimeConfig;
use stillontime_ingest::Ingestor;
use stillontime_notify::Outbox;
use stillontime_store::ScheduleDb;
use stillontime_weather::WeatherClient;

use crate::error::{ApiError, ErrorParts, envelope};

/// Shared state for the gateway server.
pub struct AppState {
    pub config: Arc<StillOnTimeConfig>,
    pub db: Arc<ScheduleDb>,
    pub outbox: Arc<Outbox>,
    pub weather: Arc<WeatherClient>,
    pub start_time: std::time::Instant,
    pub rate_limiter: RateLimiter,
}

/// Fixed-window per-client request counter.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, (i64, u32)>>,
    limit: u32,
}

impl RateLimiter {
    pub fn new(limit: u32) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            limit,
        }
    }

    /// Count one request for `client`. Returns false once the client is
    /// over the per-minute budget. A limit of 0 disables the check.
    pub fn allow(&self, client: &str, now_epoch_secs: i64) -> bool {
        if self.limit == 0 {
            return true;
        }
        let window = now_epoch_secs / 60;
        let mut map = self.windows.lock().unwrap();
        // drop clients whose window has lapsed so the map stays bounded
        map.retain(|_, (w, _)| *w == window);
        let entry = map.entry(client.to_string()).or_insert((window, 0));
        entry.1 += 1;
        entry.1 <= self.limit
    }
}

/// API key auth middleware — validates X-Api-Key header or ?key= query.
async fn require_api_key(
    State(state): State<Arc<AppState>>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    use axum::response::IntoResponse;

    // If no key configured, allow all
    let expected = &state.config.gateway.api_key;
    if expected.is_empty() {
        return next.run(req).await;
    }

    let from_header = req
        .headers()
        .get("X-Api-Key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if from_header == expected {
        return next.run(req).await;
    }

    if let Some(query) = req.uri().query() {
        for pair in query.split('&') {
            if let Some(key) = pair.strip_prefix("key=") {
                if key == expected {
                    return next.run(req).await;
                }
            }
        }
    }

    ApiError::unauthorized("Invalid or missing API key").into_response()
}

/// Per-client rate limit middleware (fixed one-minute windows).
async fn rate_limit(
    State(state): State<Arc<AppState>>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    use axum::response::IntoResponse;

    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !state
        .rate_limiter
        .allow(&client, chrono::Utc::now().timestamp())
    {
        return ApiError::rate_limited(format!(
            "Rate limit of {}/min exceeded",
            state.config.gateway.rate_limit_per_minute
        ))
        .into_response();
    }
    next.run(req).await
}

/// Outermost middleware: rewrite error bodies so the envelope carries
/// the request path.
async fn error_envelope(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    use axum::response::IntoResponse;

    let path = req.uri().path().to_string();
    let resp = next.run(req).await;
    if let Some(parts) = resp.extensions().get::<ErrorParts>().cloned() {
        let status = resp.status();
        return (status, axum::Json(envelope(status, &parts, &path))).into_response();
    }
    resp
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    build_router_from_arc(Arc::new(state))
}

pub fn build_router_from_arc(shared: Arc<AppState>) -> Router {
    // Protected routes — API key + rate limit
    let protected = Router::new()
        .route("/api/v1/info", get(super::routes::system_info))
        // Schedules
        .route("/api/v1/schedules", get(super::routes::list_schedules))
        .route("/api/v1/schedules", post(super::routes::create_schedule))
        .route("/api/v1/schedules/range", get(super::routes::schedules_in_range))
        .route("/api/v1/schedules/{id}", get(super::routes::get_schedule))
        .route("/api/v1/schedules/{id}", put(super::routes::update_schedule))
        .route(
            "/api/v1/schedules/{id}",
            axum::routing::delete(super::routes::delete_schedule),
        )
        // Route plan
        .route(
            "/api/v1/schedules/{id}/route-plan",
            post(super::routes::compute_route_plan),
        )
        .route(
            "/api/v1/schedules/{id}/route-plan",
            get(super::routes::get_route_plan),
        )
        // Summary
        .route(
            "/api/v1/schedules/{id}/summary",
            post(super::routes::generate_summary),
        )
        .route(
            "/api/v1/schedules/{id}/summary",
            get(super::routes::get_summary),
        )
        // Weather
        .route(
            "/api/v1/schedules/{id}/weather/refresh",
            post(super::routes::refresh_weather),
        )
        .route(
            "/api/v1/schedules/{id}/weather",
            get(super::routes::get_weather),
        )
        // Calendar
        .route(
            "/api/v1/schedules/{id}/calendar-event",
            put(super::routes::upsert_calendar_event),
        )
        .route(
            "/api/v1/calendar-events",
            get(super::routes::list_calendar_events),
        )
        // Time calculation
        .route("/api/v1/time/calculate", post(super::routes::time_calculate))
        .route("/api/v1/time/validate", post(super::routes::time_validate))
        .route(
            "/api/v1/time/optimize-buffers",
            post(super::routes::time_optimize_buffers),
        )
        // Notifications
        .route(
            "/api/v1/notifications",
            get(super::routes::list_notifications),
        )
        .route(
            "/api/v1/notifications",
            post(super::routes::create_notification),
        )
        .route(
            "/api/v1/notifications/{id}/cancel",
            post(super::routes::cancel_notification),
        )
        .route(
            "/api/v1/notifications/stats",
            get(super::routes::notification_stats),
        )
        // Users
        .route("/api/v1/users", get(super::routes::list_users))
        .route("/api/v1/users", post(super::routes::upsert_user))
        .route_layer(axum::middleware::from_fn_with_state(
            shared.clone(),
            rate_limit,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            shared.clone(),
            require_api_key,
        ));

    // Public routes — no auth
    let public = Router::new().route("/health", get(super::routes::health_check));

    protected
        .merge(public)
        .layer(axum::middleware::from_fn(error_envelope))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(Any)
                .allow_origin(Any)
                .max_age(std::time::Duration::from_secs(3600)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Start the HTTP server plus the configured background loops.
pub async fn start(config: StillOnTimeConfig) -> anyhow::Result<()> {
    let config = Arc::new(config);

    let db_path = config.database.resolved_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let db = match ScheduleDb::open(&db_path) {
        Ok(db) => {
            tracing::info!("💾 Database ready: {}", db_path.display());
            db
        }
        Err(e) => {
            tracing::error!("❌ Failed to open database: {e}");
            ScheduleDb::open_in_memory().map_err(anyhow::Error::msg)?
        }
    };
    let db = Arc::new(db);

    let outbox = Arc::new(Outbox::new(db.clone(), config.clone()));
    let weather = Arc::new(WeatherClient::new(&config.weather));

    // Outbox sweeps always run; delivery failures stay in the outbox.
    let outbox_for_sweep = outbox.clone();
    tokio::spawn(async move {
        stillontime_notify::spawn_outbox_sweeps(outbox_for_sweep).await;
    });

    if config.weather.enabled {
        let db_for_weather = db.clone();
        let client = Arc::new(WeatherClient::new(&config.weather));
        let every = config.weather.refresh_interval_secs;
        tokio::spawn(async move {
            stillontime_weather::refresh::spawn_weather_loop(db_for_weather, client, every).await;
        });
    }

    if config.imap.enabled {
        let ingestor = Arc::new(Ingestor::new(db.clone(), config.clone(), outbox.clone()));
        tokio::spawn(async move {
            stillontime_ingest::spawn_ingest_loop(ingestor).await;
        });
    }

    let state = AppState {
        rate_limiter: RateLimiter::new(config.gateway.rate_limit_per_minute),
        config: config.clone(),
        db,
        outbox,
        weather,
        start_time: std::time::Instant::now(),
    };
    let app = build_router(state);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    tracing::info!("🚀 Gateway listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
