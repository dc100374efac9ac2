//! API route handlers for the gateway.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use stillontime_core::types::{
    CalendarEvent, RoutePlan, RouteSegment, SceneType, ScheduleData, TimeBuffers, User,
    parse_call_time,
};
use stillontime_notify::NotifyContext;
use stillontime_notify::templates::{
    TEMPLATE_SCHEDULE_CREATED, TEMPLATE_SCHEDULE_UPDATED, TEMPLATE_WAKE_UP_REMINDER,
    TEMPLATE_WEATHER_ALERT,
};
use stillontime_schedule::summary::{SummaryOptions, generate_summary as build_summary};
use stillontime_schedule::time_calc::{
    OptimizeContext, TimeSchedule, calculate_time_schedule, generate_optimized_buffers,
    validate_time_schedule,
};

use super::error::ApiError;
use super::server::AppState;

type ApiResult = Result<Json<serde_json::Value>, ApiError>;

fn to_json<T: serde::Serialize>(value: &T) -> ApiResult {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| ApiError::internal(format!("Serialize: {e}")))
}

/// Health check endpoint (public).
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "stillontime-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// System information endpoint.
pub async fn system_info(State(state): State<Arc<AppState>>) -> ApiResult {
    let uptime = state.start_time.elapsed();
    let schedules = state.db.list_schedules()?.len();
    let users = state.db.list_users()?.len();
    Ok(Json(serde_json::json!({
        "service": "stillontime",
        "version": env!("CARGO_PKG_VERSION"),
        "platform": format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
        "uptime_secs": uptime.as_secs(),
        "schedules": schedules,
        "users": users,
        "weather_enabled": state.config.weather.enabled,
        "imap_enabled": state.config.imap.enabled,
    })))
}

// ─── Schedules ──────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub shooting_date: NaiveDate,
    pub call_time: String,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_scene_type")]
    pub scene_type: SceneType,
    #[serde(default)]
    pub scenes: Vec<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub contacts: Vec<String>,
}

fn default_scene_type() -> SceneType {
    SceneType::Int
}

pub async fn list_schedules(State(state): State<Arc<AppState>>) -> ApiResult {
    to_json(&state.db.list_schedules()?)
}

pub async fn create_schedule(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScheduleRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    parse_call_time(&body.call_time)
        .map_err(|e| ApiError::bad_request(e.to_string()).with_code("validation"))?;

    let now = Utc::now();
    let schedule = ScheduleData {
        id: Uuid::new_v4().to_string(),
        shooting_date: body.shooting_date,
        call_time: body.call_time.trim().to_string(),
        location: body.location,
        scene_type: body.scene_type,
        scenes: body.scenes,
        equipment: body.equipment,
        contacts: body.contacts,
        created_at: now,
        updated_at: now,
    };
    state.db.upsert_schedule(&schedule)?;
    tracing::info!("🎬 Schedule {} created ({})", schedule.id, schedule.shooting_date);

    let value = serde_json::to_value(&schedule)
        .map_err(|e| ApiError::internal(format!("Serialize: {e}")))?;
    Ok((StatusCode::CREATED, Json(value)))
}

fn load_schedule(state: &AppState, id: &str) -> Result<ScheduleData, ApiError> {
    state
        .db
        .get_schedule(id)?
        .ok_or_else(|| ApiError::not_found(format!("Schedule {id} not found")))
}

pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    to_json(&load_schedule(&state, &id)?)
}

pub async fn update_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ScheduleRequest>,
) -> ApiResult {
    parse_call_time(&body.call_time)
        .map_err(|e| ApiError::bad_request(e.to_string()).with_code("validation"))?;
    let existing = load_schedule(&state, &id)?;

    let schedule = ScheduleData {
        id: existing.id,
        shooting_date: body.shooting_date,
        call_time: body.call_time.trim().to_string(),
        location: body.location,
        scene_type: body.scene_type,
        scenes: body.scenes,
        equipment: body.equipment,
        contacts: body.contacts,
        created_at: existing.created_at,
        updated_at: Utc::now(),
    };
    state.db.upsert_schedule(&schedule)?;

    // Announce the change over every user's opted-in channels
    let plan = state.db.get_route_plan(&id)?;
    let ctx = NotifyContext {
        schedule: &schedule,
        route_plan: plan.as_ref(),
        weather: None,
    };
    for user in state.db.list_users()? {
        state
            .outbox
            .enqueue_for_user(&user, TEMPLATE_SCHEDULE_UPDATED, &ctx, None)?;
    }

    to_json(&schedule)
}

pub async fn delete_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    load_schedule(&state, &id)?;
    state.db.delete_schedule(&id)?;
    Ok(Json(serde_json::json!({"ok": true, "deleted": id})))
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

pub async fn schedules_in_range(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> ApiResult {
    if params.from > params.to {
        return Err(ApiError::bad_request("'from' must not be after 'to'"));
    }
    to_json(&state.db.schedules_in_range(params.from, params.to)?)
}

// ─── Route plan ──────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RoutePlanRequest {
    pub travel_minutes: u32,
    #[serde(default)]
    pub buffers: Option<TimeBuffers>,
    #[serde(default)]
    pub route_segments: Vec<RouteSegment>,
    /// When set, buffers are first adjusted for conditions.
    #[serde(default)]
    pub optimize: Option<OptimizeContext>,
}

pub async fn compute_route_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RoutePlanRequest>,
) -> ApiResult {
    let schedule = load_schedule(&state, &id)?;

    let mut buffers = body.buffers.unwrap_or_default();
    let mut reasoning = Vec::new();
    if let Some(ctx) = &body.optimize {
        let opt = generate_optimized_buffers(&buffers, ctx);
        buffers = opt.buffers;
        reasoning = opt.reasoning;
    }

    let times = calculate_time_schedule(
        schedule.shooting_date,
        &schedule.call_time,
        body.travel_minutes,
        &buffers,
    )?;
    let plan = RoutePlan {
        schedule_id: schedule.id.clone(),
        wake_up_time: times.wake_up_time,
        departure_time: times.departure_time,
        arrival_time: times.arrival_time,
        total_travel_minutes: times.total_travel_minutes,
        route_segments: body.route_segments,
        buffers,
        computed_at: Utc::now(),
    };
    state.db.upsert_route_plan(&plan)?;

    Ok(Json(serde_json::json!({
        "plan": plan,
        "warnings": times.warnings,
        "recommendations": times.recommendations,
        "buffer_reasoning": reasoning,
    })))
}

pub async fn get_route_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    load_schedule(&state, &id)?;
    let plan = state
        .db
        .get_route_plan(&id)?
        .ok_or_else(|| ApiError::not_found(format!("No route plan for schedule {id}")))?;
    to_json(&plan)
}

// ─── Summary ──────────────────────────────────────

pub async fn generate_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(options): Json<SummaryOptions>,
) -> ApiResult {
    let schedule = load_schedule(&state, &id)?;
    let plan = state.db.get_route_plan(&id)?;
    let weather = state.db.get_weather(&id)?;

    let out = build_summary(&schedule, plan.as_ref(), weather.as_ref(), &options)?;
    state.db.upsert_summary(&out.clone().into_summary())?;
    to_json(&out)
}

pub async fn get_summary(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    load_schedule(&state, &id)?;
    let summary = state
        .db
        .get_summary(&id)?
        .ok_or_else(|| ApiError::not_found(format!("No summary for schedule {id}")))?;
    to_json(&summary)
}

// ─── Weather ──────────────────────────────────────

pub async fn refresh_weather(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    let schedule = load_schedule(&state, &id)?;
    if schedule.location.is_empty() {
        return Err(ApiError::bad_request(format!(
            "Schedule {id} has no location to geocode"
        )));
    }
    let weather = state.weather.fetch_for_schedule(&schedule).await?;
    state.db.upsert_weather(&weather)?;
    to_json(&weather)
}

pub async fn get_weather(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    load_schedule(&state, &id)?;
    let weather = state
        .db
        .get_weather(&id)?
        .ok_or_else(|| ApiError::not_found(format!("No weather data for schedule {id}")))?;
    to_json(&weather)
}

// ─── Time calculation ──────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TimeCalcRequest {
    pub shooting_date: NaiveDate,
    pub call_time: String,
    pub travel_minutes: u32,
    #[serde(default)]
    pub buffers: Option<TimeBuffers>,
}

pub async fn time_calculate(Json(body): Json<TimeCalcRequest>) -> ApiResult {
    let buffers = body.buffers.unwrap_or_default();
    let schedule = calculate_time_schedule(
        body.shooting_date,
        &body.call_time,
        body.travel_minutes,
        &buffers,
    )?;
    to_json(&schedule)
}

pub async fn time_validate(Json(schedule): Json<TimeSchedule>) -> ApiResult {
    to_json(&validate_time_schedule(&schedule))
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    #[serde(default)]
    pub buffers: Option<TimeBuffers>,
    pub context: OptimizeContext,
}

pub async fn time_optimize_buffers(Json(body): Json<OptimizeRequest>) -> ApiResult {
    let buffers = body.buffers.unwrap_or_default();
    to_json(&generate_optimized_buffers(&buffers, &body.context))
}

// ─── Notifications ──────────────────────────────────────

pub async fn list_notifications(State(state): State<Arc<AppState>>) -> ApiResult {
    to_json(&state.db.recent_notifications(50)?)
}

#[derive(Debug, Deserialize)]
pub struct NotificationRequest {
    pub user_id: String,
    pub schedule_id: String,
    pub template: String,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
}

const KNOWN_TEMPLATES: &[&str] = &[
    TEMPLATE_SCHEDULE_CREATED,
    TEMPLATE_SCHEDULE_UPDATED,
    TEMPLATE_WAKE_UP_REMINDER,
    TEMPLATE_WEATHER_ALERT,
];

pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NotificationRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    if !KNOWN_TEMPLATES.contains(&body.template.as_str()) {
        return Err(ApiError::bad_request(format!(
            "Unknown template '{}'",
            body.template
        )));
    }
    let user = state
        .db
        .get_user(&body.user_id)?
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", body.user_id)))?;
    let schedule = load_schedule(&state, &body.schedule_id)?;
    let plan = state.db.get_route_plan(&schedule.id)?;
    let weather = state.db.get_weather(&schedule.id)?;

    let ctx = NotifyContext {
        schedule: &schedule,
        route_plan: plan.as_ref(),
        weather: weather.as_ref(),
    };
    let ids = state
        .outbox
        .enqueue_for_user(&user, &body.template, &ctx, body.scheduled_for)
        .map_err(|e| {
            // render failures are caller errors, everything else is ours
            if e.starts_with("Render") {
                ApiError::bad_request(e)
            } else {
                ApiError::internal(e)
            }
        })?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"enqueued": ids})),
    ))
}

pub async fn cancel_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    if state.db.cancel_notification(&id)? {
        return Ok(Json(serde_json::json!({"ok": true, "cancelled": id})));
    }
    match state.db.get_notification(&id)? {
        Some(n) => Err(ApiError::conflict(format!(
            "Notification {id} is already {}",
            n.status.as_str()
        ))),
        None => Err(ApiError::not_found(format!("Notification {id} not found"))),
    }
}

pub async fn notification_stats(State(state): State<Arc<AppState>>) -> ApiResult {
    let counts = state.db.notification_status_counts()?;
    let mut obj = serde_json::Map::new();
    for (status, count) in counts {
        obj.insert(status, serde_json::json!(count));
    }
    Ok(Json(serde_json::Value::Object(obj)))
}

// ─── Calendar events ──────────────────────────────────────

/// Length of a standard shooting day, call to wrap.
const SHOOT_DAY_HOURS: i64 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct CalendarEventRequest {
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub title: Option<String>,
}

pub async fn upsert_calendar_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CalendarEventRequest>,
) -> ApiResult {
    let schedule = load_schedule(&state, &id)?;
    let starts_at = schedule.call_datetime()?;
    let event = CalendarEvent {
        schedule_id: schedule.id.clone(),
        external_id: body.external_id,
        title: body.title.unwrap_or_else(|| {
            format!("Shooting day — {}", schedule.location)
        }),
        starts_at,
        ends_at: starts_at + Duration::hours(SHOOT_DAY_HOURS),
        synced_at: Utc::now(),
    };
    state.db.upsert_calendar_event(&event)?;
    to_json(&event)
}

pub async fn list_calendar_events(State(state): State<Arc<AppState>>) -> ApiResult {
    to_json(&state.db.list_calendar_events()?)
}

// ─── Users ──────────────────────────────────────

pub async fn list_users(State(state): State<Arc<AppState>>) -> ApiResult {
    to_json(&state.db.list_users()?)
}

pub async fn upsert_user(
    State(state): State<Arc<AppState>>,
    Json(mut user): Json<User>,
) -> ApiResult {
    if user.id.is_empty() {
        user.id = Uuid::new_v4().to_string();
    }
    if user.email.is_empty() && user.phone.is_empty() && user.push_token.is_empty() {
        return Err(ApiError::bad_request(
            "User needs at least one contact point (email, phone, or push token)",
        ));
    }
    state.db.upsert_user(&user)?;
    to_json(&user)
}
