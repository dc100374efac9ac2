//! SQLite-backed persistence for all StillOnTime entities.
//! One connection behind a mutex, WAL mode, schema created on open.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;

use stillontime_core::types::{
    CalendarEvent, Language, Notification, NotificationChannel, NotificationStatus,
    ProcessedEmail, RoutePlan, SceneType, ScheduleData, Summary, User, WeatherData,
};

/// The StillOnTime database — one repository per entity, one backing store.
pub struct ScheduleDb {
    conn: Mutex<Connection>,
}

fn lang_str(l: Language) -> &'static str {
    match l {
        Language::Pl => "pl",
        Language::En => "en",
    }
}

fn parse_lang(s: &str) -> Language {
    match s {
        "en" => Language::En,
        _ => Language::Pl,
    }
}

fn scene_str(s: SceneType) -> &'static str {
    match s {
        SceneType::Int => "int",
        SceneType::Ext => "ext",
    }
}

fn parse_scene(s: &str) -> SceneType {
    match s {
        "ext" => SceneType::Ext,
        _ => SceneType::Int,
    }
}

// Corrupt stored timestamps surface as row errors, never as invented values.
fn parse_dt(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_opt_dt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc))
}

fn parse_date(s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

impl ScheduleDb {
    /// Open or create the database.
    pub fn open(path: &Path) -> Result<Self, String> {
        let conn = Connection::open(path).map_err(|e| format!("DB open: {e}"))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// In-memory database for tests and fallback.
    pub fn open_in_memory() -> Result<Self, String> {
        Self::open(Path::new(":memory:"))
    }

    /// Run migrations to create tables.
    fn migrate(&self) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        conn.execute_batch(
            "
            -- Crew members receiving notifications
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL DEFAULT '',
                phone TEXT NOT NULL DEFAULT '',
                push_token TEXT NOT NULL DEFAULT '',
                language TEXT NOT NULL DEFAULT 'pl',
                channels_json TEXT NOT NULL DEFAULT '[]'
            );

            -- One shooting day per row
            CREATE TABLE IF NOT EXISTS schedules (
                id TEXT PRIMARY KEY,
                shooting_date TEXT NOT NULL,
                call_time TEXT NOT NULL,
                location TEXT NOT NULL DEFAULT '',
                scene_type TEXT NOT NULL DEFAULT 'int',
                scenes_json TEXT NOT NULL DEFAULT '[]',
                equipment_json TEXT NOT NULL DEFAULT '[]',
                contacts_json TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Exactly one route plan per schedule (UNIQUE key, not app logic)
            CREATE TABLE IF NOT EXISTS route_plans (
                schedule_id TEXT PRIMARY KEY,
                wake_up_time TEXT NOT NULL,
                departure_time TEXT NOT NULL,
                arrival_time TEXT NOT NULL,
                total_travel_minutes INTEGER NOT NULL,
                segments_json TEXT NOT NULL DEFAULT '[]',
                buffers_json TEXT NOT NULL DEFAULT '{}',
                computed_at TEXT NOT NULL,
                FOREIGN KEY (schedule_id) REFERENCES schedules(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS weather_data (
                schedule_id TEXT PRIMARY KEY,
                forecast_date TEXT NOT NULL,
                temperature_c REAL NOT NULL,
                wind_speed_kmh REAL NOT NULL,
                precipitation_mm REAL NOT NULL,
                humidity_pct REAL NOT NULL,
                condition TEXT NOT NULL DEFAULT '',
                warnings_json TEXT NOT NULL DEFAULT '[]',
                fetched_at TEXT NOT NULL,
                FOREIGN KEY (schedule_id) REFERENCES schedules(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS summaries (
                schedule_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                html_content TEXT NOT NULL,
                timeline_json TEXT NOT NULL DEFAULT '[]',
                warnings_json TEXT NOT NULL DEFAULT '[]',
                language TEXT NOT NULL DEFAULT 'pl',
                generated_at TEXT NOT NULL,
                FOREIGN KEY (schedule_id) REFERENCES schedules(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS calendar_events (
                schedule_id TEXT PRIMARY KEY,
                external_id TEXT NOT NULL DEFAULT '',
                title TEXT NOT NULL,
                starts_at TEXT NOT NULL,
                ends_at TEXT NOT NULL,
                synced_at TEXT NOT NULL,
                FOREIGN KEY (schedule_id) REFERENCES schedules(id) ON DELETE CASCADE
            );

            -- Notification outbox: rows are claimed by flipping
            -- pending -> sending, so overlapping sweeps never double-send
            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                channel TEXT NOT NULL,
                template TEXT NOT NULL,
                subject TEXT NOT NULL DEFAULT '',
                body TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'pending',
                retry_count INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                scheduled_for TEXT,
                created_at TEXT NOT NULL,
                sent_at TEXT,
                claimed_at TEXT
            );

            -- Ingested call-sheet emails; dedup on message_id OR pdf_hash
            CREATE TABLE IF NOT EXISTS processed_emails (
                message_id TEXT PRIMARY KEY,
                pdf_hash TEXT NOT NULL,
                subject TEXT NOT NULL DEFAULT '',
                schedule_id TEXT,
                processed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_schedules_date ON schedules(shooting_date);
            CREATE INDEX IF NOT EXISTS idx_notifications_status ON notifications(status);
            CREATE INDEX IF NOT EXISTS idx_processed_pdf_hash ON processed_emails(pdf_hash);
            ",
        )
        .map_err(|e| format!("Migration: {e}"))?;
        // Databases created before the claimed_at column gain it here
        conn.execute("ALTER TABLE notifications ADD COLUMN claimed_at TEXT", [])
            .ok();
        Ok(())
    }

    // ─── Users ──────────────────────────────────────

    /// Create or update a user.
    pub fn upsert_user(&self, user: &User) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let channels_json = serde_json::to_string(&user.channels).unwrap_or_else(|_| "[]".into());
        conn.execute(
            "INSERT INTO users (id, name, email, phone, push_token, language, channels_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
               name=?2, email=?3, phone=?4, push_token=?5, language=?6, channels_json=?7",
            params![
                user.id,
                user.name,
                user.email,
                user.phone,
                user.push_token,
                lang_str(user.language),
                channels_json,
            ],
        )
        .map_err(|e| format!("Upsert user: {e}"))?;
        Ok(())
    }

    fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
        let language: String = row.get(5)?;
        let channels_json: String = row.get(6)?;
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            push_token: row.get(4)?,
            language: parse_lang(&language),
            channels: serde_json::from_str(&channels_json).unwrap_or_default(),
        })
    }

    /// Get a single user.
    pub fn get_user(&self, id: &str) -> Result<Option<User>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        match conn.query_row(
            "SELECT id, name, email, phone, push_token, language, channels_json FROM users WHERE id=?1",
            params![id],
            Self::row_to_user,
        ) {
            Ok(u) => Ok(Some(u)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(format!("Get user: {e}")),
        }
    }

    /// List all users.
    pub fn list_users(&self) -> Result<Vec<User>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let mut stmt = conn
            .prepare("SELECT id, name, email, phone, push_token, language, channels_json FROM users ORDER BY name")
            .map_err(|e| format!("Prepare: {e}"))?;
        let users = stmt
            .query_map([], Self::row_to_user)
            .map_err(|e| format!("Query: {e}"))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(users)
    }

    /// Delete a user.
    pub fn delete_user(&self, id: &str) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        conn.execute("DELETE FROM users WHERE id=?1", params![id])
            .map_err(|e| format!("Delete user: {e}"))?;
        Ok(())
    }

    // ─── Schedules ──────────────────────────────────────

    /// Insert or replace a schedule.
    pub fn upsert_schedule(&self, s: &ScheduleData) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        conn.execute(
            "INSERT INTO schedules (id, shooting_date, call_time, location, scene_type,
               scenes_json, equipment_json, contacts_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
               shooting_date=?2, call_time=?3, location=?4, scene_type=?5,
               scenes_json=?6, equipment_json=?7, contacts_json=?8, updated_at=?10",
            params![
                s.id,
                s.shooting_date.format("%Y-%m-%d").to_string(),
                s.call_time,
                s.location,
                scene_str(s.scene_type),
                serde_json::to_string(&s.scenes).unwrap_or_else(|_| "[]".into()),
                serde_json::to_string(&s.equipment).unwrap_or_else(|_| "[]".into()),
                serde_json::to_string(&s.contacts).unwrap_or_else(|_| "[]".into()),
                s.created_at.to_rfc3339(),
                s.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| format!("Upsert schedule: {e}"))?;
        Ok(())
    }

    fn row_to_schedule(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduleData> {
        let date: String = row.get(1)?;
        let scene: String = row.get(4)?;
        let scenes_json: String = row.get(5)?;
        let equipment_json: String = row.get(6)?;
        let contacts_json: String = row.get(7)?;
        let created: String = row.get(8)?;
        let updated: String = row.get(9)?;
        Ok(ScheduleData {
            id: row.get(0)?,
            shooting_date: parse_date(&date)?,
            call_time: row.get(2)?,
            location: row.get(3)?,
            scene_type: parse_scene(&scene),
            scenes: serde_json::from_str(&scenes_json).unwrap_or_default(),
            equipment: serde_json::from_str(&equipment_json).unwrap_or_default(),
            contacts: serde_json::from_str(&contacts_json).unwrap_or_default(),
            created_at: parse_dt(&created)?,
            updated_at: parse_dt(&updated)?,
        })
    }

    const SCHEDULE_COLS: &'static str = "id, shooting_date, call_time, location, scene_type, \
         scenes_json, equipment_json, contacts_json, created_at, updated_at";

    /// Get a single schedule.
    pub fn get_schedule(&self, id: &str) -> Result<Option<ScheduleData>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let sql = format!("SELECT {} FROM schedules WHERE id=?1", Self::SCHEDULE_COLS);
        match conn.query_row(&sql, params![id], Self::row_to_schedule) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(format!("Get schedule: {e}")),
        }
    }

    /// List all schedules, newest shooting date first.
    pub fn list_schedules(&self) -> Result<Vec<ScheduleData>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let sql = format!(
            "SELECT {} FROM schedules ORDER BY shooting_date DESC",
            Self::SCHEDULE_COLS
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| format!("Prepare: {e}"))?;
        let rows = stmt
            .query_map([], Self::row_to_schedule)
            .map_err(|e| format!("Query: {e}"))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Schedules with a shooting date inside [from, to], ascending.
    pub fn schedules_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ScheduleData>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let sql = format!(
            "SELECT {} FROM schedules WHERE shooting_date >= ?1 AND shooting_date <= ?2 ORDER BY shooting_date",
            Self::SCHEDULE_COLS
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| format!("Prepare: {e}"))?;
        let rows = stmt
            .query_map(
                params![
                    from.format("%Y-%m-%d").to_string(),
                    to.format("%Y-%m-%d").to_string()
                ],
                Self::row_to_schedule,
            )
            .map_err(|e| format!("Query: {e}"))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Delete a schedule and its dependent rows.
    pub fn delete_schedule(&self, id: &str) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        // CASCADE needs foreign_keys pragma; delete children explicitly instead
        for table in [
            "route_plans",
            "weather_data",
            "summaries",
            "calendar_events",
        ] {
            conn.execute(
                &format!("DELETE FROM {table} WHERE schedule_id=?1"),
                params![id],
            )
            .map_err(|e| format!("Delete {table}: {e}"))?;
        }
        conn.execute("DELETE FROM schedules WHERE id=?1", params![id])
            .map_err(|e| format!("Delete schedule: {e}"))?;
        Ok(())
    }

    // ─── Route plans ──────────────────────────────────────

    /// Upsert the route plan for a schedule (one per schedule).
    pub fn upsert_route_plan(&self, plan: &RoutePlan) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        conn.execute(
            "INSERT INTO route_plans (schedule_id, wake_up_time, departure_time, arrival_time,
               total_travel_minutes, segments_json, buffers_json, computed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(schedule_id) DO UPDATE SET
               wake_up_time=?2, departure_time=?3, arrival_time=?4,
               total_travel_minutes=?5, segments_json=?6, buffers_json=?7, computed_at=?8",
            params![
                plan.schedule_id,
                plan.wake_up_time.to_rfc3339(),
                plan.departure_time.to_rfc3339(),
                plan.arrival_time.to_rfc3339(),
                plan.total_travel_minutes,
                serde_json::to_string(&plan.route_segments).unwrap_or_else(|_| "[]".into()),
                serde_json::to_string(&plan.buffers).unwrap_or_else(|_| "{}".into()),
                plan.computed_at.to_rfc3339(),
            ],
        )
        .map_err(|e| format!("Upsert route plan: {e}"))?;
        Ok(())
    }

    fn row_to_route_plan(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoutePlan> {
        let wake: String = row.get(1)?;
        let departure: String = row.get(2)?;
        let arrival: String = row.get(3)?;
        let segments_json: String = row.get(5)?;
        let buffers_json: String = row.get(6)?;
        let computed: String = row.get(7)?;
        Ok(RoutePlan {
            schedule_id: row.get(0)?,
            wake_up_time: parse_dt(&wake)?,
            departure_time: parse_dt(&departure)?,
            arrival_time: parse_dt(&arrival)?,
            total_travel_minutes: row.get(4)?,
            route_segments: serde_json::from_str(&segments_json).unwrap_or_default(),
            buffers: serde_json::from_str(&buffers_json).unwrap_or_default(),
            computed_at: parse_dt(&computed)?,
        })
    }

    const ROUTE_PLAN_COLS: &'static str = "schedule_id, wake_up_time, departure_time, \
         arrival_time, total_travel_minutes, segments_json, buffers_json, computed_at";

    /// Get the route plan for a schedule.
    pub fn get_route_plan(&self, schedule_id: &str) -> Result<Option<RoutePlan>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let sql = format!(
            "SELECT {} FROM route_plans WHERE schedule_id=?1",
            Self::ROUTE_PLAN_COLS
        );
        match conn.query_row(&sql, params![schedule_id], Self::row_to_route_plan) {
            Ok(p) => Ok(Some(p)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(format!("Get route plan: {e}")),
        }
    }

    /// Route plans for upcoming shoots whose computation is older than 24h.
    pub fn stale_route_plans(&self, now: DateTime<Utc>) -> Result<Vec<RoutePlan>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let cutoff = (now - chrono::Duration::hours(24)).to_rfc3339();
        let today = now.date_naive().format("%Y-%m-%d").to_string();
        let sql = format!(
            "SELECT {} FROM route_plans rp
             JOIN schedules s ON s.id = rp.schedule_id
             WHERE rp.computed_at < ?1 AND s.shooting_date >= ?2",
            Self::ROUTE_PLAN_COLS
                .split(", ")
                .map(|c| format!("rp.{c}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| format!("Prepare: {e}"))?;
        let rows = stmt
            .query_map(params![cutoff, today], Self::row_to_route_plan)
            .map_err(|e| format!("Query: {e}"))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    // ─── Weather ──────────────────────────────────────

    /// Upsert the weather record for a schedule (one per schedule).
    pub fn upsert_weather(&self, w: &WeatherData) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        conn.execute(
            "INSERT INTO weather_data (schedule_id, forecast_date, temperature_c, wind_speed_kmh,
               precipitation_mm, humidity_pct, condition, warnings_json, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(schedule_id) DO UPDATE SET
               forecast_date=?2, temperature_c=?3, wind_speed_kmh=?4, precipitation_mm=?5,
               humidity_pct=?6, condition=?7, warnings_json=?8, fetched_at=?9",
            params![
                w.schedule_id,
                w.forecast_date.format("%Y-%m-%d").to_string(),
                w.temperature_c,
                w.wind_speed_kmh,
                w.precipitation_mm,
                w.humidity_pct,
                w.condition,
                serde_json::to_string(&w.warnings).unwrap_or_else(|_| "[]".into()),
                w.fetched_at.to_rfc3339(),
            ],
        )
        .map_err(|e| format!("Upsert weather: {e}"))?;
        Ok(())
    }

    fn row_to_weather(row: &rusqlite::Row<'_>) -> rusqlite::Result<WeatherData> {
        let date: String = row.get(1)?;
        let warnings_json: String = row.get(7)?;
        let fetched: String = row.get(8)?;
        Ok(WeatherData {
            schedule_id: row.get(0)?,
            forecast_date: parse_date(&date)?,
            temperature_c: row.get(2)?,
            wind_speed_kmh: row.get(3)?,
            precipitation_mm: row.get(4)?,
            humidity_pct: row.get(5)?,
            condition: row.get(6)?,
            warnings: serde_json::from_str(&warnings_json).unwrap_or_default(),
            fetched_at: parse_dt(&fetched)?,
        })
    }

    const WEATHER_COLS: &'static str = "schedule_id, forecast_date, temperature_c, \
         wind_speed_kmh, precipitation_mm, humidity_pct, condition, warnings_json, fetched_at";

    /// Get the weather record for a schedule.
    pub fn get_weather(&self, schedule_id: &str) -> Result<Option<WeatherData>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let sql = format!(
            "SELECT {} FROM weather_data WHERE schedule_id=?1",
            Self::WEATHER_COLS
        );
        match conn.query_row(&sql, params![schedule_id], Self::row_to_weather) {
            Ok(w) => Ok(Some(w)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(format!("Get weather: {e}")),
        }
    }

    /// Weather rows for upcoming shoots fetched more than 6h ago.
    pub fn stale_weather(&self, now: DateTime<Utc>) -> Result<Vec<WeatherData>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let cutoff = (now - chrono::Duration::hours(6)).to_rfc3339();
        let today = now.date_naive().format("%Y-%m-%d").to_string();
        let sql = format!(
            "SELECT {} FROM weather_data w
             JOIN schedules s ON s.id = w.schedule_id
             WHERE w.fetched_at < ?1 AND s.shooting_date >= ?2",
            Self::WEATHER_COLS
                .split(", ")
                .map(|c| format!("w.{c}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| format!("Prepare: {e}"))?;
        let rows = stmt
            .query_map(params![cutoff, today], Self::row_to_weather)
            .map_err(|e| format!("Query: {e}"))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    // ─── Summaries ──────────────────────────────────────

    /// Upsert the generated summary for a schedule (idempotent by design —
    /// the same schedule regenerates and overwrites).
    pub fn upsert_summary(&self, s: &Summary) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        conn.execute(
            "INSERT INTO summaries (schedule_id, content, html_content, timeline_json,
               warnings_json, language, generated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(schedule_id) DO UPDATE SET
               content=?2, html_content=?3, timeline_json=?4, warnings_json=?5,
               language=?6, generated_at=?7",
            params![
                s.schedule_id,
                s.content,
                s.html_content,
                serde_json::to_string(&s.timeline).unwrap_or_else(|_| "[]".into()),
                serde_json::to_string(&s.warnings).unwrap_or_else(|_| "[]".into()),
                lang_str(s.language),
                s.generated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| format!("Upsert summary: {e}"))?;
        Ok(())
    }

    /// Get the cached summary for a schedule.
    pub fn get_summary(&self, schedule_id: &str) -> Result<Option<Summary>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        match conn.query_row(
            "SELECT schedule_id, content, html_content, timeline_json, warnings_json, language, generated_at
             FROM summaries WHERE schedule_id=?1",
            params![schedule_id],
            |row| {
                let timeline_json: String = row.get(3)?;
                let warnings_json: String = row.get(4)?;
                let language: String = row.get(5)?;
                let generated: String = row.get(6)?;
                Ok(Summary {
                    schedule_id: row.get(0)?,
                    content: row.get(1)?,
                    html_content: row.get(2)?,
                    timeline: serde_json::from_str(&timeline_json).unwrap_or_default(),
                    warnings: serde_json::from_str(&warnings_json).unwrap_or_default(),
                    language: parse_lang(&language),
                    generated_at: parse_dt(&generated)?,
                })
            },
        ) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(format!("Get summary: {e}")),
        }
    }

    // ─── Calendar events ──────────────────────────────────────

    /// Upsert the calendar mirror for a schedule.
    pub fn upsert_calendar_event(&self, ev: &CalendarEvent) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        conn.execute(
            "INSERT INTO calendar_events (schedule_id, external_id, title, starts_at, ends_at, synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(schedule_id) DO UPDATE SET
               external_id=?2, title=?3, starts_at=?4, ends_at=?5, synced_at=?6",
            params![
                ev.schedule_id,
                ev.external_id,
                ev.title,
                ev.starts_at.to_rfc3339(),
                ev.ends_at.to_rfc3339(),
                ev.synced_at.to_rfc3339(),
            ],
        )
        .map_err(|e| format!("Upsert calendar event: {e}"))?;
        Ok(())
    }

    fn row_to_calendar_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<CalendarEvent> {
        let starts: String = row.get(3)?;
        let ends: String = row.get(4)?;
        let synced: String = row.get(5)?;
        Ok(CalendarEvent {
            schedule_id: row.get(0)?,
            external_id: row.get(1)?,
            title: row.get(2)?,
            starts_at: parse_dt(&starts)?,
            ends_at: parse_dt(&ends)?,
            synced_at: parse_dt(&synced)?,
        })
    }

    /// Get the calendar event mirror for a schedule.
    pub fn get_calendar_event(&self, schedule_id: &str) -> Result<Option<CalendarEvent>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        match conn.query_row(
            "SELECT schedule_id, external_id, title, starts_at, ends_at, synced_at
             FROM calendar_events WHERE schedule_id=?1",
            params![schedule_id],
            Self::row_to_calendar_event,
        ) {
            Ok(ev) => Ok(Some(ev)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(format!("Get calendar event: {e}")),
        }
    }

    /// List all calendar event mirrors.
    pub fn list_calendar_events(&self) -> Result<Vec<CalendarEvent>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let mut stmt = conn
            .prepare(
                "SELECT schedule_id, external_id, title, starts_at, ends_at, synced_at
                 FROM calendar_events ORDER BY starts_at",
            )
            .map_err(|e| format!("Prepare: {e}"))?;
        let rows = stmt
            .query_map([], Self::row_to_calendar_event)
            .map_err(|e| format!("Query: {e}"))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    // ─── Notification outbox ──────────────────────────────────────

    /// Insert a new outbox row.
    pub fn insert_notification(&self, n: &Notification) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        conn.execute(
            "INSERT INTO notifications (id, user_id, channel, template, subject, body, status,
               retry_count, last_error, scheduled_for, created_at, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                n.id,
                n.user_id,
                n.channel.as_str(),
                n.template,
                n.subject,
                n.body,
                n.status.as_str(),
                n.retry_count,
                n.last_error,
                n.scheduled_for.map(|t| t.to_rfc3339()),
                n.created_at.to_rfc3339(),
                n.sent_at.map(|t| t.to_rfc3339()),
            ],
        )
        .map_err(|e| format!("Insert notification: {e}"))?;
        Ok(())
    }

    fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
        let channel: String = row.get(2)?;
        let status: String = row.get(6)?;
        let scheduled: Option<String> = row.get(9)?;
        let created: String = row.get(10)?;
        let sent: Option<String> = row.get(11)?;
        Ok(Notification {
            id: row.get(0)?,
            user_id: row.get(1)?,
            channel: NotificationChannel::parse(&channel).unwrap_or(NotificationChannel::Email),
            template: row.get(3)?,
            subject: row.get(4)?,
            body: row.get(5)?,
            status: NotificationStatus::parse(&status),
            retry_count: row.get(7)?,
            last_error: row.get(8)?,
            scheduled_for: parse_opt_dt(scheduled),
            created_at: parse_dt(&created)?,
            sent_at: parse_opt_dt(sent),
        })
    }

    const NOTIFICATION_COLS: &'static str = "id, user_id, channel, template, subject, body, \
         status, retry_count, last_error, scheduled_for, created_at, sent_at";

    /// Get a single notification.
    pub fn get_notification(&self, id: &str) -> Result<Option<Notification>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let sql = format!(
            "SELECT {} FROM notifications WHERE id=?1",
            Self::NOTIFICATION_COLS
        );
        match conn.query_row(&sql, params![id], Self::row_to_notification) {
            Ok(n) => Ok(Some(n)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(format!("Get notification: {e}")),
        }
    }

    /// Most recent notifications, newest first.
    pub fn recent_notifications(&self, limit: usize) -> Result<Vec<Notification>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let sql = format!(
            "SELECT {} FROM notifications ORDER BY created_at DESC LIMIT ?1",
            Self::NOTIFICATION_COLS
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| format!("Prepare: {e}"))?;
        let rows = stmt
            .query_map(params![limit as i64], Self::row_to_notification)
            .map_err(|e| format!("Query: {e}"))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Claim due pending notifications for delivery.
    ///
    /// Each row is flipped pending -> sending with a compare-and-set UPDATE,
    /// so a concurrently running sweep can never claim the same row twice.
    pub fn claim_due_notifications(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let now_str = now.to_rfc3339();
        let ids: Vec<String> = {
            let mut stmt = conn
                .prepare(
                    "SELECT id FROM notifications
                     WHERE status = 'pending' AND (scheduled_for IS NULL OR scheduled_for <= ?1)
                     ORDER BY created_at",
                )
                .map_err(|e| format!("Prepare: {e}"))?;
            stmt.query_map(params![now_str], |row| row.get::<_, String>(0))
                .map_err(|e| format!("Query: {e}"))?
                .filter_map(|r| r.ok())
                .collect()
        };

        let mut claimed = Vec::new();
        for id in ids {
            let updated = conn
                .execute(
                    "UPDATE notifications SET status='sending', claimed_at=?2
                     WHERE id=?1 AND status='pending'",
                    params![id, now_str],
                )
                .map_err(|e| format!("Claim notification: {e}"))?;
            if updated == 1 {
                claimed.push(id);
            }
        }

        let sql = format!(
            "SELECT {} FROM notifications WHERE id=?1",
            Self::NOTIFICATION_COLS
        );
        let mut rows = Vec::new();
        for id in claimed {
            if let Ok(n) = conn.query_row(&sql, params![id], Self::row_to_notification) {
                rows.push(n);
            }
        }
        Ok(rows)
    }

    /// Claim failed notifications still under the retry budget.
    pub fn claim_failed_notifications(
        &self,
        max_retries: u32,
    ) -> Result<Vec<Notification>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let ids: Vec<String> = {
            let mut stmt = conn
                .prepare(
                    "SELECT id FROM notifications
                     WHERE status = 'failed' AND retry_count < ?1
                     ORDER BY created_at",
                )
                .map_err(|e| format!("Prepare: {e}"))?;
            stmt.query_map(params![max_retries], |row| row.get::<_, String>(0))
                .map_err(|e| format!("Query: {e}"))?
                .filter_map(|r| r.ok())
                .collect()
        };

        let now_str = Utc::now().to_rfc3339();
        let mut claimed = Vec::new();
        for id in ids {
            let updated = conn
                .execute(
                    "UPDATE notifications SET status='sending', claimed_at=?2
                     WHERE id=?1 AND status='failed'",
                    params![id, now_str],
                )
                .map_err(|e| format!("Claim retry: {e}"))?;
            if updated == 1 {
                claimed.push(id);
            }
        }

        let sql = format!(
            "SELECT {} FROM notifications WHERE id=?1",
            Self::NOTIFICATION_COLS
        );
        let mut rows = Vec::new();
        for id in claimed {
            if let Ok(n) = conn.query_row(&sql, params![id], Self::row_to_notification) {
                rows.push(n);
            }
        }
        Ok(rows)
    }

    /// Release rows stuck in 'sending' since before `cutoff` back to
    /// 'pending'. A crash between the claim and the mark call would
    /// otherwise strand the row where no sweep query can see it.
    pub fn reclaim_stuck_notifications(&self, cutoff: DateTime<Utc>) -> Result<usize, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let released = conn
            .execute(
                "UPDATE notifications SET status='pending', claimed_at=NULL
                 WHERE status='sending' AND (claimed_at IS NULL OR claimed_at <= ?1)",
                params![cutoff.to_rfc3339()],
            )
            .map_err(|e| format!("Reclaim stuck: {e}"))?;
        Ok(released)
    }

    /// Mark a notification as sent.
    pub fn mark_notification_sent(&self, id: &str, now: DateTime<Utc>) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        conn.execute(
            "UPDATE notifications SET status='sent', sent_at=?1, last_error=NULL WHERE id=?2",
            params![now.to_rfc3339(), id],
        )
        .map_err(|e| format!("Mark sent: {e}"))?;
        Ok(())
    }

    /// Mark a notification as failed and bump the retry counter.
    pub fn mark_notification_failed(&self, id: &str, error: &str) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        conn.execute(
            "UPDATE notifications SET status='failed', retry_count=retry_count+1, last_error=?1 WHERE id=?2",
            params![error, id],
        )
        .map_err(|e| format!("Mark failed: {e}"))?;
        Ok(())
    }

    /// Cancel a pending notification. Returns false when the row was already
    /// past pending (sent, failed, or mid-delivery).
    pub fn cancel_notification(&self, id: &str) -> Result<bool, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let updated = conn
            .execute(
                "UPDATE notifications SET status='cancelled' WHERE id=?1 AND status='pending'",
                params![id],
            )
            .map_err(|e| format!("Cancel notification: {e}"))?;
        Ok(updated == 1)
    }

    /// Count notifications per status.
    pub fn notification_status_counts(&self) -> Result<Vec<(String, i64)>, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM notifications GROUP BY status ORDER BY status")
            .map_err(|e| format!("Prepare: {e}"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(|e| format!("Query: {e}"))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    // ─── Processed emails ──────────────────────────────────────

    /// True iff a prior record shares the message id OR the PDF hash.
    pub fn is_duplicate(&self, message_id: &str, pdf_hash: &str) -> Result<bool, String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM processed_emails WHERE message_id=?1 OR pdf_hash=?2",
                params![message_id, pdf_hash],
                |row| row.get(0),
            )
            .map_err(|e| format!("Duplicate check: {e}"))?;
        Ok(count > 0)
    }

    /// Record an ingested call-sheet email.
    pub fn record_processed_email(&self, e: &ProcessedEmail) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("Lock: {e}"))?;
        conn.execute(
            "INSERT OR REPLACE INTO processed_emails (message_id, pdf_hash, subject, schedule_id, processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                e.message_id,
                e.pdf_hash,
                e.subject,
                e.schedule_id,
                e.processed_at.to_rfc3339(),
            ],
        )
        .map_err(|e| format!("Record processed email: {e}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use stillontime_core::types::TimeBuffers;

    fn db() -> ScheduleDb {
        ScheduleDb::open_in_memory().unwrap()
    }

    fn schedule(id: &str, date: NaiveDate) -> ScheduleData {
        let now = Utc::now();
        ScheduleData {
            id: id.into(),
            shooting_date: date,
            call_time: "08:00".into(),
            location: "Stage 4".into(),
            scene_type: SceneType::Ext,
            scenes: vec!["12A".into()],
            equipment: vec!["Steadicam".into()],
            contacts: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn notification(id: &str, scheduled_for: Option<DateTime<Utc>>) -> Notification {
        Notification {
            id: id.into(),
            user_id: "u1".into(),
            channel: NotificationChannel::Email,
            template: "call_sheet_ready".into(),
            subject: "Call sheet".into(),
            body: "Call at 08:00".into(),
            status: NotificationStatus::Pending,
            retry_count: 0,
            last_error: None,
            scheduled_for,
            created_at: Utc::now(),
            sent_at: None,
        }
    }

    #[test]
    fn test_schedule_crud_and_range() {
        let db = db();
        let d = |day| NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
        db.upsert_schedule(&schedule("s1", d(10))).unwrap();
        db.upsert_schedule(&schedule("s2", d(14))).unwrap();
        db.upsert_schedule(&schedule("s3", d(20))).unwrap();

        let got = db.get_schedule("s2").unwrap().unwrap();
        assert_eq!(got.location, "Stage 4");
        assert_eq!(got.scene_type, SceneType::Ext);
        assert_eq!(got.scenes, vec!["12A".to_string()]);

        let in_range = db.schedules_in_range(d(11), d(15)).unwrap();
        assert_eq!(in_range.len(), 1);
        assert_eq!(in_range[0].id, "s2");

        db.delete_schedule("s2").unwrap();
        assert!(db.get_schedule("s2").unwrap().is_none());
        assert_eq!(db.list_schedules().unwrap().len(), 2);
    }

    #[test]
    fn test_route_plan_one_per_schedule() {
        let db = db();
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        db.upsert_schedule(&schedule("s1", date)).unwrap();

        let at = |h, m| Utc.from_utc_datetime(&date.and_hms_opt(h, m, 0).unwrap());
        let mut plan = RoutePlan {
            schedule_id: "s1".into(),
            wake_up_time: at(5, 35),
            departure_time: at(7, 15),
            arrival_time: at(8, 0),
            total_travel_minutes: 145,
            route_segments: vec![],
            buffers: TimeBuffers::default(),
            computed_at: Utc::now(),
        };
        db.upsert_route_plan(&plan).unwrap();

        // re-upsert replaces the single row
        plan.total_travel_minutes = 160;
        db.upsert_route_plan(&plan).unwrap();
        let got = db.get_route_plan("s1").unwrap().unwrap();
        assert_eq!(got.total_travel_minutes, 160);
        assert_eq!(got.wake_up_time, at(5, 35));
    }

    #[test]
    fn test_stale_route_plans_only_upcoming() {
        let db = db();
        let now = Utc::now();
        let upcoming = now.date_naive() + chrono::Duration::days(3);
        let past = now.date_naive() - chrono::Duration::days(3);
        db.upsert_schedule(&schedule("up", upcoming)).unwrap();
        db.upsert_schedule(&schedule("past", past)).unwrap();

        let old = now - chrono::Duration::hours(30);
        for id in ["up", "past"] {
            db.upsert_route_plan(&RoutePlan {
                schedule_id: id.into(),
                wake_up_time: now,
                departure_time: now,
                arrival_time: now,
                total_travel_minutes: 60,
                route_segments: vec![],
                buffers: TimeBuffers::default(),
                computed_at: old,
            })
            .unwrap();
        }

        let stale = db.stale_route_plans(now).unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].schedule_id, "up");
    }

    #[test]
    fn test_weather_upsert_and_staleness() {
        let db = db();
        let now = Utc::now();
        let date = now.date_naive() + chrono::Duration::days(1);
        db.upsert_schedule(&schedule("s1", date)).unwrap();

        let w = WeatherData {
            schedule_id: "s1".into(),
            forecast_date: date,
            temperature_c: -2.0,
            wind_speed_kmh: 18.0,
            precipitation_mm: 0.4,
            humidity_pct: 80.0,
            condition: "overcast".into(),
            warnings: vec!["Black ice possible".into()],
            fetched_at: now - chrono::Duration::hours(7),
        };
        db.upsert_weather(&w).unwrap();

        let got = db.get_weather("s1").unwrap().unwrap();
        assert_eq!(got.condition, "overcast");
        assert_eq!(got.warnings.len(), 1);

        let stale = db.stale_weather(now).unwrap();
        assert_eq!(stale.len(), 1);
    }

    #[test]
    fn test_summary_upsert_by_schedule_id() {
        let db = db();
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        db.upsert_schedule(&schedule("s1", date)).unwrap();

        let mut summary = Summary {
            schedule_id: "s1".into(),
            content: "v1".into(),
            html_content: "<p>v1</p>".into(),
            timeline: vec![],
            warnings: vec![],
            language: Language::Pl,
            generated_at: Utc::now(),
        };
        db.upsert_summary(&summary).unwrap();
        summary.content = "v2".into();
        db.upsert_summary(&summary).unwrap();

        let got = db.get_summary("s1").unwrap().unwrap();
        assert_eq!(got.content, "v2");
        assert_eq!(got.language, Language::Pl);
    }

    #[test]
    fn test_outbox_claim_is_exclusive() {
        let db = db();
        let now = Utc::now();
        db.insert_notification(&notification("n1", None)).unwrap();
        db.insert_notification(&notification("n2", Some(now - chrono::Duration::minutes(5))))
            .unwrap();
        // future row must not be claimed
        db.insert_notification(&notification("n3", Some(now + chrono::Duration::hours(1))))
            .unwrap();

        let first = db.claim_due_notifications(now).unwrap();
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|n| n.status == NotificationStatus::Sending));

        // second sweep claims nothing — rows are already in 'sending'
        let second = db.claim_due_notifications(now).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn test_retry_bounded_by_max() {
        let db = db();
        db.insert_notification(&notification("n1", None)).unwrap();
        let claimed = db.claim_due_notifications(Utc::now()).unwrap();
        assert_eq!(claimed.len(), 1);

        db.mark_notification_failed("n1", "SMTP timeout").unwrap();
        let retry = db.claim_failed_notifications(3).unwrap();
        assert_eq!(retry.len(), 1);

        db.mark_notification_failed("n1", "SMTP timeout").unwrap();
        db.mark_notification_failed("n1", "SMTP timeout").unwrap();
        // retry_count is now 3 — over budget
        let exhausted = db.claim_failed_notifications(3).unwrap();
        assert!(exhausted.is_empty());

        let n = db.get_notification("n1").unwrap().unwrap();
        assert_eq!(n.retry_count, 3);
        assert_eq!(n.last_error.as_deref(), Some("SMTP timeout"));
    }

    #[test]
    fn test_stuck_sending_rows_are_reclaimed() {
        let db = db();
        let now = Utc::now();
        db.insert_notification(&notification("n1", None)).unwrap();
        assert_eq!(db.claim_due_notifications(now).unwrap().len(), 1);

        // delivery interrupted: no mark call, no sweep query sees the row
        assert!(db.claim_due_notifications(now).unwrap().is_empty());
        assert!(db.claim_failed_notifications(3).unwrap().is_empty());

        // a cutoff before the claim leaves it alone
        let early = now - chrono::Duration::minutes(5);
        assert_eq!(db.reclaim_stuck_notifications(early).unwrap(), 0);

        // past the cutoff the row returns to pending and is claimable again
        let late = now + chrono::Duration::minutes(5);
        assert_eq!(db.reclaim_stuck_notifications(late).unwrap(), 1);
        let n = db.get_notification("n1").unwrap().unwrap();
        assert_eq!(n.status, NotificationStatus::Pending);
        assert_eq!(db.claim_due_notifications(now).unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_timestamp_is_a_row_error() {
        let db = db();
        db.conn
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO notifications (id, user_id, channel, template, created_at)
                 VALUES ('bad', 'u1', 'email', 'call_sheet_ready', 'not-a-timestamp')",
                [],
            )
            .unwrap();
        let err = db.get_notification("bad").unwrap_err();
        assert!(err.contains("Get notification"));
    }

    #[test]
    fn test_cancel_only_pending() {
        let db = db();
        db.insert_notification(&notification("n1", None)).unwrap();
        assert!(db.cancel_notification("n1").unwrap());

        // cancelled rows are never claimed
        assert!(db.claim_due_notifications(Utc::now()).unwrap().is_empty());
        // cancelling twice is a no-op
        assert!(!db.cancel_notification("n1").unwrap());
    }

    #[test]
    fn test_status_counts() {
        let db = db();
        db.insert_notification(&notification("n1", None)).unwrap();
        db.insert_notification(&notification("n2", None)).unwrap();
        db.claim_due_notifications(Utc::now()).unwrap();
        db.mark_notification_sent("n1", Utc::now()).unwrap();
        db.mark_notification_failed("n2", "boom").unwrap();

        let counts = db.notification_status_counts().unwrap();
        let get = |s: &str| counts.iter().find(|(k, _)| k == s).map(|(_, v)| *v);
        assert_eq!(get("sent"), Some(1));
        assert_eq!(get("failed"), Some(1));
    }

    #[test]
    fn test_is_duplicate_matches_either_key() {
        let db = db();
        db.record_processed_email(&ProcessedEmail {
            message_id: "<msg-1@prod.example>".into(),
            pdf_hash: "abc123".into(),
            subject: "Call sheet day 12".into(),
            schedule_id: Some("s1".into()),
            processed_at: Utc::now(),
        })
        .unwrap();

        assert!(db.is_duplicate("<msg-1@prod.example>", "zzz").unwrap());
        assert!(db.is_duplicate("<other@prod.example>", "abc123").unwrap());
        assert!(!db.is_duplicate("<other@prod.example>", "zzz").unwrap());
    }

    #[test]
    fn test_user_roundtrip() {
        let db = db();
        let user = User {
            id: "u1".into(),
            name: "Anna".into(),
            email: "anna@example.com".into(),
            phone: "+48600000000".into(),
            push_token: "tok".into(),
            language: Language::En,
            channels: vec![NotificationChannel::Email, NotificationChannel::Sms],
        };
        db.upsert_user(&user).unwrap();
        let got = db.get_user("u1").unwrap().unwrap();
        assert_eq!(got.language, Language::En);
        assert_eq!(got.channels.len(), 2);
        assert_eq!(db.list_users().unwrap().len(), 1);

        db.delete_user("u1").unwrap();
        assert!(db.get_user("u1").unwrap().is_none());
    }

    #[test]
    fn test_calendar_event_upsert() {
        let db = db();
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        db.upsert_schedule(&schedule("s1", date)).unwrap();
        let now = Utc::now();
        let mut ev = CalendarEvent {
            schedule_id: "s1".into(),
            external_id: String::new(),
            title: "Shoot day 12".into(),
            starts_at: now,
            ends_at: now + chrono::Duration::hours(10),
            synced_at: now,
        };
        db.upsert_calendar_event(&ev).unwrap();
        ev.external_id = "gcal-123".into();
        db.upsert_calendar_event(&ev).unwrap();

        let got = db.get_calendar_event("s1").unwrap().unwrap();
        assert_eq!(got.external_id, "gcal-123");
        assert_eq!(db.list_calendar_events().unwrap().len(), 1);
    }
}
