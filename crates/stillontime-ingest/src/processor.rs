//! Turns fetched emails into persisted schedules.

use chrono::Utc;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use stillontime_core::Result;
use stillontime_core::config::StillOnTimeConfig;
use stillontime_core::types::{ProcessedEmail, RoutePlan, ScheduleData, TimeBuffers};
use stillontime_notify::templates::TEMPLATE_SCHEDULE_CREATED;
use stillontime_notify::{NotifyContext, Outbox};
use stillontime_schedule::time_calc::calculate_time_schedule;
use stillontime_store::ScheduleDb;

use crate::extract::{extract_schedule_fields, pdf_hash};
use crate::imap::{FetchedEmail, fetch_unread};

/// Email-to-schedule pipeline.
pub struct Ingestor {
    db: Arc<ScheduleDb>,
    config: Arc<StillOnTimeConfig>,
    outbox: Arc<Outbox>,
    last_seen_uid: Arc<Mutex<u32>>,
}

impl Ingestor {
    pub fn new(db: Arc<ScheduleDb>, config: Arc<StillOnTimeConfig>, outbox: Arc<Outbox>) -> Self {
        Self {
            db,
            config,
            outbox,
            last_seen_uid: Arc::new(Mutex::new(0)),
        }
    }

    /// One poll cycle: fetch unseen mail and process each candidate.
    /// Returns how many schedules were created.
    pub async fn poll_once(&self) -> Result<usize> {
        let emails = fetch_unread(&self.config.imap, &self.last_seen_uid).await?;
        let mut created = 0;
        for email in &emails {
            match self.process_email(email) {
                Ok(Some(schedule)) => {
                    tracing::info!(
                        "🎬 Schedule {} created from '{}' ({})",
                        schedule.id,
                        email.subject,
                        schedule.shooting_date
                    );
                    created += 1;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Ingest of '{}' failed: {e}", email.subject),
            }
        }
        Ok(created)
    }

    /// Process one fetched email.
    ///
    /// Returns Ok(None) for non-call-sheet mail (no PDF) and for
    /// duplicates; Err only for mail that looked like a call sheet but
    /// could not be ingested.
    pub fn process_email(&self, email: &FetchedEmail) -> Result<Option<ScheduleData>> {
        let Some((filename, bytes)) = email.pdf_attachments.first() else {
            tracing::debug!("No PDF in '{}', skipping", email.subject);
            return Ok(None);
        };

        let hash = pdf_hash(bytes);
        if self.db.is_duplicate(&email.message_id, &hash)? {
            tracing::info!("↩️ Duplicate call sheet '{}' ({filename}), skipping", email.subject);
            return Ok(None);
        }

        let extracted = extract_schedule_fields(&email.subject, &email.body_text)?;
        let now = Utc::now();
        let schedule = ScheduleData {
            id: Uuid::new_v4().to_string(),
            shooting_date: extracted.shooting_date,
            call_time: extracted.call_time,
            location: extracted.location,
            scene_type: extracted.scene_type,
            scenes: extracted.scenes,
            equipment: vec![],
            contacts: vec![],
            created_at: now,
            updated_at: now,
        };
        self.db.upsert_schedule(&schedule)?;

        // A route plan only when the call sheet carries a travel estimate;
        // otherwise the gateway computes one on demand.
        let plan = match extracted.travel_minutes {
            Some(travel) => {
                let buffers = TimeBuffers::default();
                let times = calculate_time_schedule(
                    schedule.shooting_date,
                    &schedule.call_time,
                    travel,
                    &buffers,
                )?;
                let plan = RoutePlan {
                    schedule_id: schedule.id.clone(),
                    wake_up_time: times.wake_up_time,
                    departure_time: times.departure_time,
                    arrival_time: times.arrival_time,
                    total_travel_minutes: times.total_travel_minutes,
                    route_segments: vec![],
                    buffers,
                    computed_at: now,
                };
                self.db.upsert_route_plan(&plan)?;
                Some(plan)
            }
            None => None,
        };

        self.db.record_processed_email(&ProcessedEmail {
            message_id: email.message_id.clone(),
            pdf_hash: hash,
            subject: email.subject.clone(),
            schedule_id: Some(schedule.id.clone()),
            processed_at: now,
        })?;

        // Announce to every crew member; the outbox sweeps deliver.
        let ctx = NotifyContext {
            schedule: &schedule,
            route_plan: plan.as_ref(),
            weather: None,
        };
        for user in self.db.list_users()? {
            self.outbox
                .enqueue_for_user(&user, TEMPLATE_SCHEDULE_CREATED, &ctx, None)?;
        }

        Ok(Some(schedule))
    }
}

/// Spawn the mailbox polling loop as a background tokio task.
pub async fn spawn_ingest_loop(ingestor: Arc<Ingestor>) {
    let every = ingestor.config.imap.poll_interval_secs;
    tracing::info!("📬 Call-sheet ingestion started (poll every {every}s)");

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(every));
    loop {
        interval.tick().await;
        match ingestor.poll_once().await {
            Ok(n) if n > 0 => tracing::info!("🎬 Ingested {n} new schedule(s)"),
            Ok(_) => {}
            Err(e) => tracing::error!("IMAP poll: {e}"),
        }
    }
}
