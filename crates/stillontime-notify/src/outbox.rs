//! Notification outbox — rows are persisted first, delivered by sweeps.
//!
//! A sweep claims each due row (pending -> sending) before touching the
//! network, so two overlapping sweeps can never deliver the same row.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use stillontime_core::config::StillOnTimeConfig;
use stillontime_core::types::{
    Notification, NotificationChannel, NotificationStatus, User,
};
use stillontime_store::ScheduleDb;

use crate::dispatch;
use crate::templates::{self, NotifyContext};

/// Outbox facade over the store plus the channel dispatchers.
pub struct Outbox {
    db: Arc<ScheduleDb>,
    config: Arc<StillOnTimeConfig>,
}

impl Outbox {
    pub fn new(db: Arc<ScheduleDb>, config: Arc<StillOnTimeConfig>) -> Self {
        Self { db, config }
    }

    /// Render and enqueue one template for every channel the user opted
    /// into. Returns the ids of the inserted rows.
    pub fn enqueue_for_user(
        &self,
        user: &User,
        template: &str,
        ctx: &NotifyContext<'_>,
        scheduled_for: Option<DateTime<Utc>>,
    ) -> Result<Vec<String>, String> {
        let mut ids = Vec::new();
        for &channel in &user.channels {
            let rendered = templates::render(template, channel, user.language, ctx)
                .map_err(|e| format!("Render {template}: {e}"))?;
            let id = self.enqueue(
                user,
                channel,
                template,
                &rendered.subject,
                &rendered.body,
                scheduled_for,
            )?;
            ids.push(id);
        }
        if ids.is_empty() {
            tracing::debug!("User {} has no channels opted in, nothing enqueued", user.id);
        }
        Ok(ids)
    }

    /// Insert one pending outbox row. Returns its id.
    pub fn enqueue(
        &self,
        user: &User,
        channel: NotificationChannel,
        template: &str,
        subject: &str,
        body: &str,
        scheduled_for: Option<DateTime<Utc>>,
    ) -> Result<String, String> {
        let id = Uuid::new_v4().to_string();
        self.db.insert_notification(&Notification {
            id: id.clone(),
            user_id: user.id.clone(),
            channel,
            template: template.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            status: NotificationStatus::Pending,
            retry_count: 0,
            last_error: None,
            scheduled_for,
            created_at: Utc::now(),
            sent_at: None,
        })?;
        tracing::debug!("📬 Enqueued {} notification {id} for user {}", channel.as_str(), user.id);
        Ok(id)
    }

    /// Claim and deliver every due pending row. Returns how many were sent.
    pub async fn process_due(&self, now: DateTime<Utc>) -> Result<usize, String> {
        let claimed = self.db.claim_due_notifications(now)?;
        self.deliver(claimed).await
    }

    /// Release rows stuck mid-delivery (a crash between the claim and the
    /// mark call) once they are older than five sweep intervals.
    pub fn reclaim_stuck(&self, now: DateTime<Utc>) -> Result<usize, String> {
        let grace =
            chrono::Duration::seconds(self.config.outbox.sweep_interval_secs as i64 * 5);
        self.db.reclaim_stuck_notifications(now - grace)
    }

    /// Claim and re-deliver failed rows still under the retry budget.
    pub async fn retry_failed(&self) -> Result<usize, String> {
        let claimed = self
            .db
            .claim_failed_notifications(self.config.outbox.max_retries)?;
        self.deliver(claimed).await
    }

    async fn deliver(&self, claimed: Vec<Notification>) -> Result<usize, String> {
        let mut sent = 0;
        for n in claimed {
            let user = match self.db.get_user(&n.user_id)? {
                Some(u) => u,
                None => {
                    self.db
                        .mark_notification_failed(&n.id, &format!("Unknown user {}", n.user_id))?;
                    continue;
                }
            };
            match dispatch::dispatch(&self.config, &user, &n).await {
                Ok(()) => {
                    self.db.mark_notification_sent(&n.id, Utc::now())?;
                    sent += 1;
                }
                Err(e) => {
                    tracing::warn!("❌ Delivery of {} failed: {e}", n.id);
                    self.db.mark_notification_failed(&n.id, &e)?;
                }
            }
        }
        Ok(sent)
    }
}

/// Spawn the outbox sweep loop as a background tokio task.
pub async fn spawn_outbox_sweeps(outbox: Arc<Outbox>) {
    let every = outbox.config.outbox.sweep_interval_secs;
    tracing::info!("⏰ Outbox sweeps started (every {every}s)");

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(every));
    loop {
        interval.tick().await;
        let now = Utc::now();
        match outbox.reclaim_stuck(now) {
            Ok(released) if released > 0 => {
                tracing::warn!("♻️ Released {released} notification(s) stuck mid-delivery")
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Reclaim sweep: {e}"),
        }
        match outbox.process_due(now).await {
            Ok(sent) if sent > 0 => tracing::info!("📣 Outbox sweep delivered {sent} notification(s)"),
            Ok(_) => {}
            Err(e) => tracing::error!("Outbox sweep: {e}"),
        }
        if let Err(e) = outbox.retry_failed().await {
            tracing::error!("Retry sweep: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stillontime_core::types::{Language, SceneType, ScheduleData};

    fn setup() -> (Outbox, Arc<ScheduleDb>, User, ScheduleData) {
        let db = Arc::new(ScheduleDb::open_in_memory().unwrap());
        // all channels disabled: every dispatch fails without network I/O
        let config = Arc::new(StillOnTimeConfig::default());
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
        let now = Utc::now();
        let schedule = ScheduleData {
            id: "s1".into(),
            shooting_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            call_time: "08:00".into(),
            location: "Stage 4".into(),
            scene_type: SceneType::Int,
            scenes: vec![],
            equipment: vec![],
            contacts: vec![],
            created_at: now,
            updated_at: now,
        };
        (Outbox::new(db.clone(), config), db, user, schedule)
    }

    #[test]
    fn test_enqueue_one_row_per_opted_in_channel() {
        let (outbox, db, user, schedule) = setup();
        let ctx = NotifyContext {
            schedule: &schedule,
            route_plan: None,
            weather: None,
        };
        let ids = outbox
            .enqueue_for_user(&user, "schedule_created", &ctx, None)
            .unwrap();
        assert_eq!(ids.len(), 2);

        let rows = db.recent_notifications(10).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|n| n.status == NotificationStatus::Pending));
        let channels: Vec<_> = rows.iter().map(|n| n.channel).collect();
        assert!(channels.contains(&NotificationChannel::Email));
        assert!(channels.contains(&NotificationChannel::Sms));
    }

    #[tokio::test]
    async fn test_failed_delivery_marks_row_and_counts_retry() {
        let (outbox, db, user, schedule) = setup();
        let ctx = NotifyContext {
            schedule: &schedule,
            route_plan: None,
            weather: None,
        };
        outbox
            .enqueue_for_user(&user, "schedule_created", &ctx, None)
            .unwrap();

        // disabled channels: everything fails, nothing is sent
        let sent = outbox.process_due(Utc::now()).await.unwrap();
        assert_eq!(sent, 0);

        let rows = db.recent_notifications(10).unwrap();
        assert!(rows.iter().all(|n| n.status == NotificationStatus::Failed));
        assert!(rows.iter().all(|n| n.retry_count == 1));
        assert!(rows.iter().all(|n| n.last_error.is_some()));

        // retry sweep claims them again and fails again
        outbox.retry_failed().await.unwrap();
        let rows = db.recent_notifications(10).unwrap();
        assert!(rows.iter().all(|n| n.retry_count == 2));
    }

    #[tokio::test]
    async fn test_retry_budget_is_respected() {
        let (outbox, db, user, schedule) = setup();
        let ctx = NotifyContext {
            schedule: &schedule,
            route_plan: None,
            weather: None,
        };
        outbox
            .enqueue_for_user(&user, "schedule_created", &ctx, None)
            .unwrap();
        outbox.process_due(Utc::now()).await.unwrap();

        // default budget is 3: two more retries, then the rows are dead
        outbox.retry_failed().await.unwrap();
        outbox.retry_failed().await.unwrap();
        outbox.retry_failed().await.unwrap();

        let rows = db.recent_notifications(10).unwrap();
        assert!(rows.iter().all(|n| n.retry_count == 3));
    }

    #[tokio::test]
    async fn test_interrupted_delivery_is_released_after_grace() {
        let (outbox, db, user, schedule) = setup();
        let ctx = NotifyContext {
            schedule: &schedule,
            route_plan: None,
            weather: None,
        };
        let ids = outbox
            .enqueue_for_user(&user, "schedule_created", &ctx, None)
            .unwrap();

        // claim as a sweep would, then stop before any mark call
        let claimed = db.claim_due_notifications(Utc::now()).unwrap();
        assert_eq!(claimed.len(), ids.len());
        assert!(db.claim_due_notifications(Utc::now()).unwrap().is_empty());

        // inside the grace period nothing moves
        assert_eq!(outbox.reclaim_stuck(Utc::now()).unwrap(), 0);

        // past the grace period the rows return to pending
        let later = Utc::now() + chrono::Duration::minutes(10);
        assert_eq!(outbox.reclaim_stuck(later).unwrap(), ids.len());
        let rows = db.recent_notifications(10).unwrap();
        assert!(rows.iter().all(|n| n.status == NotificationStatus::Pending));
    }

    #[tokio::test]
    async fn test_unknown_user_fails_the_row() {
        let (outbox, db, _, _) = setup();
        db.insert_notification(&Notification {
            id: "n-ghost".into(),
            user_id: "nobody".into(),
            channel: NotificationChannel::Email,
            template: "schedule_created".into(),
            subject: "s".into(),
            body: "b".into(),
            status: NotificationStatus::Pending,
            retry_count: 0,
            last_error: None,
            scheduled_for: None,
            created_at: Utc::now(),
            sent_at: None,
        })
        .unwrap();

        outbox.process_due(Utc::now()).await.unwrap();
        let n = db.get_notification("n-ghost").unwrap().unwrap();
        assert_eq!(n.status, NotificationStatus::Failed);
        assert!(n.last_error.unwrap().contains("Unknown user"));
    }
}
