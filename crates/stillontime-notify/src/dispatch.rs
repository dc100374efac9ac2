//! Channel dispatch — actually delivers a claimed outbox row.
//! Supports: SMTP email (lettre), Twilio SMS, FCM push.

use stillontime_core::config::{PushConfig, SmsConfig, SmtpConfig, StillOnTimeConfig};
use stillontime_core::types::{Notification, NotificationChannel, User};

/// Deliver one notification to one user over the row's channel.
/// Returns Ok(()) on success, Err(reason) on failure.
pub async fn dispatch(
    config: &StillOnTimeConfig,
    user: &User,
    notification: &Notification,
) -> Result<(), String> {
    match notification.channel {
        NotificationChannel::Email => {
            if user.email.is_empty() {
                return Err(format!("User {} has no email address", user.id));
            }
            send_email(
                &config.smtp,
                &user.email,
                &notification.subject,
                &notification.body,
            )
            .await
        }
        NotificationChannel::Sms => {
            if user.phone.is_empty() {
                return Err(format!("User {} has no phone number", user.id));
            }
            send_sms(&config.sms, &user.phone, &notification.body).await
        }
        NotificationChannel::Push => {
            if user.push_token.is_empty() {
                return Err(format!("User {} has no push token", user.id));
            }
            send_push(
                &config.push,
                &user.push_token,
                &notification.subject,
                &notification.body,
            )
            .await
        }
    }
}

/// Send via SMTP (async lettre).
async fn send_email(smtp: &SmtpConfig, to: &str, subject: &str, body: &str) -> Result<(), String> {
    use lettre::{
        AsyncSmtpTransport, AsyncTransport, Message as LettreMessage, message::Mailbox,
        message::header::ContentType, transport::smtp::authentication::Credentials,
    };

    if !smtp.enabled {
        return Err("SMTP channel is disabled".into());
    }

    let from_name = smtp.display_name.as_deref().unwrap_or("StillOnTime");
    let from_mailbox: Mailbox = format!("{from_name} <{}>", smtp.from)
        .parse()
        .map_err(|e| format!("Invalid from: {e}"))?;
    let to_mailbox: Mailbox = to.parse().map_err(|e| format!("Invalid to: {e}"))?;

    let email = LettreMessage::builder()
        .from(from_mailbox)
        .to(to_mailbox)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| format!("Build email: {e}"))?;

    let creds = Credentials::new(smtp.username.clone(), smtp.password.clone());
    let mailer = AsyncSmtpTransport::<lettre::Tokio1Executor>::starttls_relay(&smtp.host)
        .map_err(|e| format!("SMTP relay: {e}"))?
        .port(smtp.port)
        .credentials(creds)
        .build();

    mailer
        .send(email)
        .await
        .map_err(|e| format!("SMTP send: {e}"))?;

    tracing::info!("📤 Email sent to: {to}");
    Ok(())
}

/// Send via Twilio Messages API.
async fn send_sms(sms: &SmsConfig, to: &str, body: &str) -> Result<(), String> {
    if !sms.enabled {
        return Err("SMS channel is disabled".into());
    }
    if sms.account_sid.is_empty() || sms.auth_token.is_empty() {
        return Err("Twilio credentials not configured".into());
    }

    let url = format!(
        "{}/2010-04-01/Accounts/{}/Messages.json",
        sms.base_url.trim_end_matches('/'),
        sms.account_sid
    );

    let client = reqwest::Client::new();
    let resp = client
        .post(&url)
        .basic_auth(&sms.account_sid, Some(&sms.auth_token))
        .form(&[("To", to), ("From", &sms.from_number), ("Body", body)])
        .timeout(std::time::Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| format!("Twilio send failed: {e}"))?;

    if resp.status().is_success() {
        tracing::info!("📱 SMS sent to: {to}");
        Ok(())
    } else {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(format!("Twilio API error {status}: {body}"))
    }
}

/// Send via FCM legacy HTTP API.
async fn send_push(push: &PushConfig, token: &str, title: &str, body: &str) -> Result<(), String> {
    if !push.enabled {
        return Err("Push channel is disabled".into());
    }
    if push.server_key.is_empty() {
        return Err("FCM server key not configured".into());
    }

    let url = format!("{}/fcm/send", push.base_url.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let resp = client
        .post(&url)
        .header("Authorization", format!("key={}", push.server_key))
        .json(&serde_json::json!({
            "to": token,
            "notification": {
                "title": title,
                "body": body,
            }
        }))
        .timeout(std::time::Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| format!("FCM send failed: {e}"))?;

    if resp.status().is_success() {
        tracing::info!("🔔 Push sent ({title})");
        Ok(())
    } else {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(format!("FCM error {status}: {body}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stillontime_core::types::{Language, NotificationStatus};

    fn user() -> User {
        User {
            id: "u1".into(),
            name: "Anna".into(),
            email: String::new(),
            phone: String::new(),
            push_token: String::new(),
            language: Language::Pl,
            channels: vec![],
        }
    }

    fn notification(channel: NotificationChannel) -> Notification {
        Notification {
            id: "n1".into(),
            user_id: "u1".into(),
            channel,
            template: "schedule_created".into(),
            subject: "s".into(),
            body: "b".into(),
            status: NotificationStatus::Sending,
            retry_count: 0,
            last_error: None,
            scheduled_for: None,
            created_at: Utc::now(),
            sent_at: None,
        }
    }

    #[tokio::test]
    async fn test_missing_destination_fails_fast() {
        let config = StillOnTimeConfig::default();
        let u = user();
        for channel in [
            NotificationChannel::Email,
            NotificationChannel::Sms,
            NotificationChannel::Push,
        ] {
            let err = dispatch(&config, &u, &notification(channel)).await.unwrap_err();
            assert!(err.contains("has no"));
        }
    }

    #[tokio::test]
    async fn test_disabled_channel_fails_without_network() {
        let config = StillOnTimeConfig::default();
        let mut u = user();
        u.phone = "+48600000000".into();
        let err = dispatch(&config, &u, &notification(NotificationChannel::Sms))
            .await
            .unwrap_err();
        assert!(err.contains("disabled"));
    }
}
