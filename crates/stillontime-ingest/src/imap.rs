//! Async IMAP polling for the call-sheet mailbox.

use std::sync::{Arc, Mutex};

use stillontime_core::config::ImapConfig;
use stillontime_core::{Result, StillOnTimeError};

/// One fetched email, parsed far enough for ingestion.
#[derive(Debug, Clone)]
pub struct FetchedEmail {
    pub uid: u32,
    /// RFC 5322 Message-ID, or a uid-derived fallback.
    pub message_id: String,
    pub from: String,
    pub subject: String,
    pub body_text: String,
    /// (filename, bytes) of each PDF attachment.
    pub pdf_attachments: Vec<(String, Vec<u8>)>,
}

type ImapTlsStream =
    async_imap::Client<tokio_native_tls::TlsStream<tokio::net::TcpStream>>;

/// Create TLS-wrapped IMAP connection (async, tokio-native).
async fn connect_imap_tls(host: &str, port: u16) -> Result<ImapTlsStream> {
    let tcp = tokio::net::TcpStream::connect((host, port))
        .await
        .map_err(|e| StillOnTimeError::Ingest(format!("TCP connect: {e}")))?;

    let connector = native_tls::TlsConnector::new()
        .map_err(|e| StillOnTimeError::Ingest(format!("TLS connector: {e}")))?;
    let connector = tokio_native_tls::TlsConnector::from(connector);

    let tls_stream = connector
        .connect(host, tcp)
        .await
        .map_err(|e| StillOnTimeError::Ingest(format!("TLS handshake: {e}")))?;

    Ok(async_imap::Client::new(tls_stream))
}

/// Fetch unseen emails newer than `last_seen_uid`, mark them read if
/// configured, and advance the uid watermark.
pub async fn fetch_unread(
    config: &ImapConfig,
    last_seen_uid: &Arc<Mutex<u32>>,
) -> Result<Vec<FetchedEmail>> {
    use futures::StreamExt;

    let client = connect_imap_tls(&config.host, config.port).await?;
    let mut session = client
        .login(&config.email, &config.password)
        .await
        .map_err(|e| StillOnTimeError::AuthFailed(format!("IMAP login: {}", e.0)))?;

    session
        .select(&config.mailbox)
        .await
        .map_err(|e| StillOnTimeError::Ingest(format!("Select: {e}")))?;

    let uids = session
        .uid_search("UNSEEN")
        .await
        .map_err(|e| StillOnTimeError::Ingest(format!("Search: {e}")))?;

    let last = *last_seen_uid.lock().unwrap();
    let new_uids: Vec<u32> = uids.into_iter().filter(|&u| u > last).collect();

    if new_uids.is_empty() {
        session.logout().await.ok();
        return Ok(vec![]);
    }

    let uid_set = new_uids
        .iter()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let mut messages = session
        .uid_fetch(&uid_set, "(UID RFC822)")
        .await
        .map_err(|e| StillOnTimeError::Ingest(format!("Fetch: {e}")))?;

    let mut emails = Vec::new();
    let mut max_uid = last;

    while let Some(msg_result) = messages.next().await {
        let msg =
            msg_result.map_err(|e| StillOnTimeError::Ingest(format!("Fetch msg: {e}")))?;
        let uid = msg.uid.unwrap_or(0);
        if uid > max_uid {
            max_uid = uid;
        }
        if let Some(body) = msg.body()
            && let Some(parsed) = parse_email_bytes(body, uid) {
                emails.push(parsed);
            }
    }

    // Drop the messages stream before using session again
    drop(messages);

    if config.mark_as_read {
        session.uid_store(&uid_set, "+FLAGS (\\Seen)").await.ok();
    }

    *last_seen_uid.lock().unwrap() = max_uid;
    session.logout().await.ok();
    tracing::info!("📧 Fetched {} call-sheet candidate(s)", emails.len());
    Ok(emails)
}

/// Parse raw email bytes, collecting PDF attachments.
fn parse_email_bytes(raw: &[u8], uid: u32) -> Option<FetchedEmail> {
    use mail_parser::{MessageParser, MimeHeaders};
    let parsed = MessageParser::default().parse(raw)?;

    let from = parsed
        .from()
        .and_then(|a| a.first())
        .map(|a| a.address().unwrap_or_default().to_string())
        .unwrap_or_default();

    let subject = parsed.subject().unwrap_or("(no subject)").to_string();

    let body_text = parsed
        .body_text(0)
        .map(|s| s.to_string())
        .unwrap_or_default();

    let message_id = parsed
        .message_id()
        .map(String::from)
        .unwrap_or_else(|| format!("uid-{uid}"));

    let mut pdf_attachments = Vec::new();
    for part in parsed.attachments() {
        let name = part
            .attachment_name()
            .unwrap_or("attachment.pdf")
            .to_string();
        let bytes = part.contents();
        if name.to_ascii_lowercase().ends_with(".pdf") || bytes.starts_with(b"%PDF") {
            pdf_attachments.push((name, bytes.to_vec()));
        }
    }

    Some(FetchedEmail {
        uid,
        message_id,
        from,
        subject,
        body_text: body_text.chars().take(8000).collect(),
        pdf_attachments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_email_with_pdf_attachment() {
        let raw = concat!(
            "From: Production Office <office@example.com>\r\n",
            "To: crew@example.com\r\n",
            "Message-ID: <sheet-12@example.com>\r\n",
            "Subject: Call sheet 2026-03-14\r\n",
            "MIME-Version: 1.0\r\n",
            "Content-Type: multipart/mixed; boundary=\"b1\"\r\n",
            "\r\n",
            "--b1\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "Call time: 08:00\r\n",
            "--b1\r\n",
            "Content-Type: application/pdf; name=\"day12.pdf\"\r\n",
            "Content-Disposition: attachment; filename=\"day12.pdf\"\r\n",
            "\r\n",
            "%PDF-1.7 fake\r\n",
            "--b1--\r\n",
        );
        let email = parse_email_bytes(raw.as_bytes(), 7).unwrap();
        assert_eq!(email.uid, 7);
        assert_eq!(email.message_id, "sheet-12@example.com");
        assert_eq!(email.from, "office@example.com");
        assert_eq!(email.subject, "Call sheet 2026-03-14");
        assert!(email.body_text.contains("08:00"));
        assert_eq!(email.pdf_attachments.len(), 1);
        assert_eq!(email.pdf_attachments[0].0, "day12.pdf");
    }

    #[test]
    fn test_missing_message_id_gets_uid_fallback() {
        let raw = concat!(
            "From: office@example.com\r\n",
            "Subject: hello\r\n",
            "\r\n",
            "plain body\r\n",
        );
        let email = parse_email_bytes(raw.as_bytes(), 42).unwrap();
        assert_eq!(email.message_id, "uid-42");
        assert!(email.pdf_attachments.is_empty());
    }
}
