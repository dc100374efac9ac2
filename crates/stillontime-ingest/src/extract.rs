//! Schedule field extraction from call-sheet emails.
//!
//! Production call sheets arrive as a PDF with the key facts repeated in
//! the email subject and body. The PDF itself is only hashed for
//! deduplication; the fields are read from the text.

use chrono::NaiveDate;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

use stillontime_core::types::{SceneType, parse_call_time};
use stillontime_core::{Result, StillOnTimeError};

/// SHA-256 of a PDF attachment, hex-encoded. The dedup key for re-sent
/// call sheets with a fresh message id.
pub fn pdf_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Fields pulled out of one call-sheet email.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSchedule {
    pub shooting_date: NaiveDate,
    /// "HH:MM"
    pub call_time: String,
    pub location: String,
    pub scene_type: SceneType,
    pub scenes: Vec<String>,
    /// One-way travel estimate, when the production office includes it.
    pub travel_minutes: Option<u32>,
}

static DATE_ISO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap());
static DATE_EU: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").unwrap());
static CALL_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:call\s*time|zbi[oó]rka|call)\s*[:\-]?\s*(\d{1,2}:\d{2})").unwrap()
});
static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:location|lokacja|miejsce)\s*[:\-]\s*(.+)$").unwrap()
});
static SCENES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:scenes?|sceny?)\s*[:\-]\s*(.+)$").unwrap()
});
static TRAVEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:travel|dojazd)\s*[:\-]?\s*(\d{1,3})\s*min").unwrap()
});
static EXT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bEXT\b|plener").unwrap());

fn find_date(text: &str) -> Option<NaiveDate> {
    if let Some(c) = DATE_ISO.captures(text) {
        return NaiveDate::from_ymd_opt(
            c[1].parse().ok()?,
            c[2].parse().ok()?,
            c[3].parse().ok()?,
        );
    }
    if let Some(c) = DATE_EU.captures(text) {
        return NaiveDate::from_ymd_opt(
            c[3].parse().ok()?,
            c[2].parse().ok()?,
            c[1].parse().ok()?,
        );
    }
    None
}

/// Extract schedule fields from the subject and body of a call-sheet
/// email. The shooting date and call time are mandatory; everything
/// else degrades gracefully.
pub fn extract_schedule_fields(subject: &str, body: &str) -> Result<ExtractedSchedule> {
    let combined = format!("{subject}\n{body}");

    let shooting_date = find_date(&combined).ok_or_else(|| {
        StillOnTimeError::Ingest(format!("No shooting date found in '{subject}'"))
    })?;

    let call_time = CALL_TIME
        .captures(&combined)
        .map(|c| c[1].to_string())
        .ok_or_else(|| StillOnTimeError::Ingest(format!("No call time found in '{subject}'")))?;
    // normalize "8:00" -> "08:00" and reject nonsense like "25:70"
    let call_time = parse_call_time(&call_time)
        .map_err(|e| StillOnTimeError::Ingest(e.to_string()))?
        .format("%H:%M")
        .to_string();

    let location = LOCATION
        .captures(&combined)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default();

    let scenes = SCENES
        .captures(&combined)
        .map(|c| {
            c[1].split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let travel_minutes = TRAVEL
        .captures(&combined)
        .and_then(|c| c[1].parse().ok());

    let scene_type = if EXT_MARKER.is_match(&combined) {
        SceneType::Ext
    } else {
        SceneType::Int
    };

    Ok(ExtractedSchedule {
        shooting_date,
        call_time,
        location,
        scene_type,
        scenes,
        travel_minutes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_english_call_sheet() {
        let subject = "Call sheet — shooting day 12 (2026-03-14)";
        let body = "Call time: 08:00\nLocation: Stage 4, Alvernia Studios\nScenes: 12A, 12B\nTravel: 45 min\nEXT day";
        let got = extract_schedule_fields(subject, body).unwrap();
        assert_eq!(got.shooting_date, NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
        assert_eq!(got.call_time, "08:00");
        assert_eq!(got.location, "Stage 4, Alvernia Studios");
        assert_eq!(got.scenes, vec!["12A".to_string(), "12B".to_string()]);
        assert_eq!(got.travel_minutes, Some(45));
        assert_eq!(got.scene_type, SceneType::Ext);
    }

    #[test]
    fn test_polish_call_sheet_with_european_date() {
        let subject = "Plan zdjęciowy 14.03.2026";
        let body = "Zbiórka: 6:30\nLokacja: Rynek Główny, Kraków\nplener";
        let got = extract_schedule_fields(subject, body).unwrap();
        assert_eq!(got.shooting_date, NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
        // single-digit hour is normalized
        assert_eq!(got.call_time, "06:30");
        assert_eq!(got.location, "Rynek Główny, Kraków");
        assert_eq!(got.scene_type, SceneType::Ext);
        assert_eq!(got.travel_minutes, None);
    }

    #[test]
    fn test_interior_default_and_missing_optionals() {
        let got = extract_schedule_fields("Day 3 2026-04-01", "Call 07:00").unwrap();
        assert_eq!(got.scene_type, SceneType::Int);
        assert!(got.location.is_empty());
        assert!(got.scenes.is_empty());
    }

    #[test]
    fn test_missing_mandatory_fields() {
        assert!(extract_schedule_fields("No date here", "Call time: 08:00").is_err());
        assert!(extract_schedule_fields("2026-03-14", "no times at all").is_err());
    }

    #[test]
    fn test_pdf_hash_is_stable_hex() {
        let a = pdf_hash(b"%PDF-1.7 fake");
        let b = pdf_hash(b"%PDF-1.7 fake");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, pdf_hash(b"%PDF-1.7 other"));
    }
}
