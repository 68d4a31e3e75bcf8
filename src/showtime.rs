//! Decoders for the two strings the showtime endpoint returns per slot.
//!
//! Keys look like `1724606400/VF/543210` and labels like `20h10 - VF - 7.1`.
//! Both decoders are total: missing or garbled segments become empty strings
//! (or `None` for the timestamp), never an error.

use chrono::{DateTime, Utc};

/// Decoded `<timestamp>/<version>/<internal-id>` showtime key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowtimeKey {
    pub ts: Option<i64>,
    pub version: String,
    pub internal_id: String,
}

impl ShowtimeKey {
    pub fn decode(raw: &str) -> Self {
        let mut parts = raw.split('/').map(str::trim);
        let ts = parts.next().and_then(|s| s.parse::<i64>().ok());
        let version = parts.next().unwrap_or("").to_string();
        let internal_id = parts.next().unwrap_or("").to_string();
        Self {
            ts,
            version,
            internal_id,
        }
    }

    /// Start of the screening, when the key carried a usable timestamp.
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        self.ts.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }
}

/// Decoded `<time> - <version> - <audio>` showtime label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowtimeLabel {
    pub time: String,
    pub version: String,
    pub audio: String,
}

impl ShowtimeLabel {
    pub fn decode(raw: &str) -> Self {
        let mut parts = raw.split(" - ").map(str::trim);
        let time = parts.next().unwrap_or("").to_string();
        let version = parts.next().unwrap_or("").to_string();
        let audio = parts.next().unwrap_or("").to_string();
        Self {
            time,
            version,
            audio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_key_decodes_every_segment() {
        let key = ShowtimeKey::decode("1724606400/VF/543210");
        assert_eq!(key.ts, Some(1724606400));
        assert_eq!(key.version, "VF");
        assert_eq!(key.internal_id, "543210");
        assert_eq!(
            key.starts_at().map(|d| d.to_rfc3339()),
            Some("2024-08-25T17:20:00+00:00".to_string())
        );
    }

    #[test]
    fn short_key_leaves_missing_segments_empty() {
        let key = ShowtimeKey::decode("1724606400/VOST");
        assert_eq!(key.ts, Some(1724606400));
        assert_eq!(key.version, "VOST");
        assert_eq!(key.internal_id, "");

        let key = ShowtimeKey::decode("");
        assert_eq!(key, ShowtimeKey::default());
    }

    #[test]
    fn non_numeric_timestamp_is_none() {
        let key = ShowtimeKey::decode("tomorrow/VF/42");
        assert_eq!(key.ts, None);
        assert_eq!(key.starts_at(), None);
        assert_eq!(key.internal_id, "42");
    }

    #[test]
    fn label_with_audio() {
        let label = ShowtimeLabel::decode("20h10 - VF - 7.1");
        assert_eq!(label.time, "20h10");
        assert_eq!(label.version, "VF");
        assert_eq!(label.audio, "7.1");
    }

    #[test]
    fn label_without_audio() {
        let label = ShowtimeLabel::decode("14h00 - VF");
        assert_eq!(label.time, "14h00");
        assert_eq!(label.version, "VF");
        assert_eq!(label.audio, "");
    }

    #[test]
    fn bare_label_is_only_a_time() {
        let label = ShowtimeLabel::decode("09h45");
        assert_eq!(label.time, "09h45");
        assert!(label.version.is_empty() && label.audio.is_empty());
    }
}
