use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Episode as reported by the external metadata provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeRecord {
    pub id: String,
    pub episode_number: i32,
    pub season_number: i32,
    pub name: Option<String>,
    /// Raw air date as sent by the provider (`YYYY-MM-DD` or RFC 3339)
    pub first_aired: Option<String>,
}

impl EpisodeRecord {
    /// Parsed air date, `None` when empty or unparseable (e.g. `0000-00-00`).
    pub fn aired_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.first_aired.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    }

    /// An episode counts as aired once its air date is known and not in the future.
    pub fn has_aired(&self, now: DateTime<Utc>) -> bool {
        self.aired_at().map(|aired| aired <= now).unwrap_or(false)
    }
}
